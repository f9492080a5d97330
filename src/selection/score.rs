// src/selection/score.rs
//! Accuracy and energy combined into search objectives
//!
//! Evaluations are cached per canonical subset for the lifetime of the
//! score function. The cache lock is never held while a classifier trains,
//! so a population can be scored in parallel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use super::subset::FeatureSubset;
use crate::config::ScoringConfig;
use crate::energy::EnergyEstimator;
use crate::error::SelectionResult;
use crate::evaluation::{EvaluationResult, Evaluator};

/// Scalar objective of one subset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubsetScore {
    pub score: f64,
    pub validation: f64,
    pub test: f64,
    pub energy: f64,
}

/// Two-objective score: `[scaled accuracy, scaled energy]`, both larger-is-better
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MultiScore {
    pub objectives: [f64; 2],
    pub validation: f64,
    pub test: f64,
    pub energy: f64,
}

#[derive(Debug, Clone, Copy)]
struct Cached {
    accuracy: EvaluationResult,
    energy: f64,
}

/// Scores feature subsets against one evaluator and one energy model
pub struct ScoreFunction<'a, E, M> {
    evaluator: &'a E,
    energy: &'a M,
    groups: &'a [String],
    weights: ScoringConfig,
    raw_energy: f64,
    cache: Mutex<HashMap<FeatureSubset, Cached>>,
    hits: AtomicUsize,
}

impl<'a, E, M> ScoreFunction<'a, E, M>
where
    E: Evaluator,
    M: EnergyEstimator,
{
    pub fn new(evaluator: &'a E, energy: &'a M, groups: &'a [String], weights: ScoringConfig) -> Self {
        let raw_energy = energy.calc_raw().total();
        debug!(raw_energy, groups = groups.len(), "score function ready");

        Self {
            evaluator,
            energy,
            groups,
            weights,
            raw_energy,
            cache: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
        }
    }

    /// Search dimensionality
    pub fn num_features(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> &'a [String] {
        self.groups
    }

    pub fn weights(&self) -> &ScoringConfig {
        &self.weights
    }

    /// Total charge of the subset's group names
    pub fn eval_energy(&self, subset: &FeatureSubset) -> f64 {
        self.energy.calc(&subset.names(self.groups)).total()
    }

    /// Total charge of transmitting the raw window, the stopping bound
    pub fn energy_for_raw(&self) -> f64 {
        self.raw_energy
    }

    /// Rounded, weighted accuracy. Ties round to even.
    pub fn scaled_accuracy(&self, accuracy: f64) -> f64 {
        (self.weights.w_accuracy * accuracy).round_ties_even()
    }

    pub fn scaled_energy(&self, energy: f64) -> f64 {
        self.weights.w_energy * energy
    }

    /// Evaluate without touching the cache
    pub fn combined_score(&self, subset: &FeatureSubset) -> SelectionResult<SubsetScore> {
        let accuracy = self.evaluator.eval_accuracy(subset)?;
        let energy = self.eval_energy(subset);
        Ok(self.to_scalar(Cached { accuracy, energy }))
    }

    /// Cached scalar score
    pub fn score(&self, subset: &FeatureSubset) -> SelectionResult<SubsetScore> {
        self.cached(subset).map(|c| self.to_scalar(c))
    }

    /// Cached two-objective score
    pub fn mscore(&self, subset: &FeatureSubset) -> SelectionResult<MultiScore> {
        self.cached(subset).map(|c| MultiScore {
            objectives: [
                self.scaled_accuracy(c.accuracy.validation),
                self.scaled_energy(c.energy),
            ],
            validation: c.accuracy.validation,
            test: c.accuracy.test,
            energy: c.energy,
        })
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn cache_hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    fn to_scalar(&self, c: Cached) -> SubsetScore {
        SubsetScore {
            score: self.scaled_accuracy(c.accuracy.validation) + self.scaled_energy(c.energy),
            validation: c.accuracy.validation,
            test: c.accuracy.test,
            energy: c.energy,
        }
    }

    fn cached(&self, subset: &FeatureSubset) -> SelectionResult<Cached> {
        if let Some(hit) = self.cache.lock().get(subset).copied() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit);
        }

        let fresh = Cached {
            accuracy: self.evaluator.eval_accuracy(subset)?,
            energy: self.eval_energy(subset),
        };

        // Another thread may have filled the slot meanwhile; keep the first value
        Ok(*self.cache.lock().entry(subset.clone()).or_insert(fresh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyCost;

    struct FixedAccuracy;

    impl Evaluator for FixedAccuracy {
        fn eval_accuracy(&self, subset: &FeatureSubset) -> SelectionResult<EvaluationResult> {
            let a = 0.5 + 0.1 * subset.len() as f64;
            Ok(EvaluationResult::new(a, a - 0.05))
        }
    }

    struct PerName;

    impl EnergyEstimator for PerName {
        fn calc(&self, names: &[&str]) -> EnergyCost {
            EnergyCost::new(names.len() as f64, 0.5)
        }

        fn calc_raw(&self) -> EnergyCost {
            EnergyCost::new(10.0, 20.0)
        }
    }

    fn groups() -> Vec<String> {
        (0..4).map(|i| format!("g{}-mean()", i)).collect()
    }

    #[test]
    fn test_scalar_score() {
        let groups = groups();
        let scores = ScoreFunction::new(&FixedAccuracy, &PerName, &groups, ScoringConfig::default());
        let subset = FeatureSubset::new([0, 2], 4).unwrap();

        let s = scores.combined_score(&subset).unwrap();
        // round(500 * 0.7) - 2.5
        assert_eq!(s.score, 350.0 - 2.5);
        assert_eq!(s.energy, 2.5);
        assert_eq!(scores.energy_for_raw(), 30.0);
        assert_eq!(scores.cache_len(), 0);
    }

    #[test]
    fn test_mscore_objectives() {
        let groups = groups();
        let scores = ScoreFunction::new(&FixedAccuracy, &PerName, &groups, ScoringConfig::default());
        let m = scores.mscore(&FeatureSubset::new([1], 4).unwrap()).unwrap();
        assert_eq!(m.objectives, [300.0, -1.5]);
    }

    #[test]
    fn test_cache_is_shared_between_objectives() {
        let groups = groups();
        let scores = ScoreFunction::new(&FixedAccuracy, &PerName, &groups, ScoringConfig::default());
        let subset = FeatureSubset::new([3], 4).unwrap();

        scores.score(&subset).unwrap();
        scores.mscore(&subset).unwrap();
        assert_eq!(scores.cache_len(), 1);
        assert_eq!(scores.cache_hits(), 1);
    }

    #[test]
    fn test_rounding_ties_to_even() {
        let groups = groups();
        let scores = ScoreFunction::new(&FixedAccuracy, &PerName, &groups, ScoringConfig::default());
        assert_eq!(scores.scaled_accuracy(0.001), 0.0);
        assert_eq!(scores.scaled_accuracy(0.003), 2.0);
    }
}
