// src/selection/pso/particle.rs
//! Swarm particle
//!
//! One particle type serves both search modes. The [`ObjectiveMode`] tag
//! decides how a score is recorded and which personal best pulls the
//! velocity.

use rand::Rng;
use serde::Serialize;

use super::pareto::Objectives;
use crate::config::PsoConfig;
use crate::energy::EnergyEstimator;
use crate::error::SelectionResult;
use crate::evaluation::Evaluator;
use crate::selection::score::{MultiScore, ScoreFunction, SubsetScore};
use crate::selection::subset::FeatureSubset;
use crate::selection::trace::ParticleSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveMode {
    /// Scalar combined score, one personal best
    Single,
    /// Accuracy and energy kept apart, one personal best per objective
    Multi,
}

impl ObjectiveMode {
    fn num_bests(self) -> usize {
        match self {
            ObjectiveMode::Single => 1,
            ObjectiveMode::Multi => 2,
        }
    }
}

/// Score of one evaluation, shaped by the mode that asked for it
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Single(SubsetScore),
    Multi(MultiScore),
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub mode: ObjectiveMode,
    /// Position in `[0, 1]^n`
    pub x: Vec<f64>,
    /// Velocity in `[-vmax, vmax]^n`
    pub v: Vec<f64>,
    /// Single: `[best]`; multi: `[best accuracy, best energy]`
    pub personal_best: Vec<Vec<f64>>,
    /// Subset of the last evaluated position
    pub subset: FeatureSubset,

    pub score: f64,
    pub best_score: f64,
    /// Two-objective score of the current position (multi mode)
    pub objectives: [f64; 2],
    pub best_accuracy: f64,
    pub best_energy: f64,

    pub validation: f64,
    pub test: f64,
    pub energy: f64,
    pub best_validation: f64,
    pub best_test: f64,
    /// Subset and score at the personal best (single mode)
    pub best_point: Option<(FeatureSubset, SubsetScore)>,
}

impl Particle {
    /// Particle at `x` with a uniform(-1, 1) velocity clamped to `vmax`
    pub fn new<R: Rng>(mode: ObjectiveMode, x: Vec<f64>, vmax: f64, rng: &mut R) -> Self {
        let v = (0..x.len())
            .map(|_| rng.gen_range(-1.0..1.0f64).clamp(-vmax, vmax))
            .collect();
        let personal_best = vec![x.clone(); mode.num_bests()];

        Self {
            mode,
            x,
            v,
            personal_best,
            subset: FeatureSubset::empty(),
            score: f64::NEG_INFINITY,
            best_score: f64::NEG_INFINITY,
            objectives: [f64::NEG_INFINITY, f64::NEG_INFINITY],
            best_accuracy: f64::NEG_INFINITY,
            best_energy: f64::INFINITY,
            validation: f64::NEG_INFINITY,
            test: f64::NEG_INFINITY,
            energy: f64::INFINITY,
            best_validation: f64::NEG_INFINITY,
            best_test: f64::NEG_INFINITY,
            best_point: None,
        }
    }

    /// Exactly groups `first` and `second` selected
    pub fn from_pair<R: Rng>(
        mode: ObjectiveMode,
        num_features: usize,
        first: usize,
        second: usize,
        vmax: f64,
        rng: &mut R,
    ) -> Self {
        let x = (0..num_features)
            .map(|i| if i == first || i == second { 1.0 } else { 0.0 })
            .collect();
        Self::new(mode, x, vmax, rng)
    }

    /// Each coordinate set to 1 with probability `prob`, else 0
    pub fn random<R: Rng>(mode: ObjectiveMode, num_features: usize, prob: f64, vmax: f64, rng: &mut R) -> Self {
        let x = (0..num_features)
            .map(|_| if rng.gen::<f64>() < prob { 1.0 } else { 0.0 })
            .collect();
        Self::new(mode, x, vmax, rng)
    }

    /// Groups whose coordinate reaches `threshold`
    pub fn binarize(&self, threshold: f64) -> SelectionResult<FeatureSubset> {
        FeatureSubset::new(
            self.x
                .iter()
                .enumerate()
                .filter(|(_, &xi)| xi >= threshold)
                .map(|(i, _)| i),
            self.x.len(),
        )
    }

    /// `x += v`, clamped to the unit cube
    pub fn move_position(&mut self) {
        for (xi, vi) in self.x.iter_mut().zip(&self.v) {
            *xi = (*xi + vi).clamp(0.0, 1.0);
        }
    }

    /// Score the current position; does not modify the particle
    pub fn outcome<E, M>(&self, scores: &ScoreFunction<'_, E, M>, threshold: f64) -> SelectionResult<(FeatureSubset, Outcome)>
    where
        E: Evaluator,
        M: EnergyEstimator,
    {
        let subset = self.binarize(threshold)?;
        let outcome = match self.mode {
            ObjectiveMode::Single => Outcome::Single(scores.score(&subset)?),
            ObjectiveMode::Multi => Outcome::Multi(scores.mscore(&subset)?),
        };
        Ok((subset, outcome))
    }

    /// Take a score and update the personal bests
    pub fn record(&mut self, subset: FeatureSubset, outcome: Outcome) {
        match outcome {
            Outcome::Single(s) => {
                self.score = s.score;
                self.set_current(s.validation, s.test, s.energy);
                if s.score > self.best_score {
                    self.personal_best[0].clone_from(&self.x);
                    self.best_score = s.score;
                    self.best_validation = s.validation;
                    self.best_test = s.test;
                    self.best_point = Some((subset.clone(), s));
                }
            }
            Outcome::Multi(m) => {
                self.objectives = m.objectives;
                self.score = m.objectives[0] + m.objectives[1];
                self.set_current(m.validation, m.test, m.energy);
                if m.objectives[0] > self.best_accuracy {
                    self.personal_best[0].clone_from(&self.x);
                    self.best_accuracy = m.objectives[0];
                    self.best_validation = m.validation;
                    self.best_test = m.test;
                }
                if m.energy < self.best_energy {
                    self.personal_best[1].clone_from(&self.x);
                    self.best_energy = m.energy;
                }
            }
        }
        self.subset = subset;
    }

    fn set_current(&mut self, validation: f64, test: f64, energy: f64) {
        self.validation = validation;
        self.test = test;
        self.energy = energy;
    }

    pub fn evaluate<E, M>(&mut self, scores: &ScoreFunction<'_, E, M>, threshold: f64) -> SelectionResult<()>
    where
        E: Evaluator,
        M: EnergyEstimator,
    {
        let (subset, outcome) = self.outcome(scores, threshold)?;
        self.record(subset, outcome);
        Ok(())
    }

    /// Standard PSO velocity step towards `social`. In multi mode a coin
    /// flip per coordinate picks which personal best is the cognitive pull.
    pub fn update_velocity<R: Rng>(&mut self, social: &[f64], params: &PsoConfig, rng: &mut R) {
        for i in 0..self.x.len() {
            let r1: f64 = rng.gen();
            let r2: f64 = rng.gen();
            let own = match self.mode {
                ObjectiveMode::Single => &self.personal_best[0],
                ObjectiveMode::Multi => {
                    if rng.gen::<f64>() > 0.5 {
                        &self.personal_best[0]
                    } else {
                        &self.personal_best[1]
                    }
                }
            };
            let cognitive = own[i] - self.x[i];
            let towards_leader = social[i] - self.x[i];

            let v = params.w * self.v[i] + params.c1 * r1 * cognitive + params.c2 * r2 * towards_leader;
            self.v[i] = v.clamp(-params.vmax, params.vmax);
        }
    }

    /// Squared distance between current scores in objective space
    pub fn objective_distance(&self, other: &Particle) -> f64 {
        let d0 = self.objectives[0] - other.objectives[0];
        let d1 = self.objectives[1] - other.objectives[1];
        d0 * d0 + d1 * d1
    }

    /// Trace view of the current position
    pub fn summary(&self, groups: &[String]) -> ParticleSummary {
        summarize(&self.subset, groups, self.validation, self.test, self.energy, self.score)
    }

    /// Trace view of the single-objective personal best
    pub fn best_summary(&self, groups: &[String]) -> Option<ParticleSummary> {
        self.best_point
            .as_ref()
            .map(|(subset, s)| summarize(subset, groups, s.validation, s.test, s.energy, s.score))
    }
}

impl Objectives for Particle {
    fn objectives(&self) -> [f64; 2] {
        self.objectives
    }
}

/// Trace view of a scored subset; feature names are sorted
pub fn summarize(
    subset: &FeatureSubset,
    groups: &[String],
    validation: f64,
    test: f64,
    energy: f64,
    score: f64,
) -> ParticleSummary {
    let mut features: Vec<String> = subset.names(groups).into_iter().map(str::to_string).collect();
    features.sort();

    ParticleSummary {
        num_features: features.len(),
        validation,
        test,
        energy,
        score,
        features,
    }
}
