// src/selection/greedy.rs
//! Forward greedy selection
//!
//! Each step tries every unused group on top of the current selection and
//! keeps the best one. The first group found wins ties, so candidates are
//! tried in catalog order.

use tracing::{debug, info};

use super::score::{ScoreFunction, SubsetScore};
use super::subset::FeatureSubset;
use super::trace::{StopReason, Trace, TraceEntry};
use super::{GreedyObjective, SelectionStep, StepwiseReport};
use crate::config::GreedyConfig;
use crate::energy::EnergyEstimator;
use crate::error::SelectionResult;
use crate::evaluation::Evaluator;

pub struct GreedySearch<'s, 'a, E, M> {
    scores: &'s ScoreFunction<'a, E, M>,
    objective: GreedyObjective,
    max_features: Option<usize>,
}

impl<'s, 'a, E, M> GreedySearch<'s, 'a, E, M>
where
    E: Evaluator,
    M: EnergyEstimator,
{
    pub fn new(scores: &'s ScoreFunction<'a, E, M>, config: &GreedyConfig) -> Self {
        Self {
            scores,
            objective: config.objective,
            max_features: config.max_features,
        }
    }

    fn objective_of(&self, score: &SubsetScore) -> f64 {
        match self.objective {
            GreedyObjective::Combined => score.score,
            GreedyObjective::AccuracyOnly => score.validation,
        }
    }

    /// Best single-group extension of `used`, if any group is left
    fn best_extension(&self, used: &FeatureSubset) -> SelectionResult<Option<SelectionStep>> {
        let mut best: Option<SelectionStep> = None;

        for index in 0..self.scores.num_features() {
            if used.contains(index) {
                continue;
            }
            let score = self.scores.combined_score(&used.with(index))?;
            let objective = self.objective_of(&score);
            debug!(index, objective, energy = score.energy, "greedy candidate");

            if best.as_ref().map_or(true, |b| objective > b.objective) {
                best = Some(SelectionStep {
                    index,
                    name: self.scores.groups()[index].clone(),
                    objective,
                    score,
                });
            }
        }

        Ok(best)
    }

    pub fn run(&self) -> SelectionResult<StepwiseReport> {
        let limit = self.scores.energy_for_raw();
        info!(objective = ?self.objective, raw_energy = limit, "greedy search started");

        let mut used = FeatureSubset::empty();
        let mut steps: Vec<SelectionStep> = Vec::new();
        let mut trace = Trace::new();
        let mut rejected = None;

        let stop = loop {
            let Some(best) = self.best_extension(&used)? else {
                break StopReason::NoCandidates;
            };
            trace.record(best.trace_entry());

            if best.score.energy >= limit {
                let reason = StopReason::EnergyLimit { energy: best.score.energy, limit };
                rejected = Some(best);
                break reason;
            }

            used = used.with(best.index);
            info!(selected = ?best.name, count = used.len(), "greedy step accepted");
            steps.push(best);

            if let Some(max) = self.max_features {
                if used.len() >= max {
                    break StopReason::MaxFeatures { count: used.len() };
                }
            }
        };

        trace.record(TraceEntry::Stop { reason: stop.clone() });

        Ok(StepwiseReport {
            strategy: "greedy",
            raw_energy: limit,
            steps,
            rejected,
            stop,
            selected: used,
            trace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::energy::EnergyCost;
    use crate::evaluation::EvaluationResult;

    /// Accuracy grows with the number of groups, group 2 is always best
    struct Ladder;

    impl Evaluator for Ladder {
        fn eval_accuracy(&self, subset: &FeatureSubset) -> SelectionResult<EvaluationResult> {
            let bonus = if subset.contains(2) { 0.2 } else { 0.0 };
            let a = 0.4 + 0.1 * subset.len() as f64 + bonus;
            Ok(EvaluationResult::new(a.min(1.0), a.min(1.0)))
        }
    }

    /// One unit per group, raw transmission costs 3.5
    struct Unit;

    impl EnergyEstimator for Unit {
        fn calc(&self, names: &[&str]) -> EnergyCost {
            EnergyCost::new(names.len() as f64, 0.0)
        }

        fn calc_raw(&self) -> EnergyCost {
            EnergyCost::new(3.5, 0.0)
        }
    }

    fn groups() -> Vec<String> {
        (0..5).map(|i| format!("g{}-mean()", i)).collect()
    }

    #[test]
    fn test_stops_at_raw_energy() {
        let groups = groups();
        let scores = ScoreFunction::new(&Ladder, &Unit, &groups, ScoringConfig::default());
        let report = GreedySearch::new(&scores, &GreedyConfig::default()).run().unwrap();

        // Third group pushes energy to 3, the fourth would reach 4 >= 3.5
        assert_eq!(report.order(), vec![2, 0, 1]);
        assert_eq!(report.rejected.as_ref().map(|s| s.index), Some(3));
        assert!(matches!(report.stop, StopReason::EnergyLimit { .. }));
        for step in &report.steps {
            assert!(step.score.energy < report.raw_energy);
        }
    }

    #[test]
    fn test_max_features_cap() {
        let groups = groups();
        let scores = ScoreFunction::new(&Ladder, &Unit, &groups, ScoringConfig::default());
        let config = GreedyConfig {
            objective: GreedyObjective::AccuracyOnly,
            max_features: Some(1),
        };
        let report = GreedySearch::new(&scores, &config).run().unwrap();

        assert_eq!(report.selected.indexes(), &[2]);
        assert_eq!(report.stop, StopReason::MaxFeatures { count: 1 });
        assert!((report.steps[0].objective - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_runs_out_of_candidates() {
        let groups: Vec<String> = vec!["only-mean()".to_string()];
        let scores = ScoreFunction::new(&Ladder, &Unit, &groups, ScoringConfig::default());
        let report = GreedySearch::new(&scores, &GreedyConfig::default()).run().unwrap();

        assert_eq!(report.order(), vec![0]);
        assert_eq!(report.stop, StopReason::NoCandidates);
        assert!(report.trace.lines().last().unwrap().starts_with("stopping: "));
    }
}
