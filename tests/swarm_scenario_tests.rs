// tests/swarm_scenario_tests.rs
//! Particle swarm runs against the real forest evaluator

mod common;

use common::{separable_dataset, StepCost, GROUPS};
use featsel_core::config::{EvaluationConfig, PsoConfig, ScoringConfig};
use featsel_core::evaluation::ModelEvaluator;
use featsel_core::selection::pso::dominates;
use featsel_core::selection::{ObjectiveMode, ParticleSwarmSearch, ScoreFunction, TraceEntry};

fn evaluation() -> EvaluationConfig {
    EvaluationConfig {
        num_trees: 5,
        ..EvaluationConfig::default()
    }
}

fn swarm() -> PsoConfig {
    PsoConfig {
        num_particles: 8,
        num_iterations: 3,
        seed: 11,
        ..PsoConfig::default()
    }
}

#[test]
fn test_single_objective_run() {
    let dataset = separable_dataset();
    let evaluator = ModelEvaluator::random_forest(&dataset, &evaluation(), &ScoringConfig::default()).unwrap();
    let scores = ScoreFunction::new(&evaluator, &StepCost, dataset.catalog.groups(), ScoringConfig::default());

    let report = ParticleSwarmSearch::new(&scores, &swarm()).run(ObjectiveMode::Single).unwrap();

    assert_eq!(report.mode, ObjectiveMode::Single);
    assert_eq!(report.population, 8);
    let best = report.best.as_ref().unwrap();
    // Only the separating group is free; nothing can score above it alone
    assert!(best.score <= 500.0);
    assert!(best.features.iter().all(|f| GROUPS.contains(&f.as_str())));

    let iterations = report
        .trace
        .entries()
        .iter()
        .filter(|e| matches!(e, TraceEntry::Iteration { .. }))
        .count();
    assert_eq!(iterations, 3);
    assert!(!report.front.is_empty());
    assert!(report.distinct_subsets_evaluated >= report.front.len());
}

#[test]
fn test_multi_objective_front() {
    let dataset = separable_dataset();
    let evaluator = ModelEvaluator::random_forest(&dataset, &evaluation(), &ScoringConfig::default()).unwrap();
    let scores = ScoreFunction::new(&evaluator, &StepCost, dataset.catalog.groups(), ScoringConfig::default());

    let config = PsoConfig {
        parallel_evaluation: true,
        ..swarm()
    };
    let report = ParticleSwarmSearch::new(&scores, &config).run(ObjectiveMode::Multi).unwrap();

    assert!(report.best.is_none());
    assert_eq!(report.population, 8);

    let points: Vec<[f64; 2]> = report
        .front
        .iter()
        .map(|p| [(500.0 * p.validation).round_ties_even(), -p.energy])
        .collect();
    for a in &points {
        for b in &points {
            assert!(!dominates(*a, *b));
        }
    }

    for line in report.trace.lines() {
        assert!(line.starts_with("iteration ") || line.starts_with(" Particle with #features="));
    }
}

#[test]
fn test_same_seed_same_trace() {
    let dataset = separable_dataset();
    let evaluator = ModelEvaluator::random_forest(&dataset, &evaluation(), &ScoringConfig::default()).unwrap();

    let run = || {
        let scores = ScoreFunction::new(&evaluator, &StepCost, dataset.catalog.groups(), ScoringConfig::default());
        ParticleSwarmSearch::new(&scores, &swarm())
            .run(ObjectiveMode::Single)
            .unwrap()
            .trace
            .lines()
    };

    assert_eq!(run(), run());
}
