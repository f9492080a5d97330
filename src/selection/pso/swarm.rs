// src/selection/pso/swarm.rs
//! Swarm state machines
//!
//! Every iteration runs in three phases: move all particles, evaluate the
//! whole population (optionally in parallel), then update velocities from
//! the leaders chosen on the fully evaluated population.

use std::collections::HashSet;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use super::pareto::{crowding_sort, nondominated_sort, truncate, Objectives};
use super::particle::{summarize, ObjectiveMode, Particle};
use crate::config::constants::pso::{LEADER_FRACTION_DEN, LEADER_FRACTION_NUM};
use crate::config::PsoConfig;
use crate::energy::EnergyEstimator;
use crate::error::{SelectionErrorBuilder, SelectionResult};
use crate::evaluation::Evaluator;
use crate::selection::score::{MultiScore, ScoreFunction};
use crate::selection::subset::FeatureSubset;
use crate::selection::trace::{ParticleSummary, Trace, TraceEntry};

/// Result of a swarm run
#[derive(Debug, Clone, Serialize)]
pub struct SwarmReport {
    pub mode: ObjectiveMode,
    pub iterations: usize,
    pub population: usize,
    /// Global best at the end of a single-objective run
    pub best: Option<ParticleSummary>,
    /// Final Pareto front, highest accuracy first
    pub front: Vec<ParticleSummary>,
    pub distinct_subsets_evaluated: usize,
    pub cache_hits: usize,
    pub trace: Trace,
}

/// Distinct subset with its two-objective score
struct FrontMember {
    subset: FeatureSubset,
    score: MultiScore,
}

impl Objectives for FrontMember {
    fn objectives(&self) -> [f64; 2] {
        self.score.objectives
    }
}

pub struct ParticleSwarmSearch<'s, 'a, E, M> {
    scores: &'s ScoreFunction<'a, E, M>,
    config: PsoConfig,
}

impl<'s, 'a, E, M> ParticleSwarmSearch<'s, 'a, E, M>
where
    E: Evaluator,
    M: EnergyEstimator,
{
    pub fn new(scores: &'s ScoreFunction<'a, E, M>, config: &PsoConfig) -> Self {
        Self {
            scores,
            config: config.clone(),
        }
    }

    pub fn run(&self, mode: ObjectiveMode) -> SelectionResult<SwarmReport> {
        match mode {
            ObjectiveMode::Single => self.run_single(),
            ObjectiveMode::Multi => self.run_multi(),
        }
    }

    /// All pairs first (when enabled), then random particles up to the cap
    fn init_particles(&self, mode: ObjectiveMode, rng: &mut StdRng) -> SelectionResult<Vec<Particle>> {
        let capacity = self.config.num_particles;
        if capacity == 0 {
            return Err(SelectionErrorBuilder::new("swarm", "init_particles")
                .configuration("swarm needs at least one particle"));
        }

        let n = self.scores.num_features();
        let vmax = self.config.vmax;
        let mut particles = Vec::with_capacity(capacity);

        if self.config.initialize_with_all_pairs {
            'pairs: for i in 0..n {
                for j in i + 1..n {
                    if particles.len() >= capacity {
                        break 'pairs;
                    }
                    particles.push(Particle::from_pair(mode, n, i, j, vmax, rng));
                }
            }
        }

        while particles.len() < capacity {
            particles.push(Particle::random(mode, n, self.config.initial_prob, vmax, rng));
        }

        debug!(particles = particles.len(), features = n, ?mode, "swarm initialized");
        Ok(particles)
    }

    /// Score every particle; all evaluations finish before any is recorded
    fn evaluate_all(&self, particles: &mut [Particle]) -> SelectionResult<()> {
        let threshold = self.config.selection_threshold;

        let outcomes = if self.config.parallel_evaluation {
            particles
                .par_iter()
                .map(|p| p.outcome(self.scores, threshold))
                .collect::<SelectionResult<Vec<_>>>()?
        } else {
            particles
                .iter()
                .map(|p| p.outcome(self.scores, threshold))
                .collect::<SelectionResult<Vec<_>>>()?
        };

        for (particle, (subset, outcome)) in particles.iter_mut().zip(outcomes) {
            particle.record(subset, outcome);
        }
        Ok(())
    }

    fn report(
        &self,
        mode: ObjectiveMode,
        population: usize,
        best: Option<ParticleSummary>,
        front: Vec<ParticleSummary>,
        trace: Trace,
    ) -> SwarmReport {
        SwarmReport {
            mode,
            iterations: self.config.num_iterations,
            population,
            best,
            front,
            distinct_subsets_evaluated: self.scores.cache_len(),
            cache_hits: self.scores.cache_hits(),
            trace,
        }
    }

    /// Single-objective swarm following the best personal score
    pub fn run_single(&self) -> SelectionResult<SwarmReport> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let groups = self.scores.groups();
        let mut trace = Trace::new();

        let mut particles = self.init_particles(ObjectiveMode::Single, &mut rng)?;
        self.evaluate_all(&mut particles)?;

        let mut best = 0;
        for (i, p) in particles.iter().enumerate().skip(1) {
            if p.score > particles[best].best_score {
                best = i;
            }
        }
        info!(initial_best = particles[best].best_score, "single-objective swarm ready");

        for iteration in 0..self.config.num_iterations {
            for p in particles.iter_mut() {
                p.move_position();
            }
            self.evaluate_all(&mut particles)?;

            for i in 0..particles.len() {
                if particles[i].score > particles[best].best_score {
                    best = i;
                }
            }

            let guide = particles[best].personal_best[0].clone();
            for p in particles.iter_mut() {
                p.update_velocity(&guide, &self.config, &mut rng);
            }

            if let Some(summary) = particles[best].best_summary(groups) {
                trace.record(TraceEntry::Iteration { iteration, best: summary });
            }
        }

        let best_summary = particles[best].best_summary(groups);
        let front = self.single_front(&particles)?;
        for member in &front {
            trace.record(TraceEntry::Particle(member.clone()));
        }

        Ok(self.report(ObjectiveMode::Single, particles.len(), best_summary, front, trace))
    }

    /// Final population re-read as a two-objective problem, one member per
    /// distinct subset
    fn single_front(&self, particles: &[Particle]) -> SelectionResult<Vec<ParticleSummary>> {
        let groups = self.scores.groups();
        let mut seen = HashSet::new();
        let mut members = Vec::new();

        for p in particles {
            let subset = p.binarize(self.config.selection_threshold)?;
            if !seen.insert(subset.clone()) {
                continue;
            }
            let score = self.scores.mscore(&subset)?;
            members.push(FrontMember { subset, score });
        }

        let (front, _) = nondominated_sort(members);
        Ok(front
            .iter()
            .map(|m| {
                summarize(
                    &m.subset,
                    groups,
                    m.score.validation,
                    m.score.test,
                    m.score.energy,
                    m.score.objectives[0] + m.score.objectives[1],
                )
            })
            .collect())
    }

    /// Least crowded part of the first front
    fn leaders(particles: &[Particle]) -> Vec<Particle> {
        let (front, _) = nondominated_sort(particles.to_vec());
        let front = crowding_sort(front);
        let take = (LEADER_FRACTION_NUM * front.len() + LEADER_FRACTION_NUM) / LEADER_FRACTION_DEN;
        front.into_iter().take(take).collect()
    }

    /// Leader closest to `particle` in objective space; first one wins ties
    fn nearest<'l>(particle: &Particle, leaders: &'l [Particle]) -> Option<&'l Particle> {
        let mut nearest = None;
        let mut min_distance = f64::INFINITY;
        for leader in leaders {
            let d = particle.objective_distance(leader);
            if d < min_distance {
                min_distance = d;
                nearest = Some(leader);
            }
        }
        nearest.or(leaders.first())
    }

    /// Multi-objective swarm with generational front truncation
    pub fn run_multi(&self) -> SelectionResult<SwarmReport> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let groups = self.scores.groups();
        let capacity = self.config.num_particles;
        let mut trace = Trace::new();

        let mut particles = self.init_particles(ObjectiveMode::Multi, &mut rng)?;
        self.evaluate_all(&mut particles)?;

        let (initial_front, _) = nondominated_sort(particles.clone());
        info!(front = initial_front.len(), "multi-objective swarm ready");

        for iteration in 0..self.config.num_iterations {
            let leaders = Self::leaders(&particles);

            let mut moved = particles.clone();
            for p in moved.iter_mut() {
                p.move_position();
            }
            self.evaluate_all(&mut moved)?;

            for p in moved.iter_mut() {
                if let Some(leader) = Self::nearest(p, &leaders) {
                    p.update_velocity(&leader.x, &self.config, &mut rng);
                }
            }

            let mut union = particles;
            union.extend(moved);
            particles = truncate(union, capacity);

            let (front, _) = nondominated_sort(particles.clone());
            debug!(iteration, front = front.len(), "generation done");
            if let Some(top) = front.first() {
                trace.record(TraceEntry::Iteration {
                    iteration,
                    best: top.summary(groups),
                });
            }
        }

        let (front, _) = nondominated_sort(particles.clone());
        let front: Vec<ParticleSummary> = front.iter().map(|p| p.summary(groups)).collect();
        for member in &front {
            trace.record(TraceEntry::Particle(member.clone()));
        }

        Ok(self.report(ObjectiveMode::Multi, particles.len(), None, front, trace))
    }
}
