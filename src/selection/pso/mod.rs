// src/selection/pso/mod.rs
//! Binary particle swarm search
//!
//! Particles move in `[0, 1]^n`; a group is selected when its coordinate
//! reaches the selection threshold. The single-objective swarm follows the
//! particle with the best personal score, the multi-objective swarm keeps a
//! Pareto front and follows its least crowded members.

pub mod pareto;
pub mod particle;
pub mod swarm;

pub use pareto::{crowding_distances, crowding_sort, dominates, fronts, nondominated_sort, truncate, Objectives};
pub use particle::{ObjectiveMode, Outcome, Particle};
pub use swarm::{ParticleSwarmSearch, SwarmReport};
