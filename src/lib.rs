//! Featsel-Core: energy-aware feature selection for wearable activity recognition
//!
//! This library searches for a subset of signal-processing features that
//! keeps activity-recognition accuracy high while keeping the energy of
//! computing and transmitting those features on the device low. It features:
//!
//! - Analytic energy model of on-device feature computation and transmission
//! - Class-balanced random forest evaluator with holdout or subject-held-out
//!   cross-validation
//! - Greedy, mutual-information and particle swarm search strategies
//! - Multi-objective swarm with Pareto fronts and crowding distance
//! - Layered TOML configuration with schema validation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use featsel_core::config::SearchConfig;
//! use featsel_core::dataset::Dataset;
//! use featsel_core::energy::EnergyModel;
//! use featsel_core::evaluation::ModelEvaluator;
//! use featsel_core::selection::{GreedySearch, ScoreFunction};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SearchConfig::for_dataset("UCI HAR Dataset");
//!     let dataset = Dataset::load(&config.dataset)?;
//!     let energy = EnergyModel::new(&config.energy);
//!     let evaluator = ModelEvaluator::random_forest(&dataset, &config.evaluation, &config.scoring)?;
//!
//!     let scores = ScoreFunction::new(&evaluator, &energy, dataset.catalog.groups(), config.scoring.clone());
//!     let report = GreedySearch::new(&scores, &config.greedy).run()?;
//!     for line in report.trace.lines() {
//!         println!("{}", line);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod energy;
pub mod error;
pub mod evaluation;
pub mod selection;

// Re-export commonly used types for convenience
pub use config::{ConfigLoader, SearchConfig};
pub use dataset::{Dataset, FeatureCatalog};
pub use energy::{EnergyCost, EnergyEstimator, EnergyModel};
pub use error::{SelectionError, SelectionResult};
pub use evaluation::{EvaluationResult, Evaluator, ModelEvaluator};
pub use selection::{
    FeatureSubset, GreedySearch, MutualInformationSearch, ObjectiveMode, ParticleSwarmSearch,
    ScoreFunction,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Energy-aware feature selection for activity recognition".to_string(),
        features: vec![
            "Analytic energy model".to_string(),
            "Random forest subset evaluation".to_string(),
            "Greedy and mutual-information search".to_string(),
            "Single- and multi-objective particle swarm search".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
