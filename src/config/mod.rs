// src/config/mod.rs
//! Search configuration
//!
//! A run is driven by a dataset name; everything else has a measured or
//! published default in [`constants`] and may be overridden through TOML files
//! or `FSEL_` environment variables (see [`ConfigLoader`]).

pub mod constants;
pub mod schema_validator;
pub mod loader;

pub use constants::*;
pub use schema_validator::{SchemaValidator, ValidationError};
pub use loader::{ConfigLoader, ConfigError};

use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use crate::dataset::GroupingMode;
use crate::energy::CostTable;
use crate::selection::GreedyObjective;

/// Complete configuration of a feature selection run
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SearchConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub greedy: GreedyConfig,
    #[serde(default)]
    pub mutual_information: MutualInfoConfig,
    #[serde(default)]
    pub pso: PsoConfig,
    /// Measured per-operation charges; immutable once the run starts
    #[serde(default)]
    pub energy: CostTable,
}

/// Where the data lives and how scalar features are grouped
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatasetConfig {
    #[serde(default = "defaults::dataset_name")]
    pub name: String,

    /// Directory holding one sub-directory per dataset
    #[serde(default = "defaults::data_root")]
    pub data_root: PathBuf,

    /// One scalar feature name per line, in column order
    #[serde(default = "defaults::feature_names_path")]
    pub feature_names_path: PathBuf,

    #[serde(default = "defaults::grouping")]
    pub grouping: GroupingMode,

    /// Keep only groups whose name contains one of these substrings
    #[serde(default)]
    pub filters: Vec<String>,
}

/// Weights of the combined accuracy/energy score
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScoringConfig {
    #[serde(default = "defaults::w_accuracy")]
    pub w_accuracy: f64,

    #[serde(default = "defaults::w_energy")]
    pub w_energy: f64,

    #[serde(default = "defaults::random_accuracy")]
    pub random_accuracy: f64,
}

/// Classifier-backed evaluation settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EvaluationConfig {
    #[serde(default = "defaults::num_trees")]
    pub num_trees: usize,

    #[serde(default = "defaults::num_trials")]
    pub num_trials: usize,

    /// Hold one subject out and k-fold over the rest
    #[serde(default = "defaults::use_cross_validation")]
    pub use_cross_validation: bool,

    #[serde(default = "defaults::num_folds")]
    pub num_folds: usize,

    #[serde(default = "defaults::baseline_trials")]
    pub baseline_trials: usize,

    #[serde(default = "defaults::min_samples_split")]
    pub min_samples_split: usize,

    #[serde(default = "defaults::parallel_trees")]
    pub parallel_trees: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GreedyConfig {
    #[serde(default = "defaults::greedy_objective")]
    pub objective: GreedyObjective,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_features: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MutualInfoConfig {
    #[serde(default = "defaults::num_bins")]
    pub num_bins: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_features: Option<usize>,
}

/// Particle swarm parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PsoConfig {
    #[serde(default = "defaults::num_particles")]
    pub num_particles: usize,

    #[serde(default = "defaults::num_iterations")]
    pub num_iterations: usize,

    #[serde(default = "defaults::initialize_with_all_pairs")]
    pub initialize_with_all_pairs: bool,

    #[serde(default = "defaults::selection_threshold")]
    pub selection_threshold: f64,

    #[serde(default = "defaults::initial_prob")]
    pub initial_prob: f64,

    #[serde(default = "defaults::inertia")]
    pub w: f64,

    #[serde(default = "defaults::cognitive")]
    pub c1: f64,

    #[serde(default = "defaults::social")]
    pub c2: f64,

    #[serde(default = "defaults::vmax")]
    pub vmax: f64,

    /// Evaluate the whole population on the rayon pool each iteration
    #[serde(default = "defaults::parallel_evaluation")]
    pub parallel_evaluation: bool,

    #[serde(default = "defaults::seed")]
    pub seed: u64,
}

/// Default value providers using constants
mod defaults {
    use std::path::PathBuf;
    use crate::config::constants::*;
    use crate::dataset::GroupingMode;
    use crate::selection::GreedyObjective;

    pub fn dataset_name() -> String { dataset::DEFAULT_DATASET.to_string() }
    pub fn data_root() -> PathBuf { PathBuf::from(dataset::DEFAULT_DATA_ROOT) }
    pub fn feature_names_path() -> PathBuf { PathBuf::from(dataset::DEFAULT_FEATURE_NAMES_FILE) }
    pub fn grouping() -> GroupingMode { GroupingMode::Group }

    pub fn w_accuracy() -> f64 { scoring::W_ACCURACY }
    pub fn w_energy() -> f64 { scoring::W_ENERGY }
    pub fn random_accuracy() -> f64 { scoring::RANDOM_ACCURACY }

    pub fn num_trees() -> usize { evaluation::NUM_TREES }
    pub fn num_trials() -> usize { evaluation::NUM_TRIALS }
    pub fn use_cross_validation() -> bool { evaluation::USE_N_FOLD_CROSS_VALIDATION }
    pub fn num_folds() -> usize { evaluation::NUM_VALIDATION_ITERATIONS }
    pub fn baseline_trials() -> usize { evaluation::BASELINE_TRIALS }
    pub fn min_samples_split() -> usize { evaluation::MIN_SAMPLES_SPLIT }
    pub fn parallel_trees() -> bool { true }

    pub fn greedy_objective() -> GreedyObjective { GreedyObjective::Combined }
    pub fn num_bins() -> usize { mutual_info::NUM_BINS }

    pub fn num_particles() -> usize { pso::NUM_PARTICLES }
    pub fn num_iterations() -> usize { pso::NUM_ITERATIONS }
    pub fn initialize_with_all_pairs() -> bool { pso::INITIALIZE_WITH_ALL_PAIRS }
    pub fn selection_threshold() -> f64 { pso::SELECTION_THRESHOLD }
    pub fn initial_prob() -> f64 { pso::INITIAL_PROB }
    pub fn inertia() -> f64 { pso::W }
    pub fn cognitive() -> f64 { pso::C1 }
    pub fn social() -> f64 { pso::C2 }
    pub fn vmax() -> f64 { pso::VMAX }
    pub fn parallel_evaluation() -> bool { false }
    pub fn seed() -> u64 { pso::DEFAULT_SEED }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            name: defaults::dataset_name(),
            data_root: defaults::data_root(),
            feature_names_path: defaults::feature_names_path(),
            grouping: defaults::grouping(),
            filters: Vec::new(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            w_accuracy: defaults::w_accuracy(),
            w_energy: defaults::w_energy(),
            random_accuracy: defaults::random_accuracy(),
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            num_trees: defaults::num_trees(),
            num_trials: defaults::num_trials(),
            use_cross_validation: defaults::use_cross_validation(),
            num_folds: defaults::num_folds(),
            baseline_trials: defaults::baseline_trials(),
            min_samples_split: defaults::min_samples_split(),
            parallel_trees: defaults::parallel_trees(),
        }
    }
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self {
            objective: defaults::greedy_objective(),
            max_features: None,
        }
    }
}

impl Default for MutualInfoConfig {
    fn default() -> Self {
        Self {
            num_bins: defaults::num_bins(),
            max_features: None,
        }
    }
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            num_particles: defaults::num_particles(),
            num_iterations: defaults::num_iterations(),
            initialize_with_all_pairs: defaults::initialize_with_all_pairs(),
            selection_threshold: defaults::selection_threshold(),
            initial_prob: defaults::initial_prob(),
            w: defaults::inertia(),
            c1: defaults::cognitive(),
            c2: defaults::social(),
            vmax: defaults::vmax(),
            parallel_evaluation: defaults::parallel_evaluation(),
            seed: defaults::seed(),
        }
    }
}

impl DatasetConfig {
    /// Directory of one split, e.g. `datasets/UCI HAR Dataset/train`
    pub fn split_dir(&self, split: &str) -> PathBuf {
        self.data_root.join(&self.name).join(split)
    }
}

/// Configuration utility functions
impl SearchConfig {
    /// Configuration for a named dataset, all other settings default
    pub fn for_dataset(name: &str) -> Self {
        let mut config = Self::default();
        config.dataset.name = name.to_string();
        config
    }

    /// Validate configuration consistency
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.dataset.name.trim().is_empty() {
            errors.push("Dataset name must not be empty".to_string());
        }

        let threshold = self.pso.selection_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            errors.push(format!(
                "Selection threshold ({}) must lie in (0, 1]",
                threshold
            ));
        }

        if !(0.0..=1.0).contains(&self.pso.initial_prob) {
            errors.push(format!(
                "Initial activation probability ({}) must lie in [0, 1]",
                self.pso.initial_prob
            ));
        }

        if self.pso.vmax <= 0.0 {
            errors.push(format!("VMAX ({}) must be positive", self.pso.vmax));
        }

        if self.pso.num_particles == 0 {
            errors.push("Swarm needs at least one particle".to_string());
        }

        if self.evaluation.num_trees == 0 {
            errors.push("Forest needs at least one tree".to_string());
        }

        if self.evaluation.num_trials == 0 {
            errors.push("At least one evaluation trial is required".to_string());
        }

        if self.evaluation.use_cross_validation && self.evaluation.num_folds < 2 {
            errors.push(format!(
                "Cross-validation needs at least 2 folds, have {}",
                self.evaluation.num_folds
            ));
        }

        if self.mutual_information.num_bins < mutual_info::MIN_BINS {
            errors.push(format!(
                "Mutual information needs at least {} bins, have {}",
                mutual_info::MIN_BINS, self.mutual_information.num_bins
            ));
        }

        if self.scoring.w_accuracy <= 0.0 {
            errors.push(format!(
                "Accuracy weight ({}) must be positive",
                self.scoring.w_accuracy
            ));
        }

        if self.scoring.w_energy > 0.0 {
            errors.push(format!(
                "Energy weight ({}) is a penalty and must not be positive",
                self.scoring.w_energy
            ));
        }

        if let Err(table_errors) = self.energy.validate() {
            errors.extend(table_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Get configuration summary
    pub fn get_summary(&self) -> ConfigSummary {
        ConfigSummary {
            dataset: self.dataset.name.clone(),
            grouping: self.dataset.grouping,
            num_trees: self.evaluation.num_trees,
            cross_validation: self.evaluation.use_cross_validation,
            num_particles: self.pso.num_particles,
            num_iterations: self.pso.num_iterations,
            parallel_evaluation: self.pso.parallel_evaluation,
        }
    }
}

/// Configuration summary for display/logging
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub dataset: String,
    pub grouping: GroupingMode,
    pub num_trees: usize,
    pub cross_validation: bool,
    pub num_particles: usize,
    pub num_iterations: usize,
    pub parallel_evaluation: bool,
}
