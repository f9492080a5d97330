// src/config/constants.rs
//! Search-wide configuration constants
//!
//! These are the compile-time defaults. Every one of them can be overridden
//! through the layered TOML configuration (see [`crate::config::ConfigLoader`]).

/// Combined score weights
pub mod scoring {
    /// Accuracy lies in 0.0..=1.0, so it is scaled up to be comparable with energy
    pub const W_ACCURACY: f64 = 500.0;
    /// Energy is a penalty: the higher the charge, the worse
    pub const W_ENERGY: f64 = -1.0;
    /// Score of a classifier that sees no features (majority-class guess)
    pub const RANDOM_ACCURACY: f64 = 0.4;
}

/// Classifier evaluation constants
pub mod evaluation {
    pub const NUM_TREES: usize = 100;
    /// Seeded trials the validation score is averaged over (holdout mode)
    pub const NUM_TRIALS: usize = 1;
    /// Folds in subject-held-out cross-validation mode
    pub const NUM_VALIDATION_ITERATIONS: usize = 5;
    pub const USE_N_FOLD_CROSS_VALIDATION: bool = false;
    /// Seeded trials used when reporting the all-features baseline
    pub const BASELINE_TRIALS: usize = 10;

    pub const MIN_NUM_TREES: usize = 1;
    pub const MAX_NUM_TREES: usize = 10_000;
    pub const MIN_FOLDS: usize = 2;
    pub const MAX_FOLDS: usize = 100;
    pub const MIN_SAMPLES_SPLIT: usize = 2;
}

/// Particle swarm constants (inertia and acceleration from Xue et al.)
pub mod pso {
    pub const NUM_PARTICLES: usize = 100;
    pub const NUM_ITERATIONS: usize = 100;
    pub const INITIALIZE_WITH_ALL_PAIRS: bool = true;
    /// Binarization cutoff; raising it makes particles prefer fewer features
    pub const SELECTION_THRESHOLD: f64 = 0.9;
    /// Probability of a coordinate being active in a random initial particle
    pub const INITIAL_PROB: f64 = 0.5;
    pub const W: f64 = 0.7298;
    pub const C1: f64 = 1.49618;
    pub const C2: f64 = 1.49618;
    pub const VMAX: f64 = 0.6;
    /// Share of the crowding-ranked first front used as leaders
    pub const LEADER_FRACTION_NUM: usize = 3;
    pub const LEADER_FRACTION_DEN: usize = 4;
    pub const DEFAULT_SEED: u64 = 0;

    pub const MAX_NUM_PARTICLES: usize = 1_000_000;
    pub const MAX_NUM_ITERATIONS: usize = 100_000;
}

/// Mutual information ranking constants
pub mod mutual_info {
    pub const NUM_BINS: usize = 256;
    /// Substituted for NaN information values
    pub const NAN_SENTINEL: f64 = 0.0;
    pub const MIN_BINS: usize = 2;
    pub const MAX_BINS: usize = 65_536;
}

/// Dataset and feature catalog constants
pub mod dataset {
    pub const DEFAULT_DATASET: &str = "UCI HAR Dataset";
    pub const DEFAULT_DATA_ROOT: &str = "datasets";
    pub const DEFAULT_FEATURE_NAMES_FILE: &str = "feature_names.csv";
    pub const FEATURES_FILE: &str = "features.csv";
    pub const FEATURES_HEADER_ROWS: usize = 1;

    pub const TRAIN_SPLIT: &str = "train";
    pub const VALIDATION_SPLIT: &str = "validation";
    pub const TEST_SPLIT: &str = "test";

    /// Orientation-sensor features: most datasets have no gyroscope
    pub const EXCLUDED_SENSOR_MARKERS: &[&str] = &["Gyro", "angle"];
    /// Too expensive to transmit
    pub const EXCLUDED_COST_MARKERS: &[&str] = &["bandsEnergy"];
    /// Group identifier = first N dash-separated tokens of the feature name
    pub const GROUP_PREFIX_TOKENS: usize = 2;
}

/// Energy model constants
pub mod energy {
    /// Per-axis features are computed and sent for each of the x/y/z axes
    pub const NUM_AXIS: f64 = 3.0;
    /// Always-on "median of three" smoothing before any feature
    pub const DO_MEDIAN_FILTER: bool = true;
}

/// File system paths
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/featsel/config.toml";
    pub const USER_CONFIG_DIR: &str = ".featsel";
    pub const LOCAL_CONFIG_FILE: &str = "featsel.toml";
    pub const OVERRIDE_CONFIG_FILE: &str = "config/local.toml";
    pub const ENV_PREFIX: &str = "FSEL_";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_weights_have_expected_signs() {
        assert!(scoring::W_ACCURACY > 0.0);
        assert!(scoring::W_ENERGY < 0.0);
        assert!((0.0..=1.0).contains(&scoring::RANDOM_ACCURACY));
    }

    #[test]
    fn test_pso_constants_are_consistent() {
        assert!(pso::SELECTION_THRESHOLD > 0.5 && pso::SELECTION_THRESHOLD <= 1.0);
        assert!(pso::VMAX > 0.0);
        assert!(pso::LEADER_FRACTION_NUM < pso::LEADER_FRACTION_DEN);
    }

    #[test]
    fn test_splits_are_distinct() {
        let splits = [dataset::TRAIN_SPLIT, dataset::VALIDATION_SPLIT, dataset::TEST_SPLIT];
        assert!(splits.iter().enumerate().all(|(i, a)| splits[i + 1..].iter().all(|b| a != b)));
    }
}
