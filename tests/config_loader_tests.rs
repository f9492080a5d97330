// tests/config_loader_tests.rs
//! Layered configuration: defaults, files, environment

use std::io::Write;

use featsel_core::config::{ConfigError, ConfigLoader, SearchConfig};
use featsel_core::dataset::GroupingMode;
use featsel_core::selection::GreedyObjective;
use serial_test::serial;
use tempfile::NamedTempFile;

const PREFIX: &str = "FSEL_ITEST_";

fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with(PREFIX) {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn test_file_overrides_defaults_section_by_section() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[dataset]
name = "PAMAP2"
grouping = "individual"
filters = ["Acc"]

[greedy]
objective = "accuracy_only"
max_features = 10

[pso]
num_particles = 30
seed = 7
"#
    )
    .unwrap();

    let config = ConfigLoader::with_paths(vec![file.path().to_path_buf()])
        .with_env_prefix(PREFIX)
        .load()
        .unwrap();

    assert_eq!(config.dataset.name, "PAMAP2");
    assert_eq!(config.dataset.grouping, GroupingMode::Individual);
    assert_eq!(config.dataset.filters, vec!["Acc".to_string()]);
    assert_eq!(config.greedy.objective, GreedyObjective::AccuracyOnly);
    assert_eq!(config.greedy.max_features, Some(10));
    assert_eq!(config.pso.num_particles, 30);
    assert_eq!(config.pso.seed, 7);

    // Untouched sections keep their defaults
    let defaults = SearchConfig::default();
    assert_eq!(config.pso.num_iterations, defaults.pso.num_iterations);
    assert_eq!(config.scoring.w_accuracy, defaults.scoring.w_accuracy);
    assert_eq!(config.energy, defaults.energy);
}

#[test]
#[serial]
fn test_environment_beats_files() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[pso]\nnum_iterations = 12\nvmax = 0.5").unwrap();

    std::env::set_var("FSEL_ITEST_PSO__NUM_ITERATIONS", "3");
    std::env::set_var("FSEL_ITEST_EVALUATION__USE_CROSS_VALIDATION", "true");
    std::env::set_var("FSEL_ITEST_SCORING__W_ACCURACY", "250");

    let result = ConfigLoader::with_paths(vec![file.path().to_path_buf()])
        .with_env_prefix(PREFIX)
        .load();
    clear_env();

    let config = result.unwrap();
    assert_eq!(config.pso.num_iterations, 3);
    assert_eq!(config.pso.vmax, 0.5);
    assert!(config.evaluation.use_cross_validation);
    assert_eq!(config.scoring.w_accuracy, 250.0);
}

#[test]
#[serial]
fn test_numeric_looking_dataset_name_stays_text() {
    clear_env();
    std::env::set_var("FSEL_ITEST_DATASET__NAME", "1234");
    std::env::set_var("FSEL_ITEST_GREEDY__MAX_FEATURES", "4");

    let result = ConfigLoader::with_paths(Vec::new()).with_env_prefix(PREFIX).load();
    clear_env();

    let config = result.unwrap();
    assert_eq!(config.dataset.name, "1234");
    assert_eq!(config.greedy.max_features, Some(4));
}

#[test]
#[serial]
fn test_out_of_range_values_are_rejected() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[pso]\nselection_threshold = 1.5").unwrap();

    let result = ConfigLoader::with_paths(vec![file.path().to_path_buf()])
        .with_env_prefix(PREFIX)
        .load();
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
#[serial]
fn test_malformed_file_is_a_parse_error() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[pso\nnum_particles = ").unwrap();

    let result = ConfigLoader::with_paths(vec![file.path().to_path_buf()])
        .with_env_prefix(PREFIX)
        .load();
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_exported_config_loads_back() {
    clear_env();
    let mut config = SearchConfig::for_dataset("SPHERE");
    config.pso.num_particles = 16;
    config.mutual_information.max_features = Some(5);

    let file = NamedTempFile::new().unwrap();
    let loader = ConfigLoader::with_paths(vec![file.path().to_path_buf()]).with_env_prefix(PREFIX);
    loader.export_config(&config, file.path()).unwrap();

    let loaded = loader.load().unwrap();
    assert_eq!(loaded.dataset.name, "SPHERE");
    assert_eq!(loaded.pso.num_particles, 16);
    assert_eq!(loaded.mutual_information.max_features, Some(5));
    assert_eq!(loaded.energy, config.energy);
}
