// src/config/loader.rs
//! Layered configuration loader
//!
//! Defaults, then every existing TOML file in discovery order, then
//! environment overrides. Later layers win key by key.

use crate::config::{constants::paths, schema_validator::SchemaValidator, SearchConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration loader
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    schema_validator: SchemaValidator,
    env_prefix: String,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Configuration validation errors: {}", join_errors(.0))]
    ValidationError(Vec<crate::config::schema_validator::ValidationError>),

    #[error("Configuration consistency errors: {}", .0.join("; "))]
    ConsistencyError(Vec<String>),

    #[error("IO error: {0}")]
    IoError(String),
}

fn join_errors(errors: &[crate::config::schema_validator::ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl ConfigLoader {
    /// Create new configuration loader
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Create loader with custom paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            schema_validator: SchemaValidator::new(),
            env_prefix: paths::ENV_PREFIX.to_string(),
        }
    }

    /// Use a different environment variable prefix
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load, merge and validate the search configuration
    pub fn load(&self) -> Result<SearchConfig, ConfigError> {
        let config = self.load_and_merge_configs()?;

        config
            .validate_consistency()
            .map_err(ConfigError::ConsistencyError)?;

        info!(
            dataset = %config.dataset.name,
            files = self.config_paths.iter().filter(|p| p.exists()).count(),
            "configuration loaded"
        );

        Ok(config)
    }

    /// Validate configuration without loading
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let toml_value = self.load_config_file(path)?;

        self.schema_validator
            .validate_config(&toml_value)
            .map_err(ConfigError::ValidationError)?;

        self.schema_validator
            .validate_dependencies(&toml_value)
            .map_err(ConfigError::ValidationError)?;

        Ok(())
    }

    /// Export configuration to file
    pub fn export_config<P: AsRef<Path>>(&self, config: &SearchConfig, path: P) -> Result<(), ConfigError> {
        let toml_content =
            toml::to_string_pretty(config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn load_and_merge_configs(&self) -> Result<SearchConfig, ConfigError> {
        let mut merged_config = toml::Value::Table(toml::value::Table::new());

        // Start with default configuration
        let default_config = toml::Value::try_from(SearchConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        merge_toml_values(&mut merged_config, default_config);

        for config_path in &self.config_paths {
            match self.load_config_file(config_path) {
                Ok(file_config) => {
                    debug!(path = %config_path.display(), "merging configuration file");
                    merge_toml_values(&mut merged_config, file_config);
                }
                Err(ConfigError::FileNotFound(_)) => continue, // Skip missing optional files
                Err(e) => return Err(e),
            }
        }

        self.apply_environment_overrides(&mut merged_config);

        self.schema_validator
            .validate_config(&merged_config)
            .map_err(ConfigError::ValidationError)?;

        self.schema_validator
            .validate_dependencies(&merged_config)
            .map_err(ConfigError::ValidationError)?;

        let config: SearchConfig = merged_config.try_into().map_err(|e| {
            ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
        })?;

        Ok(config)
    }

    fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<toml::Value, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: toml::Value = toml::from_str(&content)?;

        Ok(config)
    }

    /// `FSEL_PSO__NUM_PARTICLES=20` sets `pso.num_particles`; a double
    /// underscore separates sections because keys contain single ones
    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        for (key, value) in std::env::vars() {
            let Some(stripped) = key.strip_prefix(&self.env_prefix) else {
                continue;
            };

            let config_key = stripped.to_lowercase().replace("__", ".");
            debug!(key = %config_key, "environment override");
            let parsed = parse_env_value(&value, get_nested_value(config, &config_key));
            set_nested_value(config, &config_key, parsed);
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // System-wide configuration
        paths.push(PathBuf::from(paths::SYSTEM_CONFIG_PATH));

        // User configuration
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(paths::USER_CONFIG_DIR).join("config.toml"));
        }

        // Local configurations (in order of precedence)
        paths.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));
        paths.push(PathBuf::from(paths::OVERRIDE_CONFIG_FILE));

        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

/// Typed by the value already at the key when there is one, so textual
/// fields such as `dataset.name = "1234"` stay strings
fn parse_env_value(value: &str, current: Option<&toml::Value>) -> toml::Value {
    match current {
        Some(toml::Value::String(_)) => return toml::Value::String(value.to_string()),
        Some(toml::Value::Float(_)) => {
            if let Ok(float_val) = value.parse::<f64>() {
                return toml::Value::Float(float_val);
            }
        }
        _ => {}
    }

    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn get_nested_value<'v>(config: &'v toml::Value, path: &str) -> Option<&'v toml::Value> {
    path.split('.').try_fold(config, |current, part| current.get(part))
}

fn set_nested_value(config: &mut toml::Value, path: &str, value: toml::Value) {
    let parts: Vec<&str> = path.split('.').collect();
    let Some((last, sections)) = parts.split_last() else {
        return;
    };

    let mut current = config;
    for part in sections {
        let toml::Value::Table(table) = current else {
            return;
        };
        current = table
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    }

    if let toml::Value::Table(table) = current {
        table.insert(last.to_string(), value);
    }
}

// Cross-platform directory discovery
mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var_os("USERPROFILE").map(PathBuf::from)
        }
        #[cfg(not(target_os = "windows"))]
        {
            std::env::var_os("HOME").map(PathBuf::from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_loader_creation() {
        let loader = ConfigLoader::new();
        assert!(!loader.config_paths().is_empty());
    }

    #[test]
    fn test_load_default_config() {
        let loader = ConfigLoader::with_paths(Vec::new()).with_env_prefix("FSEL_UNIT_DEFAULT_");
        let config = loader.load().unwrap();
        assert_eq!(config.pso.num_particles, crate::config::pso::NUM_PARTICLES);
    }

    #[test]
    fn test_config_file_validation() {
        let loader = ConfigLoader::with_paths(Vec::new());

        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[dataset]
name = "SPHERE"
grouping = "individual"

[pso]
num_particles = 40
        "#
        )
        .unwrap();

        assert!(loader.validate_config_file(temp_file.path()).is_ok());
    }

    #[test]
    fn test_invalid_config_validation() {
        let loader = ConfigLoader::with_paths(Vec::new());

        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[pso]
selection_threshold = 2.5  # Above 1
        "#
        )
        .unwrap();

        assert!(loader.validate_config_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_file_layers_merge_in_order() {
        let mut first = NamedTempFile::new().unwrap();
        writeln!(first, "[pso]\nnum_particles = 10\nnum_iterations = 5").unwrap();
        let mut second = NamedTempFile::new().unwrap();
        writeln!(second, "[pso]\nnum_iterations = 7").unwrap();

        let loader = ConfigLoader::with_paths(vec![
            first.path().to_path_buf(),
            PathBuf::from("/nonexistent/featsel.toml"),
            second.path().to_path_buf(),
        ])
        .with_env_prefix("FSEL_UNIT_MERGE_");

        let config = loader.load().unwrap();
        assert_eq!(config.pso.num_particles, 10);
        assert_eq!(config.pso.num_iterations, 7);
    }

    #[test]
    fn test_environment_override() {
        std::env::set_var("FSEL_UNIT_ENV_PSO__NUM_PARTICLES", "24");
        std::env::set_var("FSEL_UNIT_ENV_DATASET__NAME", "PAMAP2");

        let loader = ConfigLoader::with_paths(Vec::new()).with_env_prefix("FSEL_UNIT_ENV_");
        let config = loader.load().unwrap();

        assert_eq!(config.pso.num_particles, 24);
        assert_eq!(config.dataset.name, "PAMAP2");

        std::env::remove_var("FSEL_UNIT_ENV_PSO__NUM_PARTICLES");
        std::env::remove_var("FSEL_UNIT_ENV_DATASET__NAME");
    }

    #[test]
    fn test_config_export() {
        let loader = ConfigLoader::with_paths(Vec::new());
        let temp_file = NamedTempFile::new().unwrap();

        assert!(loader.export_config(&SearchConfig::default(), temp_file.path()).is_ok());

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("[pso]"));
        assert!(content.contains("[energy"));
    }

    #[test]
    fn test_env_values_follow_existing_types() {
        let defaults = toml::Value::try_from(SearchConfig::default()).unwrap();

        let name = parse_env_value("1234", get_nested_value(&defaults, "dataset.name"));
        assert_eq!(name, toml::Value::String("1234".to_string()));

        let weight = parse_env_value("250", get_nested_value(&defaults, "scoring.w_accuracy"));
        assert_eq!(weight, toml::Value::Float(250.0));

        // Unset optional keys fall back to guessing
        assert!(get_nested_value(&defaults, "greedy.max_features").is_none());
        assert_eq!(parse_env_value("10", None), toml::Value::Integer(10));
        assert_eq!(parse_env_value("true", None), toml::Value::Boolean(true));
        assert_eq!(parse_env_value("UCI", None), toml::Value::String("UCI".to_string()));
    }

    #[test]
    fn test_set_nested_value_creates_sections() {
        let mut value = toml::Value::Table(toml::value::Table::new());
        set_nested_value(&mut value, "greedy.max_features", toml::Value::Integer(10));

        assert_eq!(
            value.get("greedy").and_then(|g| g.get("max_features")).and_then(|v| v.as_integer()),
            Some(10)
        );
    }
}
