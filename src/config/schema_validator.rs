// src/config/schema_validator.rs
//! Configuration schema validation

use std::collections::HashMap;
use crate::config::constants::*;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub value: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation error for '{}': {} (value: {})", self.field, self.message, self.value)
    }
}

impl std::error::Error for ValidationError {}

/// Schema validator for the merged TOML tree
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    constraints: HashMap<String, FieldConstraint>,
}

/// Field validation constraints
#[derive(Debug, Clone)]
pub enum FieldConstraint {
    Range { min: f64, max: f64 },
    IntRange { min: i64, max: i64 },
    OneOf(Vec<String>),
    MinLength(usize),
}

impl SchemaValidator {
    /// Create new schema validator with default constraints
    pub fn new() -> Self {
        let mut constraints = HashMap::new();

        // Dataset constraints
        constraints.insert("dataset.name".to_string(), FieldConstraint::MinLength(1));

        constraints.insert("dataset.grouping".to_string(),
                           FieldConstraint::OneOf(vec![
                               "group".to_string(),
                               "individual".to_string(),
                           ]));

        // Scoring constraints
        constraints.insert("scoring.w_accuracy".to_string(),
                           FieldConstraint::Range { min: 0.0, max: 1.0e6 });

        constraints.insert("scoring.w_energy".to_string(),
                           FieldConstraint::Range { min: -1.0e6, max: 0.0 });

        constraints.insert("scoring.random_accuracy".to_string(),
                           FieldConstraint::Range { min: 0.0, max: 1.0 });

        // Evaluation constraints
        constraints.insert("evaluation.num_trees".to_string(),
                           FieldConstraint::IntRange {
                               min: evaluation::MIN_NUM_TREES as i64,
                               max: evaluation::MAX_NUM_TREES as i64
                           });

        constraints.insert("evaluation.num_trials".to_string(),
                           FieldConstraint::IntRange { min: 1, max: 1000 });

        constraints.insert("evaluation.num_folds".to_string(),
                           FieldConstraint::IntRange {
                               min: evaluation::MIN_FOLDS as i64,
                               max: evaluation::MAX_FOLDS as i64
                           });

        constraints.insert("evaluation.baseline_trials".to_string(),
                           FieldConstraint::IntRange { min: 1, max: 1000 });

        constraints.insert("evaluation.min_samples_split".to_string(),
                           FieldConstraint::IntRange { min: 2, max: 1_000_000 });

        // Search constraints
        constraints.insert("greedy.objective".to_string(),
                           FieldConstraint::OneOf(vec![
                               "combined".to_string(),
                               "accuracy_only".to_string(),
                           ]));

        constraints.insert("greedy.max_features".to_string(),
                           FieldConstraint::IntRange { min: 1, max: i64::MAX });

        constraints.insert("mutual_information.num_bins".to_string(),
                           FieldConstraint::IntRange {
                               min: mutual_info::MIN_BINS as i64,
                               max: mutual_info::MAX_BINS as i64
                           });

        constraints.insert("mutual_information.max_features".to_string(),
                           FieldConstraint::IntRange { min: 1, max: i64::MAX });

        // Swarm constraints
        constraints.insert("pso.num_particles".to_string(),
                           FieldConstraint::IntRange {
                               min: 1,
                               max: pso::MAX_NUM_PARTICLES as i64
                           });

        constraints.insert("pso.num_iterations".to_string(),
                           FieldConstraint::IntRange {
                               min: 0,
                               max: pso::MAX_NUM_ITERATIONS as i64
                           });

        constraints.insert("pso.selection_threshold".to_string(),
                           FieldConstraint::Range { min: 0.0, max: 1.0 });

        constraints.insert("pso.initial_prob".to_string(),
                           FieldConstraint::Range { min: 0.0, max: 1.0 });

        constraints.insert("pso.w".to_string(),
                           FieldConstraint::Range { min: 0.0, max: 2.0 });

        constraints.insert("pso.c1".to_string(),
                           FieldConstraint::Range { min: 0.0, max: 4.0 });

        constraints.insert("pso.c2".to_string(),
                           FieldConstraint::Range { min: 0.0, max: 4.0 });

        constraints.insert("pso.vmax".to_string(),
                           FieldConstraint::Range { min: 0.0, max: 1.0 });

        // Energy table
        constraints.insert("energy.num_axis".to_string(),
                           FieldConstraint::Range { min: 1.0, max: 16.0 });

        Self { constraints }
    }

    /// Validate configuration value against schema
    pub fn validate_field(&self, field_path: &str, value: &toml::Value) -> Result<(), ValidationError> {
        if let Some(constraint) = self.constraints.get(field_path) {
            self.check_constraint(field_path, value, constraint)
        } else {
            Ok(()) // Unknown fields are allowed for extensibility
        }
    }

    /// Validate entire configuration
    pub fn validate_config(&self, config: &toml::Value) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        self.validate_recursive("", config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Check cross-field dependencies
    pub fn validate_dependencies(&self, config: &toml::Value) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        // Both acceleration terms off leaves a swarm that only drifts on inertia
        if let (Some(c1), Some(c2)) = (
            self.get_nested_value(config, "pso.c1").and_then(as_number),
            self.get_nested_value(config, "pso.c2").and_then(as_number),
        ) {
            if c1 + c2 <= 0.0 {
                errors.push(ValidationError {
                    field: "pso".to_string(),
                    message: "At least one acceleration coefficient must be positive".to_string(),
                    value: format!("c1: {}, c2: {}", c1, c2),
                });
            }
        }

        // A zero clamp freezes every particle in place
        if let Some(vmax) = self.get_nested_value(config, "pso.vmax").and_then(as_number) {
            if vmax <= 0.0 {
                errors.push(ValidationError {
                    field: "pso.vmax".to_string(),
                    message: "VMAX must be positive".to_string(),
                    value: vmax.to_string(),
                });
            }
        }

        // Cross-validation folds
        if let (Some(cv), Some(folds)) = (
            self.get_nested_value(config, "evaluation.use_cross_validation").and_then(|v| v.as_bool()),
            self.get_nested_value(config, "evaluation.num_folds").and_then(|v| v.as_integer()),
        ) {
            if cv && folds < evaluation::MIN_FOLDS as i64 {
                errors.push(ValidationError {
                    field: "evaluation.num_folds".to_string(),
                    message: "Cross-validation needs at least 2 folds".to_string(),
                    value: folds.to_string(),
                });
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn validate_recursive(&self, prefix: &str, value: &toml::Value, errors: &mut Vec<ValidationError>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };

                    if !val.is_table() {
                        if let Err(err) = self.validate_field(&path, val) {
                            errors.push(err);
                        }
                    }

                    self.validate_recursive(&path, val, errors);
                }
            }
            // Leaves are checked by their parent table
            _ => {}
        }
    }

    fn check_constraint(&self, field: &str, value: &toml::Value, constraint: &FieldConstraint) -> Result<(), ValidationError> {
        match constraint {
            FieldConstraint::Range { min, max } => {
                if let Some(val) = as_number(value) {
                    if !val.is_finite() || val < *min || val > *max {
                        return Err(ValidationError {
                            field: field.to_string(),
                            message: format!("Value must be between {} and {}", min, max),
                            value: val.to_string(),
                        });
                    }
                }
            }
            FieldConstraint::IntRange { min, max } => {
                if let Some(val) = value.as_integer() {
                    if val < *min || val > *max {
                        return Err(ValidationError {
                            field: field.to_string(),
                            message: format!("Value must be between {} and {}", min, max),
                            value: val.to_string(),
                        });
                    }
                }
            }
            FieldConstraint::OneOf(options) => {
                if let Some(val) = value.as_str() {
                    let val_lower = val.to_lowercase();
                    let options_lower: Vec<String> = options.iter().map(|opt| opt.to_lowercase()).collect();

                    if !options_lower.contains(&val_lower) {
                        return Err(ValidationError {
                            field: field.to_string(),
                            message: format!(
                                "Value must be one of: {}",
                                options.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                            ),
                            value: val.to_string(),
                        });
                    }
                }
            }
            FieldConstraint::MinLength(min_len) => {
                if let Some(val) = value.as_str() {
                    if val.trim().len() < *min_len {
                        return Err(ValidationError {
                            field: field.to_string(),
                            message: format!("Minimum length is {}", min_len),
                            value: val.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn get_nested_value<'a>(&self, config: &'a toml::Value, path: &str) -> Option<&'a toml::Value> {
        let mut current = config;

        for part in path.split('.') {
            current = current.as_table()?.get(part)?;
        }

        Some(current)
    }
}

/// TOML integers are accepted wherever a float is expected
fn as_number(value: &toml::Value) -> Option<f64> {
    value.as_float().or_else(|| value.as_integer().map(|i| i as f64))
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}
