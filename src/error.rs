// src/error.rs
//! Unified error handling for the feature selection core
//!
//! Every fatal failure in a search run (bad configuration, unreadable dataset,
//! classifier training failure, malformed feature subset) is converted into a
//! [`SelectionError`] so that a run aborts with a single, context-rich error.
//! Degraded-but-recoverable conditions (unknown energy feature types, NaN
//! mutual information) never reach this type; they are logged and replaced.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use serde::{Deserialize, Serialize};

/// Unified error type for the whole search pipeline
#[derive(Debug, Clone)]
pub enum SelectionError {
    /// Configuration loading and validation errors
    Configuration {
        component: String,
        reason: String,
        context: ErrorContext,
    },

    /// Dataset or feature catalog errors
    Dataset {
        dataset: String,
        error: Arc<dyn Error + Send + Sync>,
        context: ErrorContext,
    },

    /// Subset evaluation errors
    Evaluation {
        stage: EvaluationStage,
        reason: String,
        context: ErrorContext,
    },

    /// Invalid input data errors
    InvalidData {
        data_type: String,
        reason: String,
        expected: Option<String>,
        actual: Option<String>,
        context: ErrorContext,
    },

    /// Classifier training or prediction errors
    Classifier {
        error: Arc<dyn Error + Send + Sync>,
        context: ErrorContext,
    },

    /// File system errors
    Io {
        path: Option<String>,
        reason: String,
        context: ErrorContext,
    },
}

/// Evaluation stages for error tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EvaluationStage {
    ColumnSelection,
    Training,
    Prediction,
    Scoring,
    CrossValidation,
}

/// Error context for debugging and analysis
#[derive(Debug, Clone, Serialize)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    pub thread_id: Option<String>,
    pub component: String,
    pub operation: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
    pub additional_info: std::collections::HashMap<String, String>,
    pub chain: Vec<String>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            thread_id: Self::current_thread_id(),
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
            additional_info: std::collections::HashMap::new(),
            chain: Vec::new(),
        }
    }

    /// Create error context with file and line information
    pub fn with_location(
        component: &str,
        operation: &str,
        file: &'static str,
        line: u32,
    ) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }

    /// Add additional information to the context
    pub fn add_info<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }

    /// Add to the error chain
    pub fn add_to_chain(mut self, error: &str) -> Self {
        self.chain.push(error.to_string());
        self
    }

    fn current_thread_id() -> Option<String> {
        std::thread::current().name().map(|s| s.to_string())
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::Configuration { component, reason, context } => {
                write!(f, "[CONFIG] Configuration error in {}: {} ({})",
                       component, reason, context.operation)
            }
            SelectionError::Dataset { dataset, error, context } => {
                write!(f, "[DATASET] Dataset '{}' error: {} ({})",
                       dataset, error, context.operation)
            }
            SelectionError::Evaluation { stage, reason, context } => {
                write!(f, "[EVALUATION] {:?} stage error: {} ({})",
                       stage, reason, context.operation)
            }
            SelectionError::InvalidData { data_type, reason, expected, actual, context } => {
                match (expected, actual) {
                    (Some(exp), Some(act)) => write!(f, "[DATA] Invalid {}: {} (expected: {}, got: {}) ({})",
                                                     data_type, reason, exp, act, context.operation),
                    _ => write!(f, "[DATA] Invalid {}: {} ({})", data_type, reason, context.operation),
                }
            }
            SelectionError::Classifier { error, context } => {
                write!(f, "[CLASSIFIER] {} (at {}:{})",
                       error, context.file.unwrap_or("unknown"), context.line.unwrap_or(0))
            }
            SelectionError::Io { path, reason, context } => {
                match path {
                    Some(p) => write!(f, "[IO] {}: {} ({})", p, reason, context.operation),
                    None => write!(f, "[IO] {} ({})", reason, context.operation),
                }
            }
        }
    }
}

impl Error for SelectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SelectionError::Dataset { error, .. } => Some(error.as_ref()),
            SelectionError::Classifier { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

/// Conversion from classifier errors
impl From<crate::classifier::ClassifierError> for SelectionError {
    fn from(err: crate::classifier::ClassifierError) -> Self {
        let context = error_context!("classifier", "fit_predict");
        SelectionError::Classifier {
            error: Arc::new(err),
            context,
        }
    }
}

/// Conversion from dataset errors
impl From<crate::dataset::DatasetError> for SelectionError {
    fn from(err: crate::dataset::DatasetError) -> Self {
        let context = error_context!("dataset", "load");
        SelectionError::Dataset {
            dataset: err.dataset_name().unwrap_or("unknown").to_string(),
            error: Arc::new(err),
            context,
        }
    }
}

/// Conversion from configuration errors
impl From<crate::config::ConfigError> for SelectionError {
    fn from(err: crate::config::ConfigError) -> Self {
        SelectionError::Configuration {
            component: "config_loader".to_string(),
            reason: err.to_string(),
            context: error_context!("config_loader", "load"),
        }
    }
}

impl From<std::io::Error> for SelectionError {
    fn from(err: std::io::Error) -> Self {
        SelectionError::Io {
            path: None,
            reason: err.to_string(),
            context: ErrorContext::new("io", "read_write"),
        }
    }
}

/// Result type alias for search operations
pub type SelectionResult<T> = Result<T, SelectionError>;

/// Error builder for convenient error construction
pub struct SelectionErrorBuilder {
    component: String,
    operation: String,
    info: Vec<(String, String)>,
}

impl SelectionErrorBuilder {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            info: Vec::new(),
        }
    }

    /// Attach a key/value pair to the context of the built error
    pub fn with_info<V: ToString>(mut self, key: &str, value: V) -> Self {
        self.info.push((key.to_string(), value.to_string()));
        self
    }

    fn context(&self) -> ErrorContext {
        self.info
            .iter()
            .fold(ErrorContext::new(&self.component, &self.operation), |context, (k, v)| {
                context.add_info(k.as_str(), v.as_str())
            })
    }

    pub fn configuration(self, reason: &str) -> SelectionError {
        let context = self.context();
        SelectionError::Configuration {
            component: self.component,
            reason: reason.to_string(),
            context,
        }
    }

    pub fn evaluation(self, stage: EvaluationStage, reason: &str) -> SelectionError {
        SelectionError::Evaluation {
            stage,
            reason: reason.to_string(),
            context: self.context(),
        }
    }

    pub fn out_of_range(self, data_type: &str, expected: String, actual: String) -> SelectionError {
        SelectionError::InvalidData {
            data_type: data_type.to_string(),
            reason: "value out of range".to_string(),
            expected: Some(expected),
            actual: Some(actual),
            context: self.context(),
        }
    }

    pub fn io(self, path: &str, reason: &str) -> SelectionError {
        SelectionError::Io {
            path: Some(path.to_string()),
            reason: reason.to_string(),
            context: self.context(),
        }
    }
}

/// Convenience trait for error building
pub trait IntoSelectionError<T> {
    fn sel_err(self, component: &str, operation: &str) -> SelectionResult<T>;
}

impl<T, E> IntoSelectionError<T> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn sel_err(self, component: &str, operation: &str) -> SelectionResult<T> {
        self.map_err(|err| {
            SelectionError::Io {
                path: None,
                reason: err.to_string(),
                context: ErrorContext::new(component, operation).add_to_chain(&err.to_string()),
            }
        })
    }
}
