// src/classifier/mod.rs
//! Classifiers used to score feature subsets

pub mod forest;
pub mod metrics;

pub use forest::{DecisionTree, RandomForestClassifier};
pub use metrics::{f1_score, Average};

use ndarray::ArrayView2;
use thiserror::Error;

/// Classifier errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("evaluation set is empty")]
    EmptyEvaluationSet,

    #[error("{samples} samples but {labels} labels")]
    LabelMismatch { samples: usize, labels: usize },

    #[error("classifier has not been fitted")]
    NotFitted,

    #[error("fitted on {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Trainable classifier over dense class indices `0..n_classes`
pub trait Classifier: Send {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[usize]) -> Result<(), ClassifierError>;

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<usize>, ClassifierError>;
}
