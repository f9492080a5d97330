// src/dataset/mod.rs
//! Dataset splits, feature catalog and class distribution

pub mod catalog;
pub mod loader;

pub use catalog::{CatalogEntry, FeatureCatalog, GroupingMode};
pub use loader::DatasetLoader;

use std::collections::BTreeMap;
use std::fmt;
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::constants::dataset::{TEST_SPLIT, TRAIN_SPLIT, VALIDATION_SPLIT};
use crate::config::DatasetConfig;

/// Dataset loading errors
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("cannot read {path}: {message}")]
    Io {
        dataset: Option<String>,
        path: String,
        message: String,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        dataset: String,
        path: String,
        line: usize,
        message: String,
    },

    #[error("split '{split}' is inconsistent: {message}")]
    Shape {
        dataset: String,
        split: String,
        message: String,
    },

    #[error("no usable feature names in {path}")]
    EmptyCatalog { path: String },

    #[error("catalog references column {column} but split '{split}' has {available} columns")]
    MissingColumn {
        dataset: String,
        split: String,
        column: usize,
        available: usize,
    },
}

impl DatasetError {
    pub fn dataset_name(&self) -> Option<&str> {
        match self {
            DatasetError::Io { dataset, .. } => dataset.as_deref(),
            DatasetError::Parse { dataset, .. }
            | DatasetError::Shape { dataset, .. }
            | DatasetError::MissingColumn { dataset, .. } => Some(dataset),
            DatasetError::EmptyCatalog { .. } => None,
        }
    }
}

/// Feature matrix with parallel label and subject vectors
#[derive(Debug, Clone)]
pub struct SplitData {
    /// Rows are windows, columns are scalar features
    pub features: Array2<f64>,
    /// Activity codes
    pub labels: Vec<u32>,
    pub subjects: Vec<u32>,
}

impl SplitData {
    pub fn new(features: Array2<f64>, labels: Vec<u32>, subjects: Vec<u32>) -> Result<Self, String> {
        if labels.len() != features.nrows() {
            return Err(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            ));
        }
        if subjects.len() != features.nrows() {
            return Err(format!(
                "{} feature rows but {} subject ids",
                features.nrows(),
                subjects.len()
            ));
        }
        Ok(Self { features, labels, subjects })
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    /// Copy of the matrix restricted to the given columns
    pub fn select_columns(&self, columns: &[usize]) -> Array2<f64> {
        self.features.select(Axis(1), columns)
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    /// Rows of several splits stacked in order
    pub fn concat(splits: &[&SplitData]) -> Result<Self, String> {
        let views: Vec<ArrayView2<'_, f64>> = splits.iter().map(|s| s.features.view()).collect();
        let features = if views.is_empty() {
            Array2::zeros((0, 0))
        } else {
            concatenate(Axis(0), &views).map_err(|e| e.to_string())?
        };

        let labels = splits.iter().flat_map(|s| s.labels.iter().copied()).collect();
        let subjects = splits.iter().flat_map(|s| s.subjects.iter().copied()).collect();
        Self::new(features, labels, subjects)
    }

    /// Split rows by predicate on the subject id: (matching, rest)
    pub fn partition_by_subject<F>(&self, mut predicate: F) -> (SplitData, SplitData)
    where
        F: FnMut(u32) -> bool,
    {
        let (matching, rest): (Vec<usize>, Vec<usize>) =
            (0..self.n_rows()).partition(|&i| predicate(self.subjects[i]));
        (self.take_rows(&matching), self.take_rows(&rest))
    }

    pub fn take_rows(&self, rows: &[usize]) -> SplitData {
        SplitData {
            features: self.features.select(Axis(0), rows),
            labels: rows.iter().map(|&i| self.labels[i]).collect(),
            subjects: rows.iter().map(|&i| self.subjects[i]).collect(),
        }
    }
}

/// Label counts of one split
#[derive(Debug, Clone, Serialize)]
pub struct ClassDistribution {
    pub split: String,
    pub total: usize,
    pub counts: BTreeMap<u32, usize>,
}

impl ClassDistribution {
    pub fn from_labels(split: &str, labels: &[u32]) -> Self {
        let mut counts = BTreeMap::new();
        for &label in labels {
            *counts.entry(label).or_insert(0) += 1;
        }
        Self {
            split: split.to_string(),
            total: labels.len(),
            counts,
        }
    }

    pub fn percentage(&self, label: u32) -> f64 {
        match (self.counts.get(&label), self.total) {
            (Some(&count), total) if total > 0 => 100.0 * count as f64 / total as f64,
            _ => 0.0,
        }
    }
}

impl fmt::Display for ClassDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:\t{} total", self.split, self.total)?;
        for label in self.counts.keys() {
            write!(f, "\n{}:\t{:2.2}%", label, self.percentage(*label))?;
        }
        Ok(())
    }
}

/// All three splits of a dataset plus its feature catalog
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub catalog: FeatureCatalog,
    pub train: SplitData,
    pub validation: SplitData,
    pub test: SplitData,
}

impl Dataset {
    pub fn new(
        name: &str,
        catalog: FeatureCatalog,
        train: SplitData,
        validation: SplitData,
        test: SplitData,
    ) -> Result<Self, DatasetError> {
        let dataset = Self {
            name: name.to_string(),
            catalog,
            train,
            validation,
            test,
        };
        dataset.check_columns()?;
        Ok(dataset)
    }

    pub fn load(config: &DatasetConfig) -> Result<Self, DatasetError> {
        Self::load_with(config, &DatasetLoader::new())
    }

    pub fn load_with(config: &DatasetConfig, loader: &DatasetLoader) -> Result<Self, DatasetError> {
        let catalog = FeatureCatalog::load(&config.feature_names_path, config.grouping, &config.filters)?;

        let load = |split: &str| loader.load_split(&config.split_dir(split), &config.name, split);
        let train = load(TRAIN_SPLIT)?;
        let validation = load(VALIDATION_SPLIT)?;
        let test = load(TEST_SPLIT)?;

        info!(
            dataset = %config.name,
            groups = catalog.num_features(),
            train = train.n_rows(),
            validation = validation.n_rows(),
            test = test.n_rows(),
            "dataset loaded"
        );

        Self::new(&config.name, catalog, train, validation, test)
    }

    pub fn splits(&self) -> [(&'static str, &SplitData); 3] {
        [
            (TRAIN_SPLIT, &self.train),
            (VALIDATION_SPLIT, &self.validation),
            (TEST_SPLIT, &self.test),
        ]
    }

    pub fn class_distribution(&self) -> Vec<ClassDistribution> {
        self.splits()
            .iter()
            .map(|(name, split)| ClassDistribution::from_labels(name, &split.labels))
            .collect()
    }

    fn check_columns(&self) -> Result<(), DatasetError> {
        let Some(max_column) = self.catalog.max_column() else {
            return Ok(());
        };
        for (split_name, split) in self.splits() {
            if max_column >= split.features.ncols() {
                return Err(DatasetError::MissingColumn {
                    dataset: self.name.clone(),
                    split: split_name.to_string(),
                    column: max_column,
                    available: split.features.ncols(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn split(rows: Array2<f64>, labels: Vec<u32>, subjects: Vec<u32>) -> SplitData {
        SplitData::new(rows, labels, subjects).unwrap()
    }

    #[test]
    fn test_class_distribution() {
        let dist = ClassDistribution::from_labels("train", &[1, 1, 2, 3]);
        assert_eq!(dist.total, 4);
        assert_eq!(dist.counts[&1], 2);
        assert_eq!(dist.percentage(1), 50.0);
        assert_eq!(dist.percentage(9), 0.0);

        let text = dist.to_string();
        assert!(text.starts_with("train:\t4 total"));
        assert!(text.contains("2:\t25.00%"));
    }

    #[test]
    fn test_concat_and_partition() {
        let a = split(array![[1.0, 2.0], [3.0, 4.0]], vec![0, 1], vec![5, 6]);
        let b = split(array![[5.0, 6.0]], vec![1], vec![5]);

        let all = SplitData::concat(&[&a, &b]).unwrap();
        assert_eq!(all.n_rows(), 3);

        let (held_out, rest) = all.partition_by_subject(|s| s == 5);
        assert_eq!(held_out.labels, vec![0, 1]);
        assert_eq!(held_out.features, array![[1.0, 2.0], [5.0, 6.0]]);
        assert_eq!(rest.subjects, vec![6]);
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let catalog = FeatureCatalog::from_names(["a-mean()", "b-mean()", "c-mean()"], GroupingMode::Group, &[]);
        let narrow = split(array![[1.0, 2.0]], vec![0], vec![1]);

        let err = Dataset::new("narrow", catalog, narrow.clone(), narrow.clone(), narrow).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { column: 2, .. }));
    }
}
