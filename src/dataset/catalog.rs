// src/dataset/catalog.rs
//! Feature name catalog and grouping

use std::io::BufRead;
use std::path::Path;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::constants::dataset::{
    EXCLUDED_COST_MARKERS, EXCLUDED_SENSOR_MARKERS, GROUP_PREFIX_TOKENS,
};
use super::DatasetError;

/// Search granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// One search dimension per `<signal>-<statistic>` family
    #[default]
    Group,
    /// One search dimension per scalar feature
    Individual,
}

/// One scalar feature, i.e. one column of the feature matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub column: usize,
    pub name: String,
    pub group: String,
    pub category: String,
    pub function: String,
}

impl CatalogEntry {
    fn new(column: usize, name: &str) -> Self {
        let group = group_name(name);
        let (category, function) = match group.split_once('-') {
            Some((category, function)) => (category.to_string(), function.to_string()),
            None => (name.to_string(), String::new()),
        };

        Self {
            column,
            name: name.to_string(),
            group,
            category,
            function,
        }
    }
}

/// Group identifier: the first two dash-separated tokens
pub fn group_name(name: &str) -> String {
    name.split('-')
        .take(GROUP_PREFIX_TOKENS)
        .collect::<Vec<_>>()
        .join("-")
}

fn is_excluded(name: &str) -> bool {
    EXCLUDED_SENSOR_MARKERS
        .iter()
        .chain(EXCLUDED_COST_MARKERS)
        .any(|marker| name.contains(marker))
}

/// Ordered list of search dimensions and the columns each one selects
#[derive(Debug, Clone)]
pub struct FeatureCatalog {
    entries: Vec<CatalogEntry>,
    groups: Vec<String>,
    group_columns: Vec<Vec<usize>>,
    mode: GroupingMode,
}

impl FeatureCatalog {
    /// Build from names in column order. Column numbers count every name,
    /// including the ones that end up excluded.
    pub fn from_names<I, S>(names: I, mode: GroupingMode, filters: &[String]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries: Vec<CatalogEntry> = names
            .into_iter()
            .enumerate()
            .filter_map(|(column, name)| {
                let name = name.as_ref();
                if is_excluded(name) {
                    return None;
                }
                let entry = CatalogEntry::new(column, name);
                if !filters.is_empty() && !filters.iter().any(|f| entry.group.contains(f.as_str())) {
                    return None;
                }
                Some(entry)
            })
            .collect();

        let mut groups: Vec<String> = Vec::new();
        let mut group_columns: Vec<Vec<usize>> = Vec::new();
        for entry in &entries {
            let key = match mode {
                GroupingMode::Group => &entry.group,
                GroupingMode::Individual => &entry.name,
            };
            // Linear scan keeps first-seen order
            match groups.iter().position(|g| g == key) {
                Some(i) => group_columns[i].push(entry.column),
                None => {
                    groups.push(key.clone());
                    group_columns.push(vec![entry.column]);
                }
            }
        }

        debug!(entries = entries.len(), groups = groups.len(), ?mode, "feature catalog built");

        Self {
            entries,
            groups,
            group_columns,
            mode,
        }
    }

    /// Read a catalog: one feature name per non-empty line
    pub fn from_reader<R: BufRead>(reader: R, mode: GroupingMode, filters: &[String]) -> std::io::Result<Self> {
        let mut names = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let name = line.trim();
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
        Ok(Self::from_names(names, mode, filters))
    }

    pub fn load<P: AsRef<Path>>(path: P, mode: GroupingMode, filters: &[String]) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| DatasetError::Io {
            dataset: None,
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let catalog = Self::from_reader(std::io::BufReader::new(file), mode, filters).map_err(|e| {
            DatasetError::Io {
                dataset: None,
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;

        if catalog.is_empty() {
            return Err(DatasetError::EmptyCatalog {
                path: path.display().to_string(),
            });
        }

        Ok(catalog)
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).map(String::as_str)
    }

    /// Number of search dimensions
    pub fn num_features(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn mode(&self) -> GroupingMode {
        self.mode
    }

    /// Matrix columns selected by a set of group indexes, group by group.
    /// Indexes outside the catalog select nothing.
    pub fn columns_for(&self, indexes: &[usize]) -> Vec<usize> {
        indexes
            .iter()
            .filter_map(|&i| self.group_columns.get(i))
            .flatten()
            .copied()
            .collect()
    }

    /// Largest column number referenced, if any
    pub fn max_column(&self) -> Option<usize> {
        self.entries.iter().map(|e| e.column).max()
    }
}
