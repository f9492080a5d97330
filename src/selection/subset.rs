// src/selection/subset.rs
//! Canonical feature subsets

use std::fmt;
use serde::Serialize;

use crate::error::{SelectionErrorBuilder, SelectionResult};

/// Set of group indexes kept sorted and free of duplicates, so that equal
/// sets always hash and compare equal regardless of how they were built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FeatureSubset(Vec<usize>);

impl FeatureSubset {
    /// Canonicalize `indexes`, rejecting any index `>= num_features`
    pub fn new<I>(indexes: I, num_features: usize) -> SelectionResult<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut indexes: Vec<usize> = indexes.into_iter().collect();
        if let Some(&bad) = indexes.iter().find(|&&i| i >= num_features) {
            return Err(SelectionErrorBuilder::new("subset", "new").out_of_range(
                "feature index",
                format!("< {}", num_features),
                bad.to_string(),
            ));
        }
        indexes.sort_unstable();
        indexes.dedup();
        Ok(Self(indexes))
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn indexes(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.binary_search(&index).is_ok()
    }

    /// New subset with one more index; `self` is left untouched
    pub fn with(&self, index: usize) -> Self {
        let mut indexes = self.0.clone();
        if let Err(pos) = indexes.binary_search(&index) {
            indexes.insert(pos, index);
        }
        Self(indexes)
    }

    /// Group names of the selected indexes, in index order
    pub fn names<'g>(&self, groups: &'g [String]) -> Vec<&'g str> {
        self.0
            .iter()
            .filter_map(|&i| groups.get(i).map(String::as_str))
            .collect()
    }
}

impl fmt::Display for FeatureSubset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
