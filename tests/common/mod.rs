// tests/common/mod.rs
//! Shared fixtures for the integration tests

#![allow(dead_code)]

use featsel_core::dataset::{Dataset, FeatureCatalog, GroupingMode, SplitData};
use featsel_core::energy::{EnergyCost, EnergyEstimator};
use ndarray::Array2;

/// One scalar feature per group
pub const GROUPS: [&str; 4] = ["tBodyAcc-mean()", "tBodyAcc-std()", "tBodyAcc-max()", "tBodyAcc-min()"];

/// Group 0 separates the two classes (values in [0, 1) against [2, 3)).
/// Groups 1-3 are binary patterns independent of the label.
pub fn split(rows: usize, offset: usize) -> SplitData {
    let mut features = Array2::zeros((rows, GROUPS.len()));
    let mut labels = Vec::with_capacity(rows);

    for i in 0..rows {
        let class = i % 2;
        let position = (i + offset) as f64 / (rows + offset) as f64;
        features[[i, 0]] = class as f64 * 2.0 + 0.05 + 0.9 * position;
        features[[i, 1]] = ((i / 2) % 2) as f64;
        features[[i, 2]] = ((i / 4) % 2) as f64;
        features[[i, 3]] = ((i / 8) % 2) as f64;
        labels.push(1 + class as u32);
    }

    let subjects = (0..rows).map(|i| 1 + (i / 16) as u32).collect();
    SplitData::new(features, labels, subjects).unwrap()
}

pub fn separable_dataset() -> Dataset {
    let catalog = FeatureCatalog::from_names(GROUPS, GroupingMode::Group, &[]);
    Dataset::new("separable", catalog, split(64, 0), split(16, 3), split(16, 7)).unwrap()
}

pub fn group_names() -> Vec<String> {
    GROUPS.iter().map(|g| g.to_string()).collect()
}

/// Group 0 is free, every other group costs 50; raw transmission costs 10
pub struct StepCost;

impl EnergyEstimator for StepCost {
    fn calc(&self, names: &[&str]) -> EnergyCost {
        let cpu = names.iter().map(|n| if *n == GROUPS[0] { 0.0 } else { 50.0 }).sum();
        EnergyCost::new(cpu, 0.0)
    }

    fn calc_raw(&self) -> EnergyCost {
        EnergyCost::new(0.0, 10.0)
    }
}
