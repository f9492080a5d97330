// src/energy/cost_table.rs
//! Measured per-operation charges
//!
//! CPU charges are for one axis of a 128-sample window and include the cost
//! of the sampling loop itself; [`CostTable::normalized`] takes it out.
//! Transmission charges assume CBOR encoding of 16-bit floats.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// Keys the model looks up directly, besides per-feature-type charges
pub const REQUIRED_CPU_KEYS: &[&str] = &[
    "nop",
    "nop_nop",
    "correlation",
    "std",
    "energy",
    "min",
    "min+max",
    "median",
    "iqr",
    "median+iqr",
    "median+iqr+min+max",
    "t_median",
    "t_l1norm",
    "t_magnitude_sq",
    "t_jerk",
    "t_jerk+l1norm",
    "t_jerk+magnitude_sq",
];

pub const RAW_TX_KEY: &str = "raw";

/// Raw cost table, as measured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostTable {
    #[serde(default = "defaults::num_axis")]
    pub num_axis: f64,

    /// Apply the "median of three" transform before anything else
    #[serde(default = "defaults::median_filter")]
    pub median_filter: bool,

    #[serde(default = "defaults::cpu")]
    pub cpu: BTreeMap<String, f64>,

    #[serde(default = "defaults::tx")]
    pub tx: BTreeMap<String, f64>,
}

mod defaults {
    use std::collections::BTreeMap;
    use crate::config::constants::energy;

    pub fn num_axis() -> f64 { energy::NUM_AXIS }
    pub fn median_filter() -> bool { energy::DO_MEDIAN_FILTER }

    const MIN: f64 = 0.026026;
    const MEDIAN: f64 = 0.064468;

    pub fn cpu() -> BTreeMap<String, f64> {
        [
            ("nop", 0.012402),
            ("nop_nop", 0.014724),
            ("mean", 0.026026),
            ("energy", 0.032430),
            ("energy+mean", 0.035544),
            ("std", 0.035329),
            ("std+mean", 0.035444),
            ("std+energy", 0.039442),
            ("std+energy+mean", 0.039838),
            ("correlation", 0.066583),
            ("correlation+std", 0.066467),
            ("correlation+std+std", 0.066583),
            ("entropy", 0.257281),
            ("min", MIN),
            ("min+max", 0.030931),
            ("median", MEDIAN),
            ("iqr", 0.069977),
            ("median+iqr", 0.081483),
            ("median+iqr+min+max", 0.091505),
            ("t_median", 0.033430),
            ("t_l1norm", 0.034237),
            ("t_magnitude_sq", 0.029432),
            ("t_jerk", 0.023127),
            ("t_jerk+l1norm", 0.046846),
            ("t_jerk+magnitude_sq", 0.048053),
            // Same code path on the device
            ("max", MIN),
            ("q25", MEDIAN),
            ("q75", MEDIAN),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    pub fn tx() -> BTreeMap<String, f64> {
        [
            ("mean", 0.894657),
            ("energy", 1.488759),
            ("std", 1.488759),
            ("correlation", 1.488759),
            ("entropy", 1.488759),
            ("min", 1.015717),
            ("max", 1.172275),
            ("median", 1.016627),
            ("q25", 1.016627),
            ("q75", 1.016718),
            ("iqr", 0.843412),
            ("raw", 31.460966),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            num_axis: defaults::num_axis(),
            median_filter: defaults::median_filter(),
            cpu: defaults::cpu(),
            tx: defaults::tx(),
        }
    }
}

impl CostTable {
    /// Cost of running the sampling loop with nothing in it
    pub fn empty_loop(&self) -> f64 {
        let nop = self.cpu.get("nop").copied().unwrap_or(0.0);
        let nop_nop = self.cpu.get("nop_nop").copied().unwrap_or(nop);
        nop - (nop_nop - nop)
    }

    /// Table with the loop overhead taken out of every CPU charge.
    /// Always derived from the measured values, never from an already
    /// normalized table.
    pub fn normalized(&self) -> NormalizedCosts {
        let empty_loop = self.empty_loop();
        let cpu = self
            .cpu
            .iter()
            .map(|(key, cost)| (key.clone(), cost - empty_loop))
            .collect();

        NormalizedCosts {
            empty_loop,
            num_axis: self.num_axis,
            median_filter: self.median_filter,
            cpu,
            tx: self.tx.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for key in REQUIRED_CPU_KEYS {
            if !self.cpu.contains_key(*key) {
                errors.push(format!("Energy table is missing CPU cost '{}'", key));
            }
        }

        if !self.tx.contains_key(RAW_TX_KEY) {
            errors.push(format!("Energy table is missing TX cost '{}'", RAW_TX_KEY));
        }

        for (table, costs) in [("CPU", &self.cpu), ("TX", &self.tx)] {
            for (key, cost) in costs {
                if !cost.is_finite() || *cost < 0.0 {
                    errors.push(format!("{} cost '{}' must be a non-negative number, got {}", table, key, cost));
                }
            }
        }

        if self.num_axis < 1.0 {
            errors.push(format!("Axis multiplier ({}) must be at least 1", self.num_axis));
        }

        if self.empty_loop() < 0.0 {
            errors.push("Loop overhead is negative: 'nop_nop' exceeds twice 'nop'".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Cost table with the loop overhead already removed
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCosts {
    pub empty_loop: f64,
    pub num_axis: f64,
    pub median_filter: bool,
    cpu: BTreeMap<String, f64>,
    tx: BTreeMap<String, f64>,
}

impl NormalizedCosts {
    pub fn cpu(&self, key: &str) -> Option<f64> {
        self.cpu.get(key).copied()
    }

    pub fn tx(&self, key: &str) -> Option<f64> {
        self.tx.get(key).copied()
    }

    pub fn raw_tx(&self) -> f64 {
        self.tx(RAW_TX_KEY).unwrap_or(0.0)
    }
}

impl Default for NormalizedCosts {
    fn default() -> Self {
        CostTable::default().normalized()
    }
}
