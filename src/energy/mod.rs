// src/energy/mod.rs
//! Analytic energy model of on-device feature computation and transmission

pub mod cost_table;
pub mod feature_name;
pub mod model;

pub use cost_table::{CostTable, NormalizedCosts};
pub use feature_name::{FeatureName, Transform};
pub use model::EnergyModel;

use serde::{Deserialize, Serialize};

/// Charge per sampling window, in microcoulombs
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyCost {
    pub cpu_charge: f64,
    pub tx_charge: f64,
}

impl EnergyCost {
    pub fn new(cpu_charge: f64, tx_charge: f64) -> Self {
        Self { cpu_charge, tx_charge }
    }

    pub fn total(&self) -> f64 {
        self.cpu_charge + self.tx_charge
    }
}

/// Anything that can put a charge on a set of feature group names
pub trait EnergyEstimator: Send + Sync {
    /// Charge for computing and sending the named features.
    /// Order and duplicates in `names` do not matter.
    fn calc(&self, names: &[&str]) -> EnergyCost;

    /// Charge for sending the raw, unprocessed window instead
    fn calc_raw(&self) -> EnergyCost;
}
