// src/energy/model.rs
//! Charge of computing and transmitting a set of features
//!
//! Compound statistics were only measured together (computing `std` yields
//! `mean` and `energy` for free, `correlation` yields all three), so within
//! each transform partition they are charged as a unit, in the measured
//! priority order correlation > std > energy, before order statistics are
//! resolved through their own combination table.

use std::collections::BTreeSet;
use tracing::warn;

use super::cost_table::{CostTable, NormalizedCosts};
use super::feature_name::{FeatureName, Transform};
use super::{EnergyCost, EnergyEstimator};

/// Compound statistic: when `trigger` is requested, one `cost_key` charge
/// covers every statistic in `covers`
struct Compound {
    trigger: &'static str,
    cost_key: &'static str,
    covers: &'static [&'static str],
}

const COMPOUNDS: [Compound; 3] = [
    Compound {
        trigger: "correlation",
        cost_key: "correlation",
        covers: &["std", "mean", "energy", "correlation"],
    },
    Compound {
        trigger: "std",
        cost_key: "std",
        covers: &["std", "mean", "energy"],
    },
    Compound {
        trigger: "energy",
        cost_key: "energy",
        covers: &["mean", "energy"],
    },
];

/// Analytic energy model over an immutable, normalized cost table
#[derive(Debug, Clone, Default)]
pub struct EnergyModel {
    costs: NormalizedCosts,
}

impl EnergyModel {
    pub fn new(table: &CostTable) -> Self {
        Self {
            costs: table.normalized(),
        }
    }

    pub fn costs(&self) -> &NormalizedCosts {
        &self.costs
    }

    fn cpu_cost(&self, key: &str) -> f64 {
        match self.costs.cpu(key) {
            Some(cost) => cost,
            None => {
                warn!(operation = key, "no CPU cost for operation, charging zero");
                0.0
            }
        }
    }

    fn axis_factor(&self, feature: &FeatureName<'_>) -> f64 {
        if feature.multiaxial {
            self.costs.num_axis
        } else {
            1.0
        }
    }

    /// Shared preprocessing, charged once for the whole set
    fn transforms_cost(&self, features: &[FeatureName<'_>]) -> f64 {
        let any = |marker: &str| features.iter().any(|f| f.name.contains(marker));

        let mut cost = if self.costs.median_filter {
            self.cpu_cost("t_median")
        } else {
            0.0
        };

        if any("Jerk") {
            cost += if any("MagSq") {
                self.cpu_cost("t_jerk+magnitude_sq")
            } else if any("L1Norm") {
                self.cpu_cost("t_jerk+l1norm")
            } else {
                self.cpu_cost("t_jerk")
            };
        } else if any("MagSq") {
            cost += self.cpu_cost("t_magnitude_sq");
        } else if any("L1Norm") {
            cost += self.cpu_cost("t_l1norm");
        }

        cost
    }

    /// Median, quartiles, IQR, min and max share a sort
    fn order_statistics_cost(&self, remaining: &mut Vec<FeatureName<'_>>) -> f64 {
        let (mut has_median, mut has_iqr, mut has_min, mut has_max) = (false, false, false, false);

        remaining.retain(|f| {
            match f.kind {
                "iqr" => has_iqr = true,
                "max" => has_max = true,
                "min" => has_min = true,
                "median" | "q25" | "q75" => has_median = true,
                _ => return true,
            }
            false
        });

        if has_median && has_iqr {
            if has_min || has_max {
                self.cpu_cost("median+iqr+min+max")
            } else {
                self.cpu_cost("median+iqr")
            }
        } else {
            let mut cost = 0.0;
            if has_min && has_max {
                cost += self.cpu_cost("min+max");
            } else if has_min || has_max {
                cost += self.cpu_cost("min");
            }
            if has_median {
                cost += self.cpu_cost("median");
            }
            if has_iqr {
                cost += self.cpu_cost("iqr");
            }
            cost
        }
    }

    fn partition_cpu_cost(&self, mut remaining: Vec<FeatureName<'_>>) -> f64 {
        let mut cost = 0.0;

        for compound in &COMPOUNDS {
            if remaining.iter().any(|f| f.kind == compound.trigger) {
                cost += self.cpu_cost(compound.cost_key);
                remaining.retain(|f| !compound.covers.contains(&f.kind));
            }
        }

        cost += self.order_statistics_cost(&mut remaining);

        for feature in &remaining {
            let per_axis = match self.costs.cpu(feature.kind) {
                Some(c) => c,
                None => {
                    warn!(feature = feature.name, kind = feature.kind, "unknown feature type, no CPU charge");
                    0.0
                }
            };
            cost += per_axis * self.axis_factor(feature);
        }

        cost
    }

    fn tx_cost(&self, features: &[FeatureName<'_>]) -> f64 {
        features
            .iter()
            .map(|feature| match self.costs.tx(feature.kind) {
                Some(c) => c * self.axis_factor(feature),
                None => {
                    warn!(feature = feature.name, kind = feature.kind, "unknown feature type, no TX charge");
                    0.0
                }
            })
            .sum()
    }
}

impl EnergyEstimator for EnergyModel {
    fn calc(&self, names: &[&str]) -> EnergyCost {
        let unique: BTreeSet<&str> = names.iter().copied().collect();
        if unique.is_empty() {
            return EnergyCost::new(self.costs.empty_loop, 0.0);
        }

        let features: Vec<FeatureName<'_>> = unique.into_iter().map(FeatureName::parse).collect();

        let mut cpu = self.costs.empty_loop + self.transforms_cost(&features);
        for transform in Transform::ALL {
            let partition: Vec<FeatureName<'_>> = features
                .iter()
                .filter(|f| f.transform == transform)
                .copied()
                .collect();
            if !partition.is_empty() {
                cpu += self.partition_cpu_cost(partition);
            }
        }

        EnergyCost::new(cpu, self.tx_cost(&features))
    }

    fn calc_raw(&self) -> EnergyCost {
        EnergyCost::new(self.costs.empty_loop, self.costs.raw_tx())
    }
}
