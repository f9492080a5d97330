// src/selection/mutual_info.rs
//! Mutual-information ranking
//!
//! Groups are ranked once, without training anything, by the summed mutual
//! information between each of their columns and the activity label. Groups
//! are then accepted in rank order until the energy bound is reached.

use ndarray::ArrayView1;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::score::ScoreFunction;
use super::subset::FeatureSubset;
use super::trace::{StopReason, Trace, TraceEntry};
use super::{SelectionStep, StepwiseReport};
use crate::config::constants::mutual_info::NAN_SENTINEL;
use crate::config::MutualInfoConfig;
use crate::dataset::Dataset;
use crate::energy::EnergyEstimator;
use crate::error::SelectionResult;
use crate::evaluation::Evaluator;

/// Equal-width bin edges over the finite values; a degenerate range is
/// widened by half a unit on each side
#[derive(Debug, Clone, Copy)]
struct Bins {
    min: f64,
    width: f64,
    count: usize,
}

impl Bins {
    fn over(values: impl Iterator<Item = f64>, count: usize) -> Self {
        let (mut min, mut max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !min.is_finite() || !max.is_finite() {
            min = 0.0;
            max = 0.0;
        }
        if min == max {
            min -= 0.5;
            max += 0.5;
        }
        Self {
            min,
            width: max - min,
            count,
        }
    }

    /// The last bin is closed on the right
    fn index(&self, value: f64) -> usize {
        let position = (value - self.min) / self.width * self.count as f64;
        (position.max(0.0) as usize).min(self.count - 1)
    }
}

/// Mutual information in nats between two columns, estimated from a
/// `bins` x `bins` joint histogram. Rows where either value is not finite
/// are skipped. Returns NaN when no row remains.
pub fn histogram_mutual_information(x: ArrayView1<'_, f64>, y: &[f64], bins: usize) -> f64 {
    let bins = bins.max(1);
    let rows: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .map(|(&a, &b)| (a, b))
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .collect();

    let x_bins = Bins::over(rows.iter().map(|r| r.0), bins);
    let y_bins = Bins::over(rows.iter().map(|r| r.1), bins);

    let mut joint = vec![0usize; bins * bins];
    let mut x_marginal = vec![0usize; bins];
    let mut y_marginal = vec![0usize; bins];
    for &(a, b) in &rows {
        let i = x_bins.index(a);
        let j = y_bins.index(b);
        joint[i * bins + j] += 1;
        x_marginal[i] += 1;
        y_marginal[j] += 1;
    }

    let n = rows.len() as f64;
    let mut mi = 0.0;
    for i in 0..bins {
        for j in 0..bins {
            let c = joint[i * bins + j];
            if c == 0 {
                continue;
            }
            let c = c as f64;
            mi += c / n * (c * n / (x_marginal[i] as f64 * y_marginal[j] as f64)).ln();
        }
    }

    if rows.is_empty() {
        f64::NAN
    } else {
        mi.max(0.0)
    }
}

/// One ranked group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutualInformationRank {
    pub index: usize,
    pub name: String,
    pub mutual_information: f64,
}

pub struct MutualInformationSearch<'s, 'a, E, M> {
    scores: &'s ScoreFunction<'a, E, M>,
    dataset: &'s Dataset,
    num_bins: usize,
    max_features: Option<usize>,
}

impl<'s, 'a, E, M> MutualInformationSearch<'s, 'a, E, M>
where
    E: Evaluator,
    M: EnergyEstimator,
{
    pub fn new(scores: &'s ScoreFunction<'a, E, M>, dataset: &'s Dataset, config: &MutualInfoConfig) -> Self {
        Self {
            scores,
            dataset,
            num_bins: config.num_bins,
            max_features: config.max_features,
        }
    }

    /// Groups by descending mutual information on the training split;
    /// equal values keep catalog order
    pub fn rank(&self) -> Vec<MutualInformationRank> {
        let catalog = &self.dataset.catalog;
        let train = &self.dataset.train;
        let labels: Vec<f64> = train.labels.iter().map(|&l| l as f64).collect();

        let mut ranks: Vec<MutualInformationRank> = (0..catalog.num_features())
            .into_par_iter()
            .map(|index| {
                let name = catalog.group(index).unwrap_or_default().to_string();
                let total: f64 = catalog
                    .columns_for(&[index])
                    .into_iter()
                    .map(|column| {
                        let mi = histogram_mutual_information(train.features.column(column), &labels, self.num_bins);
                        if mi.is_nan() {
                            warn!(group = %name, column, "mutual information undefined, using sentinel");
                            NAN_SENTINEL
                        } else {
                            mi
                        }
                    })
                    .sum();
                MutualInformationRank {
                    index,
                    name,
                    mutual_information: total,
                }
            })
            .collect();

        ranks.sort_by(|a, b| b.mutual_information.total_cmp(&a.mutual_information));

        for rank in &ranks {
            debug!(group = %rank.name, mi = rank.mutual_information, "ranked");
        }
        ranks
    }

    pub fn run(&self) -> SelectionResult<StepwiseReport> {
        let limit = self.scores.energy_for_raw();
        let ranks = self.rank();
        info!(groups = ranks.len(), raw_energy = limit, "mutual information ranking done");

        let mut used = FeatureSubset::empty();
        let mut steps = Vec::new();
        let mut rejected = None;
        let mut trace = Trace::new();
        let mut stop = StopReason::NoCandidates;

        for rank in ranks {
            let candidate = used.with(rank.index);
            let score = self.scores.combined_score(&candidate)?;
            let step = SelectionStep {
                index: rank.index,
                name: rank.name,
                objective: score.score,
                score,
            };
            trace.record(step.trace_entry());

            if score.energy >= limit {
                stop = StopReason::EnergyLimit { energy: score.energy, limit };
                rejected = Some(step);
                break;
            }

            used = candidate;
            steps.push(step);

            if let Some(max) = self.max_features {
                if used.len() >= max {
                    stop = StopReason::MaxFeatures { count: used.len() };
                    break;
                }
            }
        }

        trace.record(TraceEntry::Stop { reason: stop.clone() });

        Ok(StepwiseReport {
            strategy: "mutual_information",
            raw_energy: limit,
            steps,
            rejected,
            stop,
            selected: used,
            trace,
        })
    }
}
