// src/selection/mod.rs
//! Feature subset search strategies
//!
//! All strategies drive the same [`ScoreFunction`] and share one stopping
//! bound: a subset whose energy reaches the charge of transmitting the raw
//! window is never worth accepting.

pub mod greedy;
pub mod mutual_info;
pub mod pso;
pub mod score;
pub mod subset;
pub mod trace;

pub use greedy::GreedySearch;
pub use mutual_info::{MutualInformationSearch, MutualInformationRank};
pub use pso::{ObjectiveMode, ParticleSwarmSearch, SwarmReport};
pub use score::{MultiScore, ScoreFunction, SubsetScore};
pub use subset::FeatureSubset;
pub use trace::{ParticleSummary, StopReason, Trace, TraceEntry};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{IntoSelectionError, SelectionErrorBuilder, SelectionResult};

/// What the greedy search maximizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GreedyObjective {
    /// Weighted accuracy minus weighted energy
    #[default]
    Combined,
    /// Validation F1 alone; the energy bound still stops the search
    AccuracyOnly,
}

/// One accepted (or finally rejected) group of a stepwise search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionStep {
    pub index: usize,
    pub name: String,
    /// Objective value the step was chosen by
    pub objective: f64,
    pub score: SubsetScore,
}

impl SelectionStep {
    fn trace_entry(&self) -> TraceEntry {
        TraceEntry::Step {
            name: self.name.clone(),
            score: self.objective,
            validation: self.score.validation,
            test: self.score.test,
            energy: self.score.energy,
        }
    }
}

/// Result of a greedy or mutual-information run
#[derive(Debug, Clone, Serialize)]
pub struct StepwiseReport {
    pub strategy: &'static str,
    pub raw_energy: f64,
    /// Accepted groups in selection order
    pub steps: Vec<SelectionStep>,
    /// Candidate that tripped the energy bound, if any
    pub rejected: Option<SelectionStep>,
    pub stop: StopReason,
    pub selected: FeatureSubset,
    pub trace: Trace,
}

impl StepwiseReport {
    /// Group indexes in the order they were accepted
    pub fn order(&self) -> Vec<usize> {
        self.steps.iter().map(|s| s.index).collect()
    }

    pub fn final_score(&self) -> Option<&SubsetScore> {
        self.steps.last().map(|s| &s.score)
    }
}

/// Write any search report to `path` as pretty-printed JSON
pub fn write_json_report<T: Serialize>(report: &T, path: &Path) -> SelectionResult<()> {
    let file = File::create(path).map_err(|e| {
        SelectionErrorBuilder::new("report", "write_json").io(&path.display().to_string(), &e.to_string())
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).sel_err("report", "write_json")?;
    writer.flush().sel_err("report", "write_json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SelectionError;
    use tempfile::TempDir;

    fn report() -> StepwiseReport {
        StepwiseReport {
            strategy: "greedy",
            raw_energy: 10.0,
            steps: Vec::new(),
            rejected: None,
            stop: StopReason::NoCandidates,
            selected: FeatureSubset::empty(),
            trace: Trace::new(),
        }
    }

    #[test]
    fn test_report_written_as_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("greedy.json");
        write_json_report(&report(), &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["strategy"], "greedy");
        assert_eq!(value["raw_energy"], 10.0);
        assert_eq!(value["selected"], serde_json::json!([]));
    }

    #[test]
    fn test_unwritable_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("greedy.json");

        match write_json_report(&report(), &path) {
            Err(SelectionError::Io { path: Some(p), context, .. }) => {
                assert!(p.ends_with("greedy.json"));
                assert_eq!(context.component, "report");
            }
            other => panic!("expected io error, got {:?}", other.map(|_| ())),
        }
    }
}
