// src/selection/trace.rs
//! Run trace
//!
//! Every entry renders as one stable, grep-able line. Downstream plotting
//! scripts parse these lines, so field order and labels must not change.

use std::fmt;
use serde::Serialize;
use tracing::info;

/// Why a stepwise search stopped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// Best candidate costs at least as much as sending raw data
    EnergyLimit { energy: f64, limit: f64 },
    /// Every group is already selected
    NoCandidates,
    /// Configured feature cap reached
    MaxFeatures { count: usize },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EnergyLimit { energy, limit } => write!(
                f,
                "energy {:.4} reached raw transmission energy {:.4}",
                energy, limit
            ),
            StopReason::NoCandidates => write!(f, "no candidate features left"),
            StopReason::MaxFeatures { count } => write!(f, "reached {} features", count),
        }
    }
}

/// One particle as it appears in the trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticleSummary {
    pub num_features: usize,
    pub validation: f64,
    pub test: f64,
    pub energy: f64,
    pub score: f64,
    /// Group names, sorted
    pub features: Vec<String>,
}

impl fmt::Display for ParticleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " Particle with #features={} accuracy={:.4}/{:.4} energy={:.4} score={:.4} features=[{}]",
            self.num_features,
            self.validation,
            self.test,
            self.energy,
            self.score,
            self.features.join(",")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEntry {
    /// Best candidate of a greedy or mutual-information step
    Step {
        name: String,
        score: f64,
        validation: f64,
        test: f64,
        energy: f64,
    },
    Stop { reason: StopReason },
    Iteration { iteration: usize, best: ParticleSummary },
    Particle(ParticleSummary),
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEntry::Step { name, score, validation, test, energy } => write!(
                f,
                "best at {} score={:.4} validation={:.4} test={:.4} energy={:.4}",
                name, score, validation, test, energy
            ),
            TraceEntry::Stop { reason } => write!(f, "stopping: {}", reason),
            TraceEntry::Iteration { iteration, best } => write!(f, "iteration {} best: {}", iteration, best),
            TraceEntry::Particle(particle) => write!(f, "{}", particle),
        }
    }
}

impl TraceEntry {
    pub fn emit(&self) {
        info!(target: "featsel::trace", "{}", self);
    }
}

/// Entries of one run, in emission order
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Trace(Vec<TraceEntry>);

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit the entry to the log and keep it
    pub fn record(&mut self, entry: TraceEntry) {
        entry.emit();
        self.0.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.0
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_line() {
        let entry = TraceEntry::Step {
            name: "tBodyAcc-mean()".to_string(),
            score: 489.5,
            validation: 0.98,
            test: 0.975,
            energy: 10.5,
        };
        assert_eq!(
            entry.to_string(),
            "best at tBodyAcc-mean() score=489.5000 validation=0.9800 test=0.9750 energy=10.5000"
        );
    }

    #[test]
    fn test_particle_lines() {
        let particle = ParticleSummary {
            num_features: 2,
            validation: 0.5,
            test: 0.25,
            energy: 1.0,
            score: 249.0,
            features: vec!["a-mean()".to_string(), "b-std()".to_string()],
        };
        let entry = TraceEntry::Iteration { iteration: 3, best: particle.clone() };

        assert_eq!(
            entry.to_string(),
            "iteration 3 best:  Particle with #features=2 accuracy=0.5000/0.2500 energy=1.0000 score=249.0000 features=[a-mean(),b-std()]"
        );
        assert!(TraceEntry::Particle(particle).to_string().starts_with(" Particle with"));
    }

    #[test]
    fn test_record_keeps_order() {
        let mut trace = Trace::new();
        trace.record(TraceEntry::Stop { reason: StopReason::NoCandidates });
        trace.record(TraceEntry::Stop { reason: StopReason::MaxFeatures { count: 10 } });

        assert_eq!(
            trace.lines(),
            vec![
                "stopping: no candidate features left".to_string(),
                "stopping: reached 10 features".to_string(),
            ]
        );
    }
}
