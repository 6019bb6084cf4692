use serde::Serialize;

use super::{AllocationVector, EmissionSummary, ProportionVector};

/// What happened to one design point
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PointOutcome {
    Completed(EmissionSummary),
    Failed { reason: String },
}

impl PointOutcome {
    pub fn failed(reason: impl ToString) -> Self {
        PointOutcome::Failed {
            reason: reason.to_string(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PointOutcome::Completed(_))
    }

    pub fn emissions(&self) -> Option<&EmissionSummary> {
        match self {
            PointOutcome::Completed(summary) => Some(summary),
            PointOutcome::Failed { .. } => None,
        }
    }
}

/// One line of the results table: the mix that drove a run and its outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub index: usize,
    pub label: String,
    pub proportions: Vec<f64>,
    pub counts: Vec<u64>,
    pub outcome: PointOutcome,
}

impl ResultRow {
    pub fn new(
        index: usize,
        label: impl Into<String>,
        proportions: &ProportionVector,
        allocation: &AllocationVector,
        outcome: PointOutcome,
    ) -> Self {
        Self {
            index,
            label: label.into(),
            proportions: proportions.as_slice().to_vec(),
            counts: allocation.as_slice().to_vec(),
            outcome,
        }
    }
}

/// Failure record kept in the sweep report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedPoint {
    pub index: usize,
    pub label: String,
    pub reason: String,
}

/// Summary of one sweep or scenario batch
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub total_points: usize,
    /// Points already present in a resumed results table
    pub resumed_points: usize,
    pub completed: usize,
    pub failed: Vec<FailedPoint>,
    pub results_path: std::path::PathBuf,
    pub started_at: jiff::Timestamp,
    pub finished_at: jiff::Timestamp,
}

impl SweepReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn elapsed(&self) -> jiff::SignedDuration {
        self.finished_at.duration_since(self.started_at)
    }
}
