//! Sensitivity analysis over a finished results table.
//!
//! Variance-based indices are delegated to an external tool through
//! [`SensitivityAnalyzer`]; it needs the complete table in design order, so
//! tables with failed points are refused rather than silently shortened.
//! [`screen`] computes rank correlations and linear slopes in-process and
//! works on whatever rows completed.

mod external;
mod screening;

pub use external::ExternalAnalyzer;
pub use screening::{FactorScreening, screen, spearman};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::model::{EmissionSummary, ResultRow};

/// What to analyze
#[derive(Debug, Clone)]
pub struct AnalysisRequest<'a> {
    pub results: &'a Path,
    pub factors: &'a [String],
    /// Emission column, one of [`EmissionSummary::COLUMNS`]
    pub column: &'a str,
    pub second_order: bool,
    /// Rows the design produced
    pub expected_rows: usize,
}

/// First- and total-order indices per factor, in factor order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityIndices {
    pub column: String,
    pub factors: Vec<String>,
    pub first_order: Vec<f64>,
    pub total_order: Vec<f64>,
    pub first_order_conf: Option<Vec<f64>>,
    pub total_order_conf: Option<Vec<f64>>,
}

pub trait SensitivityAnalyzer {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<SensitivityIndices, AnalysisError>;
}

pub(crate) fn check_column(column: &str) -> Result<(), AnalysisError> {
    if EmissionSummary::COLUMNS.contains(&column) {
        Ok(())
    } else {
        Err(AnalysisError::UnknownColumn(column.to_string()))
    }
}

/// A table is usable for variance decomposition only when every design
/// point completed
pub fn check_complete(rows: &[ResultRow], expected_rows: usize) -> Result<(), AnalysisError> {
    let failed = rows.iter().filter(|r| !r.outcome.is_completed()).count();
    if failed > 0 {
        return Err(AnalysisError::IncompleteTable { failed });
    }
    if rows.len() != expected_rows {
        return Err(AnalysisError::RowCount {
            found: rows.len(),
            expected: expected_rows,
        });
    }
    Ok(())
}
