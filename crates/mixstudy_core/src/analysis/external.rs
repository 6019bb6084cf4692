use std::process::Command;

use serde::Deserialize;

use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use crate::table::read_results;

use super::{AnalysisRequest, SensitivityAnalyzer, SensitivityIndices, check_column, check_complete};

/// Runs `{program} {args...} --results <csv> --column <name> --factors a,b,..
/// [--second-order]` and reads a JSON object with `S1`, `ST` and optional
/// `S1_conf` / `ST_conf` arrays from its stdout
#[derive(Debug, Clone)]
pub struct ExternalAnalyzer {
    config: AnalyzerConfig,
}

#[derive(Deserialize)]
struct RawIndices {
    #[serde(rename = "S1")]
    first_order: Vec<f64>,
    #[serde(rename = "ST")]
    total_order: Vec<f64>,
    #[serde(rename = "S1_conf", default)]
    first_order_conf: Option<Vec<f64>>,
    #[serde(rename = "ST_conf", default)]
    total_order_conf: Option<Vec<f64>>,
}

impl ExternalAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    fn command_error(&self, reason: impl ToString) -> AnalysisError {
        AnalysisError::Command {
            program: self.config.program.clone(),
            reason: reason.to_string(),
        }
    }
}

impl SensitivityAnalyzer for ExternalAnalyzer {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<SensitivityIndices, AnalysisError> {
        check_column(request.column)?;
        let rows = read_results(request.results, request.factors)?;
        check_complete(&rows, request.expected_rows)?;

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg("--results")
            .arg(request.results)
            .arg("--column")
            .arg(request.column)
            .arg("--factors")
            .arg(request.factors.join(","));
        if request.second_order {
            command.arg("--second-order");
        }

        tracing::debug!(program = %self.config.program, results = %request.results.display(), "running analyzer");
        let output = command.output().map_err(|e| self.command_error(e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.command_error(format!("{}: {}", output.status, stderr.trim())));
        }

        let raw: RawIndices = serde_json::from_slice(&output.stdout)?;
        let expected = request.factors.len();
        for values in [Some(&raw.first_order), Some(&raw.total_order)]
            .into_iter()
            .chain([raw.first_order_conf.as_ref(), raw.total_order_conf.as_ref()])
            .flatten()
        {
            if values.len() != expected {
                return Err(AnalysisError::IndexCount {
                    found: values.len(),
                    expected,
                });
            }
        }

        Ok(SensitivityIndices {
            column: request.column.to_string(),
            factors: request.factors.to_vec(),
            first_order: raw.first_order,
            total_order: raw.total_order,
            first_order_conf: raw.first_order_conf,
            total_order_conf: raw.total_order_conf,
        })
    }
}
