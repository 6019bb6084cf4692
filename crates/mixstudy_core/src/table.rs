//! Incrementally persisted results table.
//!
//! One CSV row per design point, in design order:
//!
//! ```text
//! point,label,car,bus,...,car_count,bus_count,...,co2,co,hc,nox,pmx,fuel,status,error
//! ```
//!
//! Failed points keep their row with `status=failed`, empty emission columns
//! and the failure reason. Rows that complete out of order are held back
//! until their predecessors are written, so the file on disk is always a
//! prefix of the final table. Every write is flushed and synced.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TableError;
use crate::model::{EmissionSummary, PointOutcome, ResultRow};

const STATUS_COMPLETED: &str = "completed";
const STATUS_FAILED: &str = "failed";

/// What to do with an existing results file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// Refuse to touch an existing file
    #[default]
    Create,
    /// Truncate an existing file
    Overwrite,
    /// Keep existing rows and continue after the last one
    Resume,
}

/// Column names for a table over `factor_names`
pub fn header(factor_names: &[String]) -> Vec<String> {
    let mut columns = vec!["point".to_string(), "label".to_string()];
    columns.extend(factor_names.iter().cloned());
    columns.extend(factor_names.iter().map(|name| format!("{name}_count")));
    columns.extend(EmissionSummary::COLUMNS.iter().map(|c| c.to_string()));
    columns.push("status".to_string());
    columns.push("error".to_string());
    columns
}

/// Append-only writer for one results file
pub struct ResultsTable {
    path: PathBuf,
    factor_count: usize,
    writer: csv::Writer<File>,
    next_index: usize,
    resumed: usize,
    pending: BTreeMap<usize, ResultRow>,
}

impl ResultsTable {
    pub fn open(path: &Path, factor_names: &[String], mode: OpenMode) -> Result<Self, TableError> {
        let exists = path.exists();
        let resumed = match mode {
            OpenMode::Create if exists => return Err(TableError::AlreadyExists(path.to_path_buf())),
            OpenMode::Resume if exists => read_results(path, factor_names)?.len(),
            _ => 0,
        };

        let writer = if mode == OpenMode::Resume && exists {
            let file = OpenOptions::new().append(true).open(path)?;
            csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file)
        } else {
            let mut writer = csv::Writer::from_path(path)?;
            writer.write_record(header(factor_names))?;
            writer.flush()?;
            writer
        };

        if resumed > 0 {
            tracing::info!(path = %path.display(), rows = resumed, "resuming results table");
        }

        Ok(Self {
            path: path.to_path_buf(),
            factor_count: factor_names.len(),
            writer,
            next_index: resumed,
            resumed,
            pending: BTreeMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows found on disk when the table was opened
    pub fn resumed(&self) -> usize {
        self.resumed
    }

    /// Index of the next row to be written
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Rows waiting for an earlier point to complete
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Record one design point. Written immediately when it is the next
    /// row, otherwise held until the gap before it is filled.
    pub fn append(&mut self, row: ResultRow) -> Result<(), TableError> {
        if row.index < self.next_index || self.pending.contains_key(&row.index) {
            return Err(TableError::UnexpectedPoint { index: row.index });
        }
        self.pending.insert(row.index, row);

        let mut written = 0;
        while let Some(row) = self.pending.remove(&self.next_index) {
            let record = self.record(&row);
            self.writer.write_record(record)?;
            self.next_index += 1;
            written += 1;
        }
        if written > 0 {
            self.writer.flush()?;
            self.writer.get_ref().sync_data()?;
        }
        Ok(())
    }

    /// Close the table, returning the number of rows on disk. Rows still
    /// held back (their predecessors never arrived) are dropped.
    pub fn finish(mut self) -> Result<usize, TableError> {
        self.writer.flush()?;
        if !self.pending.is_empty() {
            tracing::warn!(
                path = %self.path.display(),
                held = self.pending.len(),
                next = self.next_index,
                "results table closed with rows waiting on a missing point"
            );
        }
        Ok(self.next_index)
    }

    fn record(&self, row: &ResultRow) -> Vec<String> {
        let k = self.factor_count;
        let mut fields = Vec::with_capacity(4 + 2 * k + EmissionSummary::COLUMNS.len());
        fields.push(row.index.to_string());
        fields.push(row.label.clone());
        fields.extend(padded(&row.proportions, k));
        fields.extend(padded(&row.counts, k));
        match &row.outcome {
            PointOutcome::Completed(summary) => {
                fields.extend(summary.values().iter().map(f64::to_string));
                fields.push(STATUS_COMPLETED.to_string());
                fields.push(String::new());
            }
            PointOutcome::Failed { reason } => {
                fields.extend(EmissionSummary::COLUMNS.iter().map(|_| String::new()));
                fields.push(STATUS_FAILED.to_string());
                fields.push(reason.clone());
            }
        }
        fields
    }
}

/// Values as strings, or `k` empty fields when the row has none
fn padded<T: ToString>(values: &[T], k: usize) -> Vec<String> {
    if values.len() == k {
        values.iter().map(T::to_string).collect()
    } else {
        vec![String::new(); k]
    }
}

/// Load every row of a results file, checking the header and that points
/// are numbered contiguously from zero
pub fn read_results(path: &Path, factor_names: &[String]) -> Result<Vec<ResultRow>, TableError> {
    let expected = header(factor_names);
    let mut reader = csv::Reader::from_path(path)?;
    let found: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if found != expected {
        return Err(TableError::HeaderMismatch {
            path: path.to_path_buf(),
            found,
            expected,
        });
    }

    let k = factor_names.len();
    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let fields: Vec<&str> = record.iter().collect();
        let parsed = parse_row(&fields, k, row).map_err(|reason| TableError::InvalidRow {
            path: path.to_path_buf(),
            row,
            reason,
        })?;
        rows.push(parsed);
    }
    Ok(rows)
}

fn parse_row(fields: &[&str], k: usize, expected_index: usize) -> Result<ResultRow, String> {
    let emission_start = 2 + 2 * k;
    let status_at = emission_start + EmissionSummary::COLUMNS.len();

    let index = fields[0]
        .parse::<usize>()
        .map_err(|_| format!("point '{}' is not an index", fields[0]))?;
    if index != expected_index {
        return Err(format!("expected point {expected_index}, found {index}"));
    }

    let proportions = optional_numbers::<f64>(&fields[2..2 + k])?;
    let counts = optional_numbers::<u64>(&fields[2 + k..emission_start])?;

    let outcome = match fields[status_at] {
        STATUS_COMPLETED => {
            let mut values = [0.0; 6];
            for (slot, field) in values.iter_mut().zip(&fields[emission_start..status_at]) {
                *slot = field
                    .parse::<f64>()
                    .map_err(|_| format!("emission value '{field}' is not numeric"))?;
            }
            PointOutcome::Completed(EmissionSummary::from_values(values))
        }
        STATUS_FAILED => PointOutcome::failed(fields[status_at + 1]),
        other => return Err(format!("unknown status '{other}'")),
    };

    Ok(ResultRow {
        index,
        label: fields[1].to_string(),
        proportions,
        counts,
        outcome,
    })
}

/// All-empty fields parse to an empty vector
fn optional_numbers<T: std::str::FromStr>(fields: &[&str]) -> Result<Vec<T>, String> {
    if fields.iter().all(|f| f.is_empty()) {
        return Ok(Vec::new());
    }
    fields
        .iter()
        .map(|f| f.parse::<T>().map_err(|_| format!("'{f}' is not a number")))
        .collect()
}
