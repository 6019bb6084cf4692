//! Design of experiments over vehicle-mix proportions.
//!
//! [`SaltelliSampler`] draws a quasi-random design matrix suitable for
//! variance-based sensitivity analysis, and [`normalize`] maps each raw row
//! onto the unit simplex.
//!
//! ```ignore
//! use mixstudy_core::design::{SaltelliSampler, SamplerConfig, normalize};
//!
//! let design = SaltelliSampler::new(SamplerConfig::default()).generate(&factors)?;
//! let mix = normalize(design.row(0).unwrap())?;
//! ```

mod normalize;
mod saltelli;
mod sobol;

pub use normalize::normalize;
pub use saltelli::{SaltelliSampler, SamplerConfig, generate};
pub use sobol::{MAX_DIMENSIONS, SobolSequence};

use std::path::Path;

use crate::error::{DesignError, TableError};

/// Raw sample rows, one value per factor. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    width: usize,
    rows: Vec<Vec<f64>>,
}

impl DesignMatrix {
    pub fn new(width: usize, rows: Vec<Vec<f64>>) -> Result<Self, DesignError> {
        if let Some((row, values)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(DesignError::RowWidth {
                row,
                found: values.len(),
                expected: width,
            });
        }
        Ok(Self { width, rows })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Persist as CSV with one column per factor name
    pub fn write_csv(&self, path: &Path, names: &[String]) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(names)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load a design written by [`DesignMatrix::write_csv`], checking the
    /// header against the expected factor names
    pub fn read_csv(path: &Path, names: &[String]) -> Result<Self, TableError> {
        let mut reader = csv::Reader::from_path(path)?;
        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if header != names {
            return Err(TableError::HeaderMismatch {
                path: path.to_path_buf(),
                found: header,
                expected: names.to_vec(),
            });
        }

        let mut rows = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let values = record
                .iter()
                .map(|field| field.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| TableError::InvalidRow {
                    path: path.to_path_buf(),
                    row,
                    reason: e.to_string(),
                })?;
            rows.push(values);
        }

        DesignMatrix::new(names.len(), rows).map_err(|e| TableError::InvalidRow {
            path: path.to_path_buf(),
            row: 0,
            reason: e.to_string(),
        })
    }
}
