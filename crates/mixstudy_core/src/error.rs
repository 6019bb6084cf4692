use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a design matrix
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DesignError {
    #[error("base sample size must be positive")]
    InvalidBaseSamples,

    #[error("design needs at least one factor")]
    NoFactors,

    #[error("{factors} factors need {dimensions} sequence dimensions, only {supported} are available")]
    TooManyFactors {
        factors: usize,
        dimensions: usize,
        supported: usize,
    },

    #[error("design row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// A raw sample row that cannot be mapped onto the simplex
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DegenerateSampleError {
    #[error("sample row sums to zero")]
    ZeroSum,

    #[error("sample entry {index} is {value}, expected a finite non-negative value")]
    InvalidEntry { index: usize, value: f64 },

    #[error("empty sample row")]
    Empty,
}

/// Errors raised while synthesizing trips
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisError {
    #[error("network has {found} usable edges, at least 2 are required")]
    InsufficientNetwork { found: usize },

    #[error("trip duration must be finite and non-negative, got {0}")]
    InvalidDuration(f64),

    #[error("{classes} vehicle classes but {weights} weights")]
    ClassMismatch { classes: usize, weights: usize },

    #[error("invalid class weights: {0}")]
    InvalidWeights(String),

    #[error("allocation sums to {allocated}, expected {expected} trips")]
    AllocationTotal { allocated: u64, expected: u64 },
}

/// Errors reading or writing one of the simulator's XML files
#[derive(Debug, Error)]
pub enum XmlFileError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML in {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("route file {path} has no flows of vehicle type '{vehicle_type}'")]
    NoFlowsForType { path: PathBuf, vehicle_type: String },
}

/// Simulator output that cannot be turned into an emission summary
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("simulator produced no emission artifact at {0}")]
    Missing(PathBuf),

    #[error("emission artifact {path} is unparsable: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("failed to read emission artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while invoking the external simulator
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed while waiting for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single design point produced no emission summary. Never fatal
/// for the sweep; recorded as a failed row.
#[derive(Debug, Error)]
pub enum PointError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Xml(#[from] XmlFileError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("simulator timed out")]
    TimedOut,

    #[error("failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the persisted results table
#[derive(Debug, Error)]
pub enum TableError {
    #[error("results file {0} already exists; resume or overwrite it explicitly")]
    AlreadyExists(PathBuf),

    #[error("results file {path} has header {found:?}, expected {expected:?}")]
    HeaderMismatch {
        path: PathBuf,
        found: Vec<String>,
        expected: Vec<String>,
    },

    #[error("results file {path} row {row}: {reason}")]
    InvalidRow {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("design point {index} recorded twice or out of range")]
    UnexpectedPoint { index: usize },

    #[error("results table lock poisoned")]
    Poisoned,

    #[error("results table I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("results table CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl<T> From<std::sync::PoisonError<T>> for TableError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        TableError::Poisoned
    }
}

/// Errors raised while handing results to a sensitivity analyzer
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("results table has {failed} failed design points; variance decomposition needs all of them")]
    IncompleteTable { failed: usize },

    #[error("results table has {found} rows, design has {expected}")]
    RowCount { found: usize, expected: usize },

    #[error("unknown output column '{0}'")]
    UnknownColumn(String),

    #[error("analyzer returned {found} indices, expected {expected}")]
    IndexCount { found: usize, expected: usize },

    #[error("not enough completed rows for screening ({0})")]
    TooFewRows(usize),

    #[error("analyzer '{program}' failed: {reason}")]
    Command { program: String, reason: String },

    #[error("analyzer output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Configuration problems detected before a sweep starts
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing required input file: {0}")]
    MissingInput(PathBuf),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("scenario '{scenario}' references unknown factor '{factor}'")]
    UnknownFactor { scenario: String, factor: String },
}

/// Top-level error for study operations
#[derive(Debug, Error)]
pub enum StudyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Design(#[from] DesignError),

    #[error("design point {index}: {source}")]
    Degenerate {
        index: usize,
        #[source]
        source: DegenerateSampleError,
    },

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Xml(#[from] XmlFileError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error("failed to serialize sweep summary: {0}")]
    Summary(#[from] serde_json::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StudyError>;
