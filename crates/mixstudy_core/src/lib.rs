//! Vehicle-mix sensitivity studies for traffic emission simulations
//!
//! This crate drives a microscopic traffic simulator across a quasi-random
//! design of vehicle-class proportions and collects the resulting emission
//! totals for sensitivity analysis. It provides:
//! - Saltelli designs over a Sobol sequence, normalized onto the simplex
//! - Exact-total integer allocation (largest remainder)
//! - Randomized trip synthesis over a road network
//! - Route, simulator config and emission file handling
//! - A resumable, crash-safe results table
//! - Sequential or worker-pool sweeps with per-point failure isolation
//! - Screening statistics and an external variance-decomposition adapter
//!
//! # Running a sweep
//!
//! ```ignore
//! use mixstudy_core::{CommandRunner, OpenMode, Study, StudyConfig, SweepProgress};
//!
//! let config = StudyConfig::default();
//! let runner = CommandRunner::new(config.simulator.clone());
//! let report = Study::new(&config, &runner).run_sweep(OpenMode::Create, &SweepProgress::default())?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod allocation;
pub mod analysis;
pub mod design;
pub mod error;
pub mod runner;
pub mod sweep;
pub mod synthesis;
pub mod table;

// ============================================================================
// Type definition and file format modules
// ============================================================================

pub mod config;
pub mod files;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use allocation::allocate;
pub use config::StudyConfig;
pub use design::{DesignMatrix, SaltelliSampler, normalize};
pub use runner::{CommandRunner, SimulationRunner};
pub use sweep::{Study, SweepProgress};
pub use synthesis::TripSynthesizer;
pub use table::{OpenMode, ResultsTable};
