//! Command-line front end for vehicle-mix sensitivity studies
//!
//! The heavy lifting lives in `mixstudy_core`; this crate adds:
//! - Study file loading (YAML)
//! - Logging to stderr and a rotating log file in the output directory
//! - Subcommand handlers that print short reports

pub mod commands;
pub mod logging;
pub mod study_file;

pub use logging::init_logging;
pub use study_file::load_study;
