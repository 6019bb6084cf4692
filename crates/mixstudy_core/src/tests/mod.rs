//! Integration tests for the study pipeline
//!
//! Tests are organized by topic:
//! - `allocation` - Exact-total apportionment properties
//! - `design` - Saltelli layout, scaling and persistence
//! - `synthesis` - Trip counts, ordering and class frequencies
//! - `files` - Route, config and emission files working together
//! - `sweep` - End-to-end sweeps against an in-process simulator

mod support;
mod sweep;
mod synthesis;
