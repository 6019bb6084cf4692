//! Running a study: one simulator run per design point.
//!
//! Each point goes through the same pipeline:
//!
//! 1. normalize the raw row and allocate the fixed vehicle total
//! 2. synthesize trips (or rescale base flows) into the point's run directory
//! 3. render the simulator config and run the simulator
//! 4. parse the emission artifact and append a row to the results table
//!
//! Failures in steps 2-4 mark the point as failed and the sweep moves on.
//! Only problems that would affect every point (missing inputs, a network
//! without usable edges, an unwritable results table, degenerate rows
//! under [`DegeneratePolicy::Abort`]) stop the sweep.
//!
//! ```ignore
//! use mixstudy_core::runner::CommandRunner;
//! use mixstudy_core::sweep::{Study, SweepProgress};
//! use mixstudy_core::table::OpenMode;
//!
//! let runner = CommandRunner::new(config.simulator.clone());
//! let report = Study::new(&config, &runner).run_sweep(OpenMode::Create, &SweepProgress::default())?;
//! println!("{} completed, {} failed", report.completed, report.failed_count());
//! ```
//!
//! [`DegeneratePolicy::Abort`]: crate::config::DegeneratePolicy::Abort

mod driver;
mod plan;
mod point;
mod progress;

pub use driver::Study;
pub use plan::{PointPlan, StudyPoint, design_label, plan_points};
pub use point::{CONFIG_FILE, EMISSION_FILE, ROUTE_FILE, RouteSource, RunContext};
pub use progress::SweepProgress;
