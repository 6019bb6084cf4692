//! Domain types shared across the study pipeline

mod emissions;
mod factors;
mod mix;
mod results;
mod trips;

pub use emissions::EmissionSummary;
pub use factors::{Factor, default_factors, factor_names, vehicle_types};
pub use mix::{AllocationVector, ProportionVector};
pub use results::{FailedPoint, PointOutcome, ResultRow, SweepReport};
pub use trips::{Trip, TripSet};
