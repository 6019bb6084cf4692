//! Turning raw rows into runnable study points.

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::allocation::allocate;
use crate::config::DegeneratePolicy;
use crate::design::normalize;
use crate::error::{Result, StudyError};
use crate::model::{AllocationVector, ProportionVector};

/// What a study point will do when its turn comes
#[derive(Debug, Clone, PartialEq)]
pub enum PointPlan {
    Run {
        proportions: ProportionVector,
        allocation: AllocationVector,
        /// Seed for this point's trip generation
        seed: u64,
    },
    /// Recorded as failed without invoking the simulator
    Skip { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudyPoint {
    pub index: usize,
    pub label: String,
    pub plan: PointPlan,
}

impl StudyPoint {
    /// Directory name for this point's run files
    pub fn dir_name(&self) -> String {
        self.label
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

/// Label of a design point
pub fn design_label(index: usize) -> String {
    format!("p{index:05}")
}

/// Normalize and allocate every row. Per-point seeds are drawn in row
/// order from `base_seed`, so they do not depend on how points are later
/// scheduled across workers.
pub fn plan_points<'a>(
    rows: impl IntoIterator<Item = (String, &'a [f64])>,
    policy: DegeneratePolicy,
    total: u64,
    base_seed: u64,
) -> Result<Vec<StudyPoint>> {
    let mut seeds = SmallRng::seed_from_u64(base_seed);
    let mut points = Vec::new();

    for (index, (label, raw)) in rows.into_iter().enumerate() {
        let seed = seeds.next_u64();
        let proportions = match normalize(raw) {
            Ok(proportions) => proportions,
            Err(source) => match policy {
                DegeneratePolicy::Uniform => {
                    tracing::warn!(point = index, %label, error = %source, "degenerate sample; using equal shares");
                    ProportionVector::uniform(raw.len())
                }
                DegeneratePolicy::Skip => {
                    tracing::warn!(point = index, %label, error = %source, "degenerate sample; point will be skipped");
                    points.push(StudyPoint {
                        index,
                        label,
                        plan: PointPlan::Skip {
                            reason: format!("degenerate sample {raw:?}: {source}"),
                        },
                    });
                    continue;
                }
                DegeneratePolicy::Abort => {
                    return Err(StudyError::Degenerate { index, source });
                }
            },
        };

        let allocation = allocate(&proportions, total);
        points.push(StudyPoint {
            index,
            label,
            plan: PointPlan::Run {
                proportions,
                allocation,
                seed,
            },
        });
    }

    Ok(points)
}
