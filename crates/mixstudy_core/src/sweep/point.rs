//! The per-point pipeline: routes, config, simulator run, emission parse.
//!
//! Every point works inside its own run directory, so concurrent points
//! never share route, config or emission files.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::error::PointError;
use crate::files::{ConfigTemplate, FlowTemplate, parse_emissions, write_route_file};
use crate::model::{AllocationVector, EmissionSummary, PointOutcome, ProportionVector, ResultRow};
use crate::runner::{RunStatus, SimulationRunner};
use crate::synthesis::{ClassAssignment, ClassMode, TripSynthesizer};

use super::plan::{PointPlan, StudyPoint};

pub const ROUTE_FILE: &str = "routes.rou.xml";
pub const CONFIG_FILE: &str = "run.sumocfg";
pub const EMISSION_FILE: &str = "emissions.xml";

/// Where each run's route input comes from
#[derive(Debug, Clone)]
pub enum RouteSource {
    Synthesized {
        synthesizer: TripSynthesizer,
        class_mode: ClassMode,
    },
    Flows {
        template: FlowTemplate,
        vehicle_types: Vec<String>,
    },
}

/// Everything a point needs besides its own plan
pub struct RunContext<'a> {
    pub runner: &'a dyn SimulationRunner,
    pub template: &'a ConfigTemplate,
    pub routes: &'a RouteSource,
    /// Absolute network path written into every run config
    pub network: &'a Path,
    pub runs_dir: &'a Path,
    /// Vehicles per run
    pub total: u64,
    pub keep_artifacts: bool,
}

impl RunContext<'_> {
    /// Run one point to a results row. Failures become failed rows.
    pub fn run(&self, point: &StudyPoint) -> ResultRow {
        let (proportions, allocation, seed) = match &point.plan {
            PointPlan::Run {
                proportions,
                allocation,
                seed,
            } => (proportions, allocation, *seed),
            PointPlan::Skip { reason } => {
                return ResultRow {
                    index: point.index,
                    label: point.label.clone(),
                    proportions: Vec::new(),
                    counts: Vec::new(),
                    outcome: PointOutcome::failed(reason),
                };
            }
        };

        let dir = self.runs_dir.join(point.dir_name());
        let outcome = match self.execute(&dir, proportions, allocation, seed) {
            Ok(summary) => PointOutcome::Completed(summary),
            Err(e) => {
                tracing::warn!(point = point.index, label = %point.label, error = %e, "design point failed");
                PointOutcome::failed(e)
            }
        };

        ResultRow::new(point.index, point.label.clone(), proportions, allocation, outcome)
    }

    fn execute(
        &self,
        dir: &Path,
        proportions: &ProportionVector,
        allocation: &AllocationVector,
        seed: u64,
    ) -> Result<EmissionSummary, PointError> {
        fs::create_dir_all(dir).map_err(|source| PointError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        self.write_routes(&dir.join(ROUTE_FILE), proportions, allocation, seed)?;

        let config_path = dir.join(CONFIG_FILE);
        let rendered = self.template.render(
            &self.network.to_string_lossy(),
            ROUTE_FILE,
            EMISSION_FILE,
        )?;
        fs::write(&config_path, rendered).map_err(|source| PointError::Io {
            path: config_path.clone(),
            source,
        })?;

        let emission_path = dir.join(EMISSION_FILE);
        remove_if_present(&emission_path)?;

        tracing::debug!(dir = %dir.display(), "running simulator");
        match self.runner.run(&config_path, dir)? {
            RunStatus::TimedOut => return Err(PointError::TimedOut),
            status if !status.success() => {
                tracing::warn!(dir = %dir.display(), ?status, "simulator exited unsuccessfully");
            }
            _ => {}
        }

        let summary = parse_emissions(&emission_path)?;
        if !self.keep_artifacts
            && let Err(e) = remove_if_present(&emission_path)
        {
            tracing::warn!(error = %e, "could not remove emission artifact");
        }
        Ok(summary)
    }

    fn write_routes(
        &self,
        path: &Path,
        proportions: &ProportionVector,
        allocation: &AllocationVector,
        seed: u64,
    ) -> Result<(), PointError> {
        match self.routes {
            RouteSource::Synthesized {
                synthesizer,
                class_mode,
            } => {
                let mut rng = SmallRng::seed_from_u64(seed);
                let assignment = match class_mode {
                    ClassMode::Weighted => ClassAssignment::Weighted(proportions.as_slice()),
                    ClassMode::Exact => ClassAssignment::Exact(allocation),
                };
                let trips = synthesizer.synthesize(assignment, self.total, &mut rng)?;
                write_route_file(path, &trips)?;
            }
            RouteSource::Flows {
                template,
                vehicle_types,
            } => {
                let rescaled = template.rescale(vehicle_types, proportions)?;
                fs::write(path, rescaled.content).map_err(|source| PointError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}

/// Delete a file left behind by an earlier run
fn remove_if_present(path: &Path) -> Result<(), PointError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PointError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
