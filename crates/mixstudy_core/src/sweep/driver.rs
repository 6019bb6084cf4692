//! Sweep orchestration: design, planning, execution and reporting.

use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::RngCore;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{RouteMode, StudyConfig};
use crate::design::{DesignMatrix, SaltelliSampler};
use crate::error::{ConfigError, Result, StudyError, TableError};
use crate::files::{ConfigTemplate, FlowTemplate, load_edges};
use crate::model::{FailedPoint, PointOutcome, SweepReport};
use crate::runner::SimulationRunner;
use crate::synthesis::TripSynthesizer;
use crate::table::{OpenMode, ResultsTable};

use super::SweepProgress;
use super::plan::{StudyPoint, design_label, plan_points};
use super::point::{RouteSource, RunContext};

/// One study bound to a simulator
pub struct Study<'a> {
    config: &'a StudyConfig,
    runner: &'a dyn SimulationRunner,
}

impl<'a> Study<'a> {
    pub fn new(config: &'a StudyConfig, runner: &'a dyn SimulationRunner) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &StudyConfig {
        self.config
    }

    /// Validate the configuration and create the output directory. Nothing
    /// is run when this fails.
    pub fn prepare(&self) -> Result<()> {
        self.config.validate()?;
        self.config.check_inputs()?;
        create_dir(&self.config.output_dir)?;
        Ok(())
    }

    /// The design matrix for this study. On resume an existing
    /// `design.csv` is reused so rows keep their meaning; otherwise the
    /// design is generated and persisted.
    pub fn design(&self, mode: OpenMode) -> Result<DesignMatrix> {
        let config = self.config;
        let path = config.design_path();
        let names = config.factor_names();
        let sampler = SaltelliSampler::new(config.sampler.clone());

        if mode == OpenMode::Resume && path.is_file() {
            let design = DesignMatrix::read_csv(&path, &names)?;
            let expected = sampler.row_count(names.len());
            if design.len() != expected {
                return Err(ConfigError::Invalid {
                    field: "sampler",
                    reason: format!(
                        "{} has {} rows but the sampler settings give {expected}; start over with overwrite",
                        path.display(),
                        design.len()
                    ),
                }
                .into());
            }
            tracing::info!(path = %path.display(), rows = design.len(), "reusing persisted design");
            return Ok(design);
        }

        let design = sampler.generate(&config.factors)?;
        create_dir(&config.output_dir)?;
        design.write_csv(&path, &names)?;
        tracing::info!(path = %path.display(), rows = design.len(), "wrote design matrix");
        Ok(design)
    }

    /// Run every design point, appending to the results table as points
    /// finish. Failed points are recorded and the sweep carries on.
    pub fn run_sweep(&self, mode: OpenMode, progress: &SweepProgress) -> Result<SweepReport> {
        let started_at = jiff::Timestamp::now();
        self.prepare()?;
        let results_path = self.config.results_path();
        if mode == OpenMode::Create && results_path.exists() {
            return Err(TableError::AlreadyExists(results_path).into());
        }

        let (routes, total) = self.route_source()?;
        let design = self.design(mode)?;
        let points = plan_points(
            design
                .rows()
                .enumerate()
                .map(|(i, row)| (design_label(i), row)),
            self.config.degenerate_policy,
            total,
            self.trip_seed(),
        )?;

        let report = self.execute(&points, &routes, total, &results_path, mode, progress, started_at)?;

        let summary = serde_json::to_string_pretty(&report)?;
        let summary_path = self.config.summary_path();
        fs::write(&summary_path, summary).map_err(|source| StudyError::Io {
            path: summary_path,
            source,
        })?;
        Ok(report)
    }

    /// Run the named scenarios of the configuration into their own table
    pub fn run_scenarios(&self, progress: &SweepProgress) -> Result<SweepReport> {
        let started_at = jiff::Timestamp::now();
        self.prepare()?;
        if self.config.scenarios.is_empty() {
            return Err(ConfigError::Invalid {
                field: "scenarios",
                reason: "no scenarios configured".into(),
            }
            .into());
        }

        let (routes, total) = self.route_source()?;
        let rows = self
            .config
            .scenarios
            .iter()
            .map(|s| s.raw_row(&self.config.factors).map(|row| (s.name.clone(), row)))
            .collect::<std::result::Result<Vec<_>, ConfigError>>()?;
        let points = plan_points(
            rows.iter().map(|(name, row)| (name.clone(), row.as_slice())),
            self.config.degenerate_policy,
            total,
            self.trip_seed(),
        )?;

        self.execute(
            &points,
            &routes,
            total,
            &self.config.scenarios_path(),
            OpenMode::Overwrite,
            progress,
            started_at,
        )
    }

    /// Route source and the vehicle total every run carries
    fn route_source(&self) -> Result<(RouteSource, u64)> {
        let config = self.config;
        match config.trips.route_mode {
            RouteMode::Synthesized => {
                let edges = load_edges(&config.network)?;
                let synthesizer =
                    TripSynthesizer::new(config.vehicle_types(), edges, config.duration)?;
                tracing::debug!(edges = synthesizer.edges().len(), "loaded network edges");
                Ok((
                    RouteSource::Synthesized {
                        synthesizer,
                        class_mode: config.trips.class_mode,
                    },
                    config.total_vehicles,
                ))
            }
            RouteMode::Flows => {
                let path = config.trips.base_routes.as_ref().ok_or(ConfigError::Invalid {
                    field: "trips.base_routes",
                    reason: "required when route_mode is flows".into(),
                })?;
                let template = FlowTemplate::load(path)?;
                let vehicle_types = config.vehicle_types();
                let total = template.total(&vehicle_types)?;
                if total == 0 {
                    return Err(ConfigError::Invalid {
                        field: "trips.base_routes",
                        reason: format!("{} has no flows of the study's vehicle types", path.display()),
                    }
                    .into());
                }
                if total != config.total_vehicles {
                    tracing::info!(
                        flows = total,
                        configured = config.total_vehicles,
                        "using the base route file's flow total as the vehicle total"
                    );
                }
                Ok((
                    RouteSource::Flows {
                        template,
                        vehicle_types,
                    },
                    total,
                ))
            }
        }
    }

    fn trip_seed(&self) -> u64 {
        match self.config.trips.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::rng().next_u64();
                tracing::info!(seed, "trip seed drawn from entropy; set trips.seed to this value to reproduce the routes");
                seed
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        points: &[StudyPoint],
        routes: &RouteSource,
        total: u64,
        results_path: &Path,
        mode: OpenMode,
        progress: &SweepProgress,
        started_at: jiff::Timestamp,
    ) -> Result<SweepReport> {
        let config = self.config;
        let template = ConfigTemplate::load(&config.config_template)?;
        let network = std::path::absolute(&config.network).map_err(|source| StudyError::Io {
            path: config.network.clone(),
            source,
        })?;
        let runs_dir = config.runs_dir();
        create_dir(&runs_dir)?;

        let table = ResultsTable::open(results_path, &config.factor_names(), mode)?;
        let resumed = table.resumed();
        if resumed > points.len() {
            return Err(TableError::UnexpectedPoint { index: resumed - 1 }.into());
        }
        let remaining = &points[resumed..];
        progress.reset(remaining.len());
        tracing::info!(
            points = points.len(),
            resumed,
            remaining = remaining.len(),
            workers = config.execution.workers,
            results = %results_path.display(),
            "starting sweep"
        );

        let context = RunContext {
            runner: self.runner,
            template: &template,
            routes,
            network: &network,
            runs_dir: &runs_dir,
            total,
            keep_artifacts: config.execution.keep_artifacts,
        };
        let table = Mutex::new(table);
        let outcomes = run_points(&context, remaining, &table, config.execution.workers, progress)?;

        let table = table.into_inner().map_err(TableError::from)?;
        table.finish()?;

        let mut failed: Vec<FailedPoint> = outcomes.iter().flatten().cloned().collect();
        failed.sort_by_key(|f| f.index);
        let completed = outcomes.iter().filter(|o| o.is_none()).count();
        let report = SweepReport {
            total_points: points.len(),
            resumed_points: resumed,
            completed,
            failed,
            results_path: results_path.to_path_buf(),
            started_at,
            finished_at: jiff::Timestamp::now(),
        };

        if report.failed_count() > 0 {
            tracing::warn!(
                completed = report.completed,
                failed = report.failed_count(),
                "sweep finished with failed points"
            );
        } else {
            tracing::info!(completed = report.completed, "sweep finished");
        }
        Ok(report)
    }
}

/// Run points in design order, one entry per processed point: `None` when
/// it completed, the failure otherwise. Workers take the next unstarted
/// point from a shared counter, which keeps the reorder buffer short.
fn run_points(
    context: &RunContext<'_>,
    points: &[StudyPoint],
    table: &Mutex<ResultsTable>,
    workers: usize,
    progress: &SweepProgress,
) -> Result<Vec<Option<FailedPoint>>> {
    let next = AtomicUsize::new(0);

    let record = |point: &StudyPoint| -> Result<Option<FailedPoint>> {
        let row = context.run(point);
        let failure = match &row.outcome {
            PointOutcome::Completed(_) => None,
            PointOutcome::Failed { reason } => Some(FailedPoint {
                index: point.index,
                label: point.label.clone(),
                reason: reason.clone(),
            }),
        };
        table.lock().map_err(TableError::from)?.append(row)?;

        let done = progress.increment();
        tracing::info!(
            point = point.index,
            label = %point.label,
            failed = failure.is_some(),
            "{done}/{} points done",
            progress.total()
        );
        Ok(failure)
    };

    let work = || -> Result<Vec<Option<FailedPoint>>> {
        let mut outcomes = Vec::new();
        while !progress.is_cancelled() {
            let Some(point) = points.get(next.fetch_add(1, Ordering::Relaxed)) else {
                break;
            };
            match record(point) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    // A broken results table stops every worker
                    progress.cancel();
                    return Err(e);
                }
            }
        }
        Ok(outcomes)
    };

    if workers > 1 {
        return run_parallel(&work, workers);
    }
    work()
}

#[cfg(feature = "parallel")]
fn run_parallel<F>(work: &F, workers: usize) -> Result<Vec<Option<FailedPoint>>>
where
    F: Fn() -> Result<Vec<Option<FailedPoint>>> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| StudyError::WorkerPool(e.to_string()))?;
    let per_worker = pool.install(|| {
        (0..workers)
            .into_par_iter()
            .map(|_| work())
            .collect::<Result<Vec<_>>>()
    })?;
    Ok(per_worker.into_iter().flatten().collect())
}

#[cfg(not(feature = "parallel"))]
fn run_parallel<F>(work: &F, workers: usize) -> Result<Vec<Option<FailedPoint>>>
where
    F: Fn() -> Result<Vec<Option<FailedPoint>>>,
{
    tracing::warn!(workers, "built without the parallel feature; running points one at a time");
    work()
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| StudyError::Io {
        path: path.to_path_buf(),
        source,
    })
}
