//! Study configuration.
//!
//! One [`StudyConfig`] describes a full study: the factors, the simulator
//! inputs, the design and how each design point is turned into a run.
//! Optional sections fall back to their defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::design::SamplerConfig;
use crate::error::ConfigError;
use crate::model::{Factor, default_factors, factor_names, vehicle_types};
use crate::runner::SimulatorConfig;
use crate::synthesis::ClassMode;

/// What to do with a design row that cannot be normalized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Run the point with equal shares
    #[default]
    Uniform,
    /// Record the point as failed without running it
    Skip,
    /// Refuse to start the sweep
    Abort,
}

/// How the route input of each run is produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMode {
    /// Random trips between network edges
    #[default]
    Synthesized,
    /// Rescale the flows of `trips.base_routes`
    Flows,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripConfig {
    /// Base seed for per-point trip generation. Drawn from entropy (and
    /// logged) when absent.
    pub seed: Option<u64>,
    pub class_mode: ClassMode,
    pub route_mode: RouteMode,
    /// Route file whose flows are rescaled in [`RouteMode::Flows`]
    pub base_routes: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Design points run concurrently, each in its own directory
    pub workers: usize,
    /// Keep emission files after they are parsed
    pub keep_artifacts: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            keep_artifacts: true,
        }
    }
}

/// External sensitivity analysis command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// A named, explicitly chosen vehicle mix. Values may be fractions or
/// percentages; they are normalized before use. Factors not listed get 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub mix: BTreeMap<String, f64>,
}

impl ScenarioConfig {
    /// Mix values in factor order
    pub fn raw_row(&self, factors: &[Factor]) -> Result<Vec<f64>, ConfigError> {
        if let Some(unknown) = self
            .mix
            .keys()
            .find(|name| !factors.iter().any(|f| &f.name == *name))
        {
            return Err(ConfigError::UnknownFactor {
                scenario: self.name.clone(),
                factor: unknown.clone(),
            });
        }
        Ok(factors
            .iter()
            .map(|f| self.mix.get(&f.name).copied().unwrap_or(0.0))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub factors: Vec<Factor>,
    /// Vehicles per run, held fixed across the sweep
    pub total_vehicles: u64,
    /// Departure window in seconds
    pub duration: f64,
    /// Road network file
    pub network: PathBuf,
    /// Simulator configuration rendered for every run
    pub config_template: PathBuf,
    pub output_dir: PathBuf,
    /// Results file name inside `output_dir`
    pub results_file: String,
    pub sampler: SamplerConfig,
    pub trips: TripConfig,
    pub simulator: SimulatorConfig,
    pub execution: ExecutionConfig,
    pub degenerate_policy: DegeneratePolicy,
    pub analyzer: Option<AnalyzerConfig>,
    pub scenarios: Vec<ScenarioConfig>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            factors: default_factors(),
            total_vehicles: 1000,
            duration: 3600.0,
            network: PathBuf::from("network.net.xml"),
            config_template: PathBuf::from("simulation.sumocfg"),
            output_dir: PathBuf::from("output"),
            results_file: "results.csv".to_string(),
            sampler: SamplerConfig::default(),
            trips: TripConfig::default(),
            simulator: SimulatorConfig::default(),
            execution: ExecutionConfig::default(),
            degenerate_policy: DegeneratePolicy::default(),
            analyzer: None,
            scenarios: Vec::new(),
        }
    }
}

impl StudyConfig {
    pub fn factor_names(&self) -> Vec<String> {
        factor_names(&self.factors)
    }

    pub fn vehicle_types(&self) -> Vec<String> {
        vehicle_types(&self.factors)
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join(&self.results_file)
    }

    pub fn design_path(&self) -> PathBuf {
        self.output_dir.join("design.csv")
    }

    pub fn scenarios_path(&self) -> PathBuf {
        self.output_dir.join("scenarios.csv")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join("sweep_summary.json")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.output_dir.join("runs")
    }

    /// Make relative paths relative to `base` (normally the directory of
    /// the config file)
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.network);
        resolve(&mut self.config_template);
        resolve(&mut self.output_dir);
        if let Some(routes) = self.trips.base_routes.as_mut() {
            resolve(routes);
        }
    }

    /// Check values that do not depend on the filesystem
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: String| Err(ConfigError::Invalid { field, reason });

        if self.factors.is_empty() {
            return invalid("factors", "at least one factor is required".into());
        }
        let mut seen = BTreeSet::new();
        for factor in &self.factors {
            if factor.name.trim().is_empty() {
                return invalid("factors", "factor names must not be empty".into());
            }
            if !seen.insert(factor.name.as_str()) {
                return invalid("factors", format!("duplicate factor '{}'", factor.name));
            }
            if !(factor.lower.is_finite() && factor.upper.is_finite())
                || factor.lower < 0.0
                || factor.upper <= factor.lower
            {
                return invalid(
                    "factors",
                    format!(
                        "factor '{}' needs 0 <= lower < upper, got [{}, {}]",
                        factor.name, factor.lower, factor.upper
                    ),
                );
            }
        }
        if self.total_vehicles == 0 {
            return invalid("total_vehicles", "must be positive".into());
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return invalid("duration", format!("must be positive, got {}", self.duration));
        }
        if self.sampler.base_samples == 0 {
            return invalid("sampler.base_samples", "must be positive".into());
        }
        if self.execution.workers == 0 {
            return invalid("execution.workers", "must be at least 1".into());
        }
        if self.simulator.program.trim().is_empty() {
            return invalid("simulator.program", "must not be empty".into());
        }
        if self.results_file.trim().is_empty() {
            return invalid("results_file", "must not be empty".into());
        }
        if self.trips.route_mode == RouteMode::Flows && self.trips.base_routes.is_none() {
            return invalid("trips.base_routes", "required when route_mode is flows".into());
        }
        let mut scenario_names = BTreeSet::new();
        for scenario in &self.scenarios {
            if !scenario_names.insert(scenario.name.as_str()) {
                return invalid("scenarios", format!("duplicate scenario '{}'", scenario.name));
            }
            scenario.raw_row(&self.factors)?;
        }
        Ok(())
    }

    /// Fail before any simulator run when a required input file is missing
    pub fn check_inputs(&self) -> Result<(), ConfigError> {
        let mut required = vec![&self.config_template, &self.network];
        if self.trips.route_mode == RouteMode::Flows {
            required.extend(self.trips.base_routes.as_ref());
        }
        match required.into_iter().find(|path| !path.is_file()) {
            Some(missing) => Err(ConfigError::MissingInput(missing.clone())),
            None => Ok(()),
        }
    }
}
