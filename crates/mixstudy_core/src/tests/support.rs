//! Shared fixtures: a small study on disk and an in-process simulator

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::TempDir;

use crate::config::StudyConfig;
use crate::design::SamplerConfig;
use crate::error::RunnerError;
use crate::files::read_route_file;
use crate::runner::{RunStatus, SimulationRunner};
use crate::sweep::{CONFIG_FILE, EMISSION_FILE, ROUTE_FILE};

pub const NETWORK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<net version="1.16">
    <location netOffset="0.00,0.00"/>
    <edge id=":J1_0" function="internal">
        <lane id=":J1_0_0" index="0" speed="13.89" length="5.00"/>
    </edge>
    <edge id="E0" from="J0" to="J1" priority="-1">
        <lane id="E0_0" index="0" speed="13.89" length="100.00"/>
    </edge>
    <edge id="E1" from="J1" to="J2" priority="-1">
        <lane id="E1_0" index="0" speed="13.89" length="100.00"/>
    </edge>
    <edge id="E2" from="J2" to="J0" priority="-1">
        <lane id="E2_0" index="0" speed="13.89" length="100.00"/>
    </edge>
    <junction id="J1" type="priority" x="100.00" y="0.00"/>
</net>"#;

pub const TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<configuration>
    <input>
        <net-file value="network.net.xml"/>
        <route-files value="routes.rou.xml"/>
    </input>
    <time>
        <begin value="0"/>
        <end value="500"/>
    </time>
</configuration>"#;

/// Per-vehicle CO2 written by [`FakeSimulator`], by vehicle type
pub fn co2_rate(vehicle_type: &str) -> f64 {
    match vehicle_type {
        "car" => 2.0,
        "bus" => 10.0,
        "scooter" => 0.5,
        _ => 0.0,
    }
}

/// A study directory with network and config template, configured for a
/// handful of design points
pub struct Fixture {
    pub dir: TempDir,
    pub config: StudyConfig,
}

impl Fixture {
    pub fn new(base_samples: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("network.net.xml"), NETWORK).unwrap();
        fs::write(dir.path().join("simulation.sumocfg"), TEMPLATE).unwrap();

        let mut config = StudyConfig {
            total_vehicles: 20,
            duration: 100.0,
            sampler: SamplerConfig {
                base_samples,
                second_order: false,
                ..Default::default()
            },
            ..Default::default()
        };
        config.trips.seed = Some(7);
        config.resolve_paths(dir.path());

        Self { dir, config }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// What the fake simulator does for a given run directory
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Emit,
    /// Exit without writing an emission file
    Crash,
    /// Write a file cut off mid-document
    Truncate,
}

/// Simulator stand-in: reads the run's trips and writes one emission
/// record per trip, or misbehaves for selected run directories
#[derive(Default)]
pub struct FakeSimulator {
    failing: BTreeSet<String>,
    behavior: Option<Behavior>,
    pub calls: Mutex<Vec<PathBuf>>,
}

impl FakeSimulator {
    pub fn failing_on(dirs: &[&str], behavior: Behavior) -> Self {
        Self {
            failing: dirs.iter().map(|d| d.to_string()).collect(),
            behavior: Some(behavior),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn behavior_for(&self, working_dir: &Path) -> Behavior {
        let name = working_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.behavior {
            Some(behavior) if self.failing.contains(&name) => behavior,
            _ => Behavior::Emit,
        }
    }
}

impl SimulationRunner for FakeSimulator {
    fn run(&self, config_file: &Path, working_dir: &Path) -> Result<RunStatus, RunnerError> {
        self.calls.lock().unwrap().push(working_dir.to_path_buf());
        assert_eq!(config_file, working_dir.join(CONFIG_FILE));
        assert!(config_file.is_file(), "config not written before run");

        let output = working_dir.join(EMISSION_FILE);
        match self.behavior_for(working_dir) {
            Behavior::Crash => Ok(RunStatus::Exited(Some(1))),
            Behavior::Truncate => {
                fs::write(&output, r#"<emission-export><timestep time="0.00"><vehicle CO2="1"/>"#).unwrap();
                Ok(RunStatus::Exited(Some(0)))
            }
            Behavior::Emit => {
                let trips = read_route_file(&working_dir.join(ROUTE_FILE)).unwrap();
                let mut xml = String::from("<emission-export>\n<timestep time=\"0.00\">\n");
                for trip in &trips {
                    writeln!(
                        xml,
                        r#"<vehicle id="{}" type="{}" CO2="{}" fuel="1"/>"#,
                        trip.id,
                        trip.vehicle_type,
                        co2_rate(&trip.vehicle_type)
                    )
                    .unwrap();
                }
                xml.push_str("</timestep>\n</emission-export>\n");
                fs::write(&output, xml).unwrap();
                Ok(RunStatus::Exited(Some(0)))
            }
        }
    }
}
