//! Invocation of the external traffic simulator.
//!
//! The simulator is a black box behind [`SimulationRunner`]: it is handed a
//! configuration file and a working directory, and blocks until the run is
//! over. Its exit status is reported but not enforced; a failed run shows up
//! downstream as a missing or unparsable emission artifact.

use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::RunnerError;

/// How a simulator invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Process exited; `None` when terminated by a signal
    Exited(Option<i32>),
    /// Killed after exceeding the configured timeout
    TimedOut,
}

impl RunStatus {
    pub fn success(&self) -> bool {
        matches!(self, RunStatus::Exited(Some(0)))
    }
}

/// Synchronous simulator capability. Implementations must be usable from
/// several worker threads at once, each with its own working directory.
pub trait SimulationRunner: Send + Sync {
    fn run(&self, config_file: &Path, working_dir: &Path) -> Result<RunStatus, RunnerError>;
}

/// Simulator command line settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub program: String,
    /// Extra arguments appended after `-c <config>`
    pub args: Vec<String>,
    /// Kill the simulator after this many seconds
    pub timeout_secs: Option<u64>,
    /// Forward the simulator's stdout/stderr instead of discarding it
    pub show_output: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            program: "sumo".to_string(),
            args: vec!["--no-step-log".to_string()],
            timeout_secs: Some(3600),
            show_output: false,
        }
    }
}

/// Runs `{program} -c {config} {args...}` as a child process
#[derive(Debug, Clone)]
pub struct CommandRunner {
    config: SimulatorConfig,
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);

impl CommandRunner {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    fn command(&self, config_file: &Path, working_dir: &Path) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .arg("-c")
            .arg(config_file)
            .args(&self.config.args)
            .current_dir(working_dir)
            .stdin(Stdio::null());
        if !self.config.show_output {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }
        command
    }
}

impl SimulationRunner for CommandRunner {
    fn run(&self, config_file: &Path, working_dir: &Path) -> Result<RunStatus, RunnerError> {
        let program = &self.config.program;
        let mut child = self
            .command(config_file, working_dir)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: program.clone(),
                source,
            })?;

        let wait_error = |source| RunnerError::Wait {
            program: program.clone(),
            source,
        };

        let Some(timeout) = self.config.timeout_secs.map(Duration::from_secs) else {
            let status = child.wait().map_err(wait_error)?;
            return Ok(RunStatus::Exited(status.code()));
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(wait_error)? {
                return Ok(RunStatus::Exited(status.code()));
            }
            if started.elapsed() >= timeout {
                tracing::warn!(
                    program = %program,
                    dir = %working_dir.display(),
                    timeout_secs = timeout.as_secs(),
                    "simulator timed out; killing it"
                );
                // The child may have exited between the poll and the kill
                let _ = child.kill();
                child.wait().map_err(wait_error)?;
                return Ok(RunStatus::TimedOut);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn runner(program: &str, args: &[&str], timeout_secs: Option<u64>) -> CommandRunner {
        CommandRunner::new(SimulatorConfig {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            timeout_secs,
            show_output: false,
        })
    }

    #[test]
    fn exit_code_is_reported() {
        // `sh -c <config> ...` runs the "config path" as a script
        let dir = tempfile::tempdir().unwrap();
        let status = runner("sh", &[], Some(10))
            .run(Path::new("exit 3"), dir.path())
            .unwrap();
        assert_eq!(status, RunStatus::Exited(Some(3)));
        assert!(!status.success());
    }

    #[test]
    fn runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let status = runner("sh", &[], None)
            .run(Path::new("touch marker"), dir.path())
            .unwrap();
        assert!(status.success());
        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn slow_run_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let status = runner("sh", &[], Some(0))
            .run(Path::new("sleep 5"), dir.path())
            .unwrap();
        assert_eq!(status, RunStatus::TimedOut);
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = runner("definitely-not-a-simulator", &[], None)
            .run(Path::new("run.sumocfg"), dir.path())
            .unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
    }
}
