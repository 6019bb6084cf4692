//! Study files: the YAML description of a study

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use mixstudy_core::StudyConfig;
use serde::de::DeserializeOwned;

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    serde_saphyr::from_str(&content).wrap_err_with(|| format!("Failed to parse {}", path.display()))
}

/// Load a study file, resolving relative paths against its directory
pub fn load_study(path: &Path) -> Result<StudyConfig> {
    let mut config: StudyConfig = read_yaml(path)?;
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    config.resolve_paths(base);
    tracing::debug!(path = %path.display(), factors = config.factors.len(), "loaded study file");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixstudy_core::config::DegeneratePolicy;
    use mixstudy_core::synthesis::ClassMode;

    const STUDY: &str = r#"
total_vehicles: 200
duration: 600
network: net/city.net.xml
output_dir: /tmp/mix-output
factors:
  - name: car
  - name: bus
    vehicle_type: city_bus
    upper: 0.5
sampler:
  base_samples: 64
  second_order: false
trips:
  seed: 5
  class_mode: exact
degenerate_policy: skip
scenarios:
  - name: today
    mix:
      car: 80
      bus: 20
"#;

    #[test]
    fn study_file_loads_with_defaults_and_resolved_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.yaml");
        fs::write(&path, STUDY).unwrap();

        let config = load_study(&path).unwrap();
        assert_eq!(config.total_vehicles, 200);
        assert_eq!(config.duration, 600.0);
        assert_eq!(config.factor_names(), vec!["car", "bus"]);
        assert_eq!(config.vehicle_types(), vec!["car", "city_bus"]);
        assert_eq!(config.factors[1].upper, 0.5);
        assert_eq!(config.sampler.base_samples, 64);
        assert!(!config.sampler.second_order);
        assert_eq!(config.trips.seed, Some(5));
        assert_eq!(config.trips.class_mode, ClassMode::Exact);
        assert_eq!(config.degenerate_policy, DegeneratePolicy::Skip);
        assert_eq!(config.scenarios[0].mix["car"], 80.0);

        assert_eq!(config.network, dir.path().join("net/city.net.xml"));
        assert_eq!(config.config_template, dir.path().join("simulation.sumocfg"));
        assert_eq!(config.output_dir, Path::new("/tmp/mix-output"));
        assert_eq!(config.execution.workers, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_study_file_names_the_path() {
        let err = load_study(Path::new("/nonexistent/study.yaml")).unwrap_err();
        assert!(format!("{err}").contains("/nonexistent/study.yaml"));
    }
}
