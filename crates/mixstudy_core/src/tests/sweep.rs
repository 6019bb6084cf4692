//! End-to-end sweeps against an in-process simulator
//!
//! These tests verify:
//! - One row per design point, in design order, with the vehicle total held
//! - Failed simulator runs become failed rows without shifting the table
//! - Resume, overwrite and create semantics of the results table
//! - Fatal problems stop the sweep before any simulator run
//! - Scenario batches and flow rescaling go through the same pipeline

use std::collections::BTreeMap;
use std::fs;

use super::support::{Behavior, FakeSimulator, Fixture, co2_rate};
use crate::config::{DegeneratePolicy, RouteMode, ScenarioConfig};
use crate::error::{ConfigError, StudyError, SynthesisError, TableError};
use crate::model::PointOutcome;
use crate::sweep::{EMISSION_FILE, ROUTE_FILE, Study, SweepProgress};
use crate::synthesis::ClassMode;
use crate::table::{OpenMode, read_results};

/// Four factors without second-order terms: 6 rows per base point
const POINTS: usize = 24;

#[test]
fn test_sweep_records_every_point_in_order() {
    let fixture = Fixture::new(4);
    let simulator = FakeSimulator::default();
    let progress = SweepProgress::default();

    let report = Study::new(&fixture.config, &simulator)
        .run_sweep(OpenMode::Create, &progress)
        .unwrap();

    assert_eq!(report.total_points, POINTS);
    assert_eq!(report.completed, POINTS);
    assert_eq!(report.failed_count(), 0);
    assert_eq!(progress.completed(), POINTS);
    assert_eq!(simulator.call_count(), POINTS);

    let rows = read_results(&fixture.config.results_path(), &fixture.config.factor_names()).unwrap();
    assert_eq!(rows.len(), POINTS);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.index, i);
        assert_eq!(row.label, format!("p{i:05}"));
        assert_eq!(row.counts.iter().sum::<u64>(), 20, "row {i} lost vehicles");
        assert!((row.proportions.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        // One fuel unit per simulated vehicle
        assert_eq!(row.outcome.emissions().unwrap().fuel, 20.0);
    }

    assert!(fixture.config.design_path().is_file());
    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(fixture.config.summary_path()).unwrap()).unwrap();
    assert_eq!(summary["completed"], POINTS);
}

#[test]
fn test_missing_artifact_marks_point_failed_and_sweep_continues() {
    let fixture = Fixture::new(4);
    let simulator = FakeSimulator::failing_on(&["p00003"], Behavior::Crash);

    let report = Study::new(&fixture.config, &simulator)
        .run_sweep(OpenMode::Create, &SweepProgress::default())
        .unwrap();

    assert_eq!(report.completed, POINTS - 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].index, 3);
    assert_eq!(simulator.call_count(), POINTS);

    let rows = read_results(&fixture.config.results_path(), &fixture.config.factor_names()).unwrap();
    assert_eq!(rows.len(), POINTS);
    assert_eq!(rows[3].index, 3);
    match &rows[3].outcome {
        PointOutcome::Failed { reason } => {
            assert!(reason.contains("no emission artifact"), "{reason}")
        }
        other => panic!("point 3 should have failed, got {other:?}"),
    }
    // The failed row still records the mix that drove it
    assert_eq!(rows[3].counts.iter().sum::<u64>(), 20);
    assert!(rows[2].outcome.is_completed());
    assert!(rows[4].outcome.is_completed());
}

#[test]
fn test_truncated_artifact_marks_point_failed() {
    let fixture = Fixture::new(4);
    let simulator = FakeSimulator::failing_on(&["p00005", "p00011"], Behavior::Truncate);

    let report = Study::new(&fixture.config, &simulator)
        .run_sweep(OpenMode::Create, &SweepProgress::default())
        .unwrap();

    let failed: Vec<usize> = report.failed.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![5, 11]);
    assert!(report.failed[0].reason.contains("unparsable"), "{}", report.failed[0].reason);
}

#[test]
fn test_exact_class_mode_matches_allocation() {
    let mut fixture = Fixture::new(4);
    fixture.config.trips.class_mode = ClassMode::Exact;
    let simulator = FakeSimulator::default();

    Study::new(&fixture.config, &simulator)
        .run_sweep(OpenMode::Create, &SweepProgress::default())
        .unwrap();

    let names = fixture.config.factor_names();
    let rows = read_results(&fixture.config.results_path(), &names).unwrap();
    for row in &rows {
        let expected: f64 = row
            .counts
            .iter()
            .zip(&names)
            .map(|(count, name)| *count as f64 * co2_rate(name))
            .sum();
        assert_eq!(row.outcome.emissions().unwrap().co2, expected, "point {}", row.index);
    }
}

#[test]
fn test_resume_runs_only_missing_points() {
    let fixture = Fixture::new(4);
    let first = FakeSimulator::default();
    Study::new(&fixture.config, &first)
        .run_sweep(OpenMode::Create, &SweepProgress::default())
        .unwrap();

    // Simulate a crash after ten points
    let path = fixture.config.results_path();
    let content = fs::read_to_string(&path).unwrap();
    let (cut, _) = content.match_indices('\n').nth(10).unwrap();
    fs::write(&path, &content[..=cut]).unwrap();

    let second = FakeSimulator::default();
    let report = Study::new(&fixture.config, &second)
        .run_sweep(OpenMode::Resume, &SweepProgress::default())
        .unwrap();

    assert_eq!(report.resumed_points, 10);
    assert_eq!(report.completed, POINTS - 10);
    assert_eq!(second.call_count(), POINTS - 10);

    let resumed = read_results(&path, &fixture.config.factor_names()).unwrap();
    assert_eq!(resumed.len(), POINTS);
    assert_eq!(fs::read_to_string(&path).unwrap(), content);
}

#[test]
fn test_create_refuses_existing_results() {
    let fixture = Fixture::new(4);
    let simulator = FakeSimulator::default();
    let study = Study::new(&fixture.config, &simulator);
    study.run_sweep(OpenMode::Create, &SweepProgress::default()).unwrap();

    let err = study
        .run_sweep(OpenMode::Create, &SweepProgress::default())
        .unwrap_err();
    assert!(matches!(err, StudyError::Table(TableError::AlreadyExists(_))));
    assert_eq!(simulator.call_count(), POINTS);

    let report = study
        .run_sweep(OpenMode::Overwrite, &SweepProgress::default())
        .unwrap();
    assert_eq!(report.completed, POINTS);
}

#[cfg(feature = "parallel")]
#[test]
fn test_worker_pool_matches_sequential_results() {
    let sequential = Fixture::new(4);
    let mut parallel = Fixture::new(4);
    parallel.config.execution.workers = 4;

    Study::new(&sequential.config, &FakeSimulator::default())
        .run_sweep(OpenMode::Create, &SweepProgress::default())
        .unwrap();
    Study::new(&parallel.config, &FakeSimulator::default())
        .run_sweep(OpenMode::Create, &SweepProgress::default())
        .unwrap();

    let names = sequential.config.factor_names();
    let a = read_results(&sequential.config.results_path(), &names).unwrap();
    let b = read_results(&parallel.config.results_path(), &names).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_missing_input_fails_before_any_run() {
    let fixture = Fixture::new(4);
    fs::remove_file(fixture.path().join("network.net.xml")).unwrap();
    let simulator = FakeSimulator::default();

    let err = Study::new(&fixture.config, &simulator)
        .run_sweep(OpenMode::Create, &SweepProgress::default())
        .unwrap_err();
    assert!(matches!(err, StudyError::Config(ConfigError::MissingInput(_))));
    assert_eq!(simulator.call_count(), 0);
    assert!(!fixture.config.results_path().exists());
}

#[test]
fn test_single_edge_network_is_fatal() {
    let fixture = Fixture::new(4);
    fs::write(
        fixture.path().join("network.net.xml"),
        r#"<net><edge id=":J0_0" function="internal"/><edge id="E0"/></net>"#,
    )
    .unwrap();
    let simulator = FakeSimulator::default();

    let err = Study::new(&fixture.config, &simulator)
        .run_sweep(OpenMode::Create, &SweepProgress::default())
        .unwrap_err();
    assert!(matches!(
        err,
        StudyError::Synthesis(SynthesisError::InsufficientNetwork { found: 1 })
    ));
    assert_eq!(simulator.call_count(), 0);
}

#[test]
fn test_artifacts_removed_unless_kept() {
    let mut fixture = Fixture::new(4);
    fixture.config.execution.keep_artifacts = false;
    Study::new(&fixture.config, &FakeSimulator::default())
        .run_sweep(OpenMode::Create, &SweepProgress::default())
        .unwrap();

    let run_dir = fixture.config.runs_dir().join("p00000");
    assert!(run_dir.join(ROUTE_FILE).is_file());
    assert!(!run_dir.join(EMISSION_FILE).exists());
}

fn scenario(name: &str, mix: &[(&str, f64)]) -> ScenarioConfig {
    ScenarioConfig {
        name: name.to_string(),
        mix: mix.iter().map(|(k, v)| (k.to_string(), *v)).collect::<BTreeMap<_, _>>(),
    }
}

#[test]
fn test_scenarios_run_through_same_pipeline() {
    let mut fixture = Fixture::new(4);
    fixture.config.scenarios = vec![
        scenario("today", &[("car", 61.3), ("bus", 7.2), ("scooter", 15.8), ("bike", 15.7)]),
        scenario("all buses", &[("bus", 1.0)]),
    ];
    let simulator = FakeSimulator::default();

    let report = Study::new(&fixture.config, &simulator)
        .run_scenarios(&SweepProgress::default())
        .unwrap();
    assert_eq!(report.completed, 2);

    let rows = read_results(&fixture.config.scenarios_path(), &fixture.config.factor_names()).unwrap();
    assert_eq!(rows[0].label, "today");
    assert_eq!(rows[1].counts, vec![0, 20, 0, 0]);
    assert_eq!(rows[1].outcome.emissions().unwrap().co2, 200.0);
    assert!(fixture.config.runs_dir().join("all_buses").is_dir());
}

#[test]
fn test_degenerate_scenario_follows_policy() {
    let mut fixture = Fixture::new(4);
    fixture.config.scenarios = vec![
        scenario("empty", &[("car", 0.0)]),
        scenario("cars", &[("car", 1.0)]),
    ];

    fixture.config.degenerate_policy = DegeneratePolicy::Abort;
    let simulator = FakeSimulator::default();
    let err = Study::new(&fixture.config, &simulator)
        .run_scenarios(&SweepProgress::default())
        .unwrap_err();
    assert!(matches!(err, StudyError::Degenerate { index: 0, .. }));
    assert_eq!(simulator.call_count(), 0);

    fixture.config.degenerate_policy = DegeneratePolicy::Skip;
    let report = Study::new(&fixture.config, &simulator)
        .run_scenarios(&SweepProgress::default())
        .unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].label, "empty");
    assert!(report.failed[0].reason.contains("[0.0, 0.0, 0.0, 0.0]"));
    assert_eq!(simulator.call_count(), 1);
    let rows = read_results(&fixture.config.scenarios_path(), &fixture.config.factor_names()).unwrap();
    assert!(matches!(
        &rows[0].outcome,
        PointOutcome::Failed { reason } if reason.contains("[0.0, 0.0, 0.0, 0.0]")
    ));

    fixture.config.degenerate_policy = DegeneratePolicy::Uniform;
    let report = Study::new(&fixture.config, &simulator)
        .run_scenarios(&SweepProgress::default())
        .unwrap();
    assert_eq!(report.completed, 2);
    let rows = read_results(&fixture.config.scenarios_path(), &fixture.config.factor_names()).unwrap();
    assert_eq!(rows[0].counts, vec![5, 5, 5, 5]);
}

#[test]
fn test_flow_mode_rescales_base_routes() {
    let mut fixture = Fixture::new(4);
    let base = fixture.path().join("base.rou.xml");
    fs::write(
        &base,
        r#"<routes>
    <flow id="c0" type="car" begin="0" end="100" number="60" from="E0" to="E1"/>
    <flow id="b0" type="bus" begin="0" end="100" number="10" from="E1" to="E2"/>
    <flow id="s0" type="scooter" begin="0" end="100" number="15" from="E2" to="E0"/>
    <flow id="k0" type="bike" begin="0" end="100" number="15" from="E0" to="E2"/>
</routes>"#,
    )
    .unwrap();
    fixture.config.trips.route_mode = RouteMode::Flows;
    fixture.config.trips.base_routes = Some(base);
    fixture.config.scenarios = vec![scenario("half cars", &[("car", 50.0), ("bike", 50.0)])];

    Study::new(&fixture.config, &FakeSimulator::default())
        .run_scenarios(&SweepProgress::default())
        .unwrap();

    let rows = read_results(&fixture.config.scenarios_path(), &fixture.config.factor_names()).unwrap();
    assert_eq!(rows[0].counts, vec![50, 0, 0, 50]);
    let routes = fs::read_to_string(fixture.config.runs_dir().join("half_cars").join(ROUTE_FILE)).unwrap();
    assert!(routes.contains(r#"id="c0" type="car" begin="0" end="100" number="50""#), "{routes}");
    assert!(routes.contains(r#"id="b0" type="bus" begin="0" end="100" number="0""#), "{routes}");
}
