//! Subcommand handlers. Each prints a short report to stdout; progress and
//! diagnostics go through `tracing`.

use std::path::Path;

use color_eyre::eyre::{Result, eyre};
use mixstudy_core::analysis::{AnalysisRequest, ExternalAnalyzer, SensitivityAnalyzer, screen};
use mixstudy_core::config::ScenarioConfig;
use mixstudy_core::files::{load_edges, read_route_file, write_route_file};
use mixstudy_core::model::{SweepReport, TripSet};
use mixstudy_core::synthesis::{ClassAssignment, ClassMode};
use mixstudy_core::table::read_results;
use mixstudy_core::{
    CommandRunner, OpenMode, SaltelliSampler, Study, StudyConfig, SweepProgress, TripSynthesizer,
    allocate, normalize,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Parse a `class=share` pair given on the command line
pub fn parse_share(s: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CLASS=SHARE, got '{s}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("share for '{name}' is not a number: '{value}'"))?;
    Ok((name.trim().to_string(), value))
}

pub fn open_mode(resume: bool, overwrite: bool) -> OpenMode {
    match (resume, overwrite) {
        (true, _) => OpenMode::Resume,
        (false, true) => OpenMode::Overwrite,
        (false, false) => OpenMode::Create,
    }
}

/// Run the full design
pub fn sweep(config: &StudyConfig, mode: OpenMode) -> Result<()> {
    let runner = CommandRunner::new(config.simulator.clone());
    let report = Study::new(config, &runner).run_sweep(mode, &SweepProgress::default())?;
    print_report(&report);
    Ok(())
}

/// Run the configured scenarios
pub fn scenarios(config: &StudyConfig) -> Result<()> {
    let runner = CommandRunner::new(config.simulator.clone());
    let report = Study::new(config, &runner).run_scenarios(&SweepProgress::default())?;
    print_report(&report);
    Ok(())
}

/// Generate and persist the design matrix without running anything
pub fn design(config: &StudyConfig) -> Result<()> {
    config.validate()?;
    if config.results_path().exists() {
        return Err(eyre!(
            "{} exists; regenerating the design would invalidate it",
            config.results_path().display()
        ));
    }
    let runner = CommandRunner::new(config.simulator.clone());
    let design = Study::new(config, &runner).design(OpenMode::Create)?;

    let names = config.factor_names();
    println!(
        "{} design points over {} factors written to {}",
        design.len(),
        names.len(),
        config.design_path().display()
    );
    let degenerate = design.rows().filter(|row| normalize(row).is_err()).count();
    if degenerate > 0 {
        println!(
            "{degenerate} rows cannot be normalized (policy: {:?})",
            config.degenerate_policy
        );
    }
    Ok(())
}

/// Synthesize one route file for a mix given on the command line
pub fn trips(
    config: &StudyConfig,
    shares: &[(String, f64)],
    output: &Path,
    seed: Option<u64>,
) -> Result<()> {
    config.validate()?;
    let scenario = ScenarioConfig {
        name: "command line".to_string(),
        mix: shares.iter().cloned().collect(),
    };
    let proportions = normalize(&scenario.raw_row(&config.factors)?)?;
    let allocation = allocate(&proportions, config.total_vehicles);

    let synthesizer = TripSynthesizer::new(
        config.vehicle_types(),
        load_edges(&config.network)?,
        config.duration,
    )?;
    let seed = seed.or(config.trips.seed).unwrap_or_else(rand::random);
    tracing::info!(seed, "synthesizing trips");

    let assignment = match config.trips.class_mode {
        ClassMode::Weighted => ClassAssignment::Weighted(proportions.as_slice()),
        ClassMode::Exact => ClassAssignment::Exact(&allocation),
    };
    let trips = synthesizer.synthesize(
        assignment,
        config.total_vehicles,
        &mut SmallRng::seed_from_u64(seed),
    )?;
    write_route_file(output, &trips)?;

    println!("{} trips written to {} (seed {seed})", trips.len(), output.display());
    print_class_counts(&trips, &config.vehicle_types());
    Ok(())
}

/// Summarize an existing route file
pub fn routes(path: &Path) -> Result<()> {
    let trips = read_route_file(path)?;
    println!("{}: {} trips", path.display(), trips.len());

    let mut types: Vec<String> = trips
        .class_counts()
        .keys()
        .map(|t| t.to_string())
        .collect();
    types.sort();
    print_class_counts(&trips, &types);
    if let Some((first, last)) = trips.departure_span() {
        println!("departures {first:.2}s to {last:.2}s");
    }
    Ok(())
}

/// Screening statistics, plus variance decomposition when an analyzer is
/// configured
pub fn analyze(config: &StudyConfig, column: &str) -> Result<()> {
    let names = config.factor_names();
    let results = config.results_path();
    let rows = read_results(&results, &names)?;

    let screening = screen(&rows, &names, column)?;
    let completed = rows.iter().filter(|r| r.outcome.is_completed()).count();
    println!("Screening of {column} over {completed} of {} rows", rows.len());
    println!("{:<12} {:>9} {:>14} {:>14}", "factor", "spearman", "slope", "intercept");
    for s in &screening {
        println!(
            "{:<12} {:>9} {:>14} {:>14}",
            s.factor,
            format_value(s.spearman, 3),
            format_value(s.slope, 2),
            format_value(s.intercept, 2)
        );
    }

    let Some(analyzer) = &config.analyzer else {
        tracing::info!("no analyzer configured; skipping variance decomposition");
        return Ok(());
    };
    let request = AnalysisRequest {
        results: &results,
        factors: &names,
        column,
        second_order: config.sampler.second_order,
        expected_rows: SaltelliSampler::new(config.sampler.clone()).row_count(names.len()),
    };
    let indices = ExternalAnalyzer::new(analyzer.clone()).analyze(&request)?;

    println!();
    println!("Sobol indices of {column}");
    println!("{:<12} {:>9} {:>9}", "factor", "S1", "ST");
    for (i, factor) in indices.factors.iter().enumerate() {
        println!(
            "{:<12} {:>9.3} {:>9.3}",
            factor, indices.first_order[i], indices.total_order[i]
        );
    }
    Ok(())
}

fn format_value(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

fn print_class_counts(trips: &TripSet, types: &[String]) {
    let counts = trips.class_counts();
    for vehicle_type in types {
        let count = counts.get(vehicle_type.as_str()).copied().unwrap_or(0);
        println!("  {vehicle_type:<12} {count:>8}");
    }
}

fn print_report(report: &SweepReport) {
    println!(
        "{} of {} points completed in {}",
        report.completed,
        report.total_points - report.resumed_points,
        format_elapsed(report.elapsed())
    );
    if report.resumed_points > 0 {
        println!("{} points were already recorded", report.resumed_points);
    }
    if report.failed_count() > 0 {
        println!("{} points failed:", report.failed_count());
        for failed in &report.failed {
            println!("  {} (#{}): {}", failed.label, failed.index, failed.reason);
        }
    }
    println!("results: {}", report.results_path.display());
}

fn format_elapsed(elapsed: jiff::SignedDuration) -> String {
    let secs = elapsed.as_secs();
    match secs {
        s if s >= 3600 => format!("{}h {:02}m", s / 3600, (s % 3600) / 60),
        s if s >= 60 => format!("{}m {:02}s", s / 60, s % 60),
        _ => format!("{:.1}s", elapsed.as_secs_f64()),
    }
}
