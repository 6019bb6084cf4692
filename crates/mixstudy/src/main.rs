use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mixstudy::commands::{self, open_mode, parse_share};
use mixstudy::{init_logging, load_study};

#[derive(Parser, Debug)]
#[command(name = "mixstudy")]
#[command(about = "Vehicle-mix sensitivity studies for traffic emission simulations")]
struct Args {
    /// Study file
    #[arg(short, long, global = true, default_value = "study.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every design point through the simulator
    Sweep {
        /// Continue an interrupted sweep after its last recorded point
        #[arg(long, conflicts_with = "overwrite")]
        resume: bool,
        /// Replace an existing results table
        #[arg(long)]
        overwrite: bool,
    },
    /// Generate the design matrix without running anything
    Design,
    /// Synthesize one route file for a given mix
    Trips {
        /// Class share as CLASS=SHARE, repeatable
        #[arg(short, long = "share", value_parser = parse_share, required = true)]
        shares: Vec<(String, f64)>,
        /// Route file to write
        #[arg(short, long)]
        output: PathBuf,
        /// Trip seed (defaults to the study's trip seed)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Summarize an existing route file
    Routes {
        file: PathBuf,
    },
    /// Run the named scenarios of the study file
    Scenarios,
    /// Screen and decompose an output column of the results table
    Analyze {
        #[arg(long, default_value = "co2")]
        column: String,
    },
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    if let Command::Routes { file } = &args.command {
        init_logging(None, &args.log_level)?;
        return commands::routes(file);
    }

    let config = load_study(&args.config)?;
    init_logging(Some(&config.output_dir), &args.log_level)?;
    tracing::info!(study = %args.config.display(), "mixstudy starting");

    match args.command {
        Command::Sweep { resume, overwrite } => commands::sweep(&config, open_mode(resume, overwrite)),
        Command::Design => commands::design(&config),
        Command::Trips {
            shares,
            output,
            seed,
        } => commands::trips(&config, &shares, &output, seed),
        Command::Routes { file } => commands::routes(&file),
        Command::Scenarios => commands::scenarios(&config),
        Command::Analyze { column } => commands::analyze(&config, &column),
    }
}
