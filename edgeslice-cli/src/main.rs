//! edgeslice scenario runner
//!
//! Loads a scenario, runs it under a wall-clock watchdog, prints a summary
//! and optionally writes the full report as JSON.
//!
//! # Usage
//!
//! ```bash
//! edgeslice -c config/baseline.yaml -o report.json --snapshots
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use edgeslice_common::{init_logging, load_simulation_config, LogLevel};
use edgeslice_orchestrator::{RunStatus, Simulation};

/// edgeslice - task offloading and service slicing simulator
#[derive(Parser, Debug)]
#[command(name = "edgeslice")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scenario file (YAML, or JSON with a .json extension)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config_file: PathBuf,

    /// Write the JSON report to this file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the wall-clock budget, in seconds
    #[arg(long = "timeout-secs", value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long = "log-level", default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Include every per-tick snapshot in the JSON report
    #[arg(long)]
    snapshots: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level);

    match run(args).await {
        Ok(RunStatus::TimedOut) => {
            warn!("run stopped by the wall-clock budget; results are partial");
            ExitCode::SUCCESS
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("edgeslice failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<RunStatus> {
    info!("Loading scenario from: {}", args.config_file.display());
    let mut config = load_simulation_config(&args.config_file)
        .with_context(|| format!("Failed to load {}", args.config_file.display()))?;

    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(secs) = args.timeout_secs {
        config.simulation.wall_clock_budget_s = secs;
    }
    let budget = Duration::from_secs(config.simulation.wall_clock_budget_s);

    let sim = Simulation::from_config(config)
        .context("Invalid scenario")?
        .with_snapshot_history(args.snapshots);

    let sim = sim
        .run_with_watchdog(budget)
        .await
        .context("Simulation run failed")?;

    let report = sim.report(args.snapshots);
    println!("{report}");

    if let Some(path) = &args.output {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(report.status)
}
