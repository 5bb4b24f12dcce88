//! Backcast CLI — run backtests and verify persisted runs.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file, writing artifacts
//! - `replay` — re-derive final cash from a run directory's trade log and
//!   check it against the manifest

use anyhow::{bail, Result};
use backcast_runner::{execute, verify_run_dir, RunnerConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "backcast", about = "Backcast — deterministic event-driven backtesting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Replay a persisted run's trade log and verify it against its manifest.
    Replay {
        /// Run artifact directory (the one named by the run id).
        #[arg(long)]
        run_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config } => {
            let config = RunnerConfig::load(&config)?;
            let summary = execute(&config)?;
            info!(
                run_id = %summary.result.run_id,
                final_cash = %summary.result.final_cash,
                fills = summary.result.trade_log.fills().count(),
                "run finished"
            );
            println!("run {}", summary.result.run_id);
            println!("  bars:       {}", summary.result.bars_processed);
            println!("  events:     {}", summary.result.events_processed);
            println!("  final cash: {}", summary.result.final_cash);
            println!("  artifacts:  {}", summary.artifacts.run_dir.display());
        }
        Commands::Replay { run_dir } => {
            let report = verify_run_dir(&run_dir)?;
            if !report.matches() {
                bail!(
                    "replay mismatch for run {}: manifest says {}, replay says {}",
                    report.run_id,
                    report.expected_cash,
                    report.replayed_cash
                );
            }
            println!(
                "run {} verified: replayed cash {} matches manifest",
                report.run_id, report.replayed_cash
            );
        }
    }
    Ok(())
}
