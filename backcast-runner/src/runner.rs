//! Orchestration: config file in, artifact directory out.

use crate::artifacts::{ArtifactPaths, ArtifactWriter, RunManifest};
use crate::config::RunnerConfig;
use crate::data_loader;
use anyhow::{Context, Result};
use backcast_core::data::MemoryFeed;
use backcast_core::ledger::{replay_trade_log, TradeLog, TradeRecord};
use backcast_core::{run, BacktestConfig, RunContext, RunResult};
use rust_decimal::Decimal;
use std::path::Path;
use tracing::info;

/// A finished, persisted run.
pub struct RunSummary {
    pub result: RunResult,
    pub artifacts: ArtifactPaths,
}

/// Load data, run the backtest, and persist artifacts.
pub fn execute(config: &RunnerConfig) -> Result<RunSummary> {
    let bars = data_loader::load_bars(&config.data.csv_dir, &config.backtest.symbols)?;
    info!(bars = bars.len(), "data loaded");

    let mut feed = MemoryFeed::new(bars, &config.backtest).context("data validation failed")?;
    let ctx = RunContext::new(&config.backtest, feed.dataset_hash());
    let mut strategy = config.strategy.build();

    let result = run(&config.backtest, &mut feed, &mut strategy, &ctx)
        .context("engine run failed")?;

    let writer = ArtifactWriter::new(&config.output_dir)?;
    let artifacts = writer.save_run(&config.backtest, &result, config.backtest.seed)?;

    Ok(RunSummary { result, artifacts })
}

/// Outcome of replaying a persisted run's trade log.
#[derive(Debug)]
pub struct ReplayReport {
    pub run_id: String,
    pub expected_cash: Decimal,
    pub replayed_cash: Decimal,
}

impl ReplayReport {
    pub fn matches(&self) -> bool {
        self.expected_cash == self.replayed_cash
    }
}

/// Re-derive final cash from a run directory's archived trade log and check
/// it against the manifest.
pub fn verify_run_dir(run_dir: &Path) -> Result<ReplayReport> {
    let manifest_path = run_dir.join("manifest.json");
    let manifest: RunManifest = serde_json::from_str(
        &std::fs::read_to_string(&manifest_path)
            .with_context(|| format!("failed to read {}", manifest_path.display()))?,
    )
    .context("malformed manifest.json")?;

    let config_path = run_dir.join("config.json");
    let config: BacktestConfig = serde_json::from_str(
        &std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?,
    )
    .context("malformed config.json")?;

    let trades_path = run_dir.join("trades.json");
    let records: Vec<TradeRecord> = serde_json::from_str(
        &std::fs::read_to_string(&trades_path)
            .with_context(|| format!("failed to read {}", trades_path.display()))?,
    )
    .context("malformed trades.json")?;

    let snapshot = replay_trade_log(config.initial_cash, &TradeLog::from_records(records));
    let expected_cash: Decimal = manifest
        .final_cash
        .parse()
        .context("manifest final_cash is not a decimal")?;

    Ok(ReplayReport {
        run_id: manifest.run_id,
        expected_cash,
        replayed_cash: snapshot.cash,
    })
}
