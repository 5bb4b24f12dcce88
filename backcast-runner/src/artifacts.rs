//! Run artifact export.
//!
//! Each run writes a directory named by its run id containing the exact
//! config snapshot, a manifest with provenance hashes, the equity curve,
//! and the trade log. Config plus data plus seed reproduce the run;
//! the artifacts prove what it did.

use anyhow::{Context, Result};
use backcast_core::ledger::TradeRecord;
use backcast_core::{BacktestConfig, RunResult};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Artifact paths returned after export.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub config_json: PathBuf,
    pub manifest: PathBuf,
    pub equity_csv: PathBuf,
    pub trades_csv: PathBuf,
    pub trades_json: PathBuf,
}

/// Provenance and headline numbers for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub config_hash: String,
    pub dataset_hash: String,
    pub seed: u64,
    pub code_version: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub bars_processed: u64,
    pub events_processed: u64,
    pub final_cash: String,
    pub final_equity: String,
    pub total_commission: String,
    pub total_slippage: String,
    pub fill_count: usize,
    pub rejection_count: usize,
    pub data_warnings: Vec<String>,
}

/// Writes all artifacts for finished runs under one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("failed to create {}", output_dir.display()))?;
        Ok(Self { output_dir })
    }

    pub fn save_run(
        &self,
        config: &BacktestConfig,
        result: &RunResult,
        seed: u64,
    ) -> Result<ArtifactPaths> {
        let run_dir = self.output_dir.join(result.run_id.to_string());
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("failed to create {}", run_dir.display()))?;

        let config_json = run_dir.join("config.json");
        let json = serde_json::to_string_pretty(config).context("failed to serialize config")?;
        std::fs::write(&config_json, json)
            .with_context(|| format!("failed to write {}", config_json.display()))?;

        let manifest_path = run_dir.join("manifest.json");
        write_manifest(&manifest_path, result, seed)?;

        let equity_csv = run_dir.join("equity.csv");
        write_equity_csv(&equity_csv, result)?;

        let trades_csv = run_dir.join("trades.csv");
        let trades_json = run_dir.join("trades.json");
        write_trades_csv(&trades_csv, result)?;
        write_trades_json(&trades_json, result)?;

        info!(run_id = %result.run_id, dir = %run_dir.display(), "artifacts written");
        Ok(ArtifactPaths {
            run_dir,
            config_json,
            manifest: manifest_path,
            equity_csv,
            trades_csv,
            trades_json,
        })
    }
}

fn write_manifest(path: &Path, result: &RunResult, seed: u64) -> Result<()> {
    let final_equity = result
        .equity_curve
        .last()
        .map_or_else(|| result.final_cash, |p| p.equity);
    let manifest = RunManifest {
        run_id: result.run_id.to_string(),
        config_hash: result.config_hash.clone(),
        dataset_hash: result.dataset_hash.clone(),
        seed,
        code_version: env!("CARGO_PKG_VERSION").to_string(),
        created_at: chrono::Utc::now(),
        bars_processed: result.bars_processed,
        events_processed: result.events_processed,
        final_cash: result.final_cash.to_string(),
        final_equity: final_equity.to_string(),
        total_commission: result.total_commission.to_string(),
        total_slippage: result.total_slippage.to_string(),
        fill_count: result.trade_log.fills().count(),
        rejection_count: result.trade_log.rejections().count(),
        data_warnings: result.data_warnings.clone(),
    };
    let json = serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn write_equity_csv(path: &Path, result: &RunResult) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writeln!(file, "timestamp,cash,market_value,equity")?;
    for point in result.equity_curve.points() {
        writeln!(
            file,
            "{},{},{},{}",
            point.timestamp.to_rfc3339(),
            point.cash,
            point.market_value,
            point.equity
        )?;
    }
    Ok(())
}

/// One row per trade-log record. Fills carry prices and costs; rejections
/// and expiries carry their reason with the money columns left empty.
fn write_trades_csv(path: &Path, result: &RunResult) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record([
        "record",
        "id",
        "symbol",
        "timestamp",
        "side_or_reason",
        "quantity",
        "price",
        "commission",
        "slippage",
        "remaining",
    ])?;
    for record in result.trade_log.records() {
        match record {
            TradeRecord::Fill(fill) => writer.write_record([
                "FILL".to_string(),
                fill.id.to_string(),
                fill.symbol.clone(),
                fill.timestamp.to_rfc3339(),
                format!("{:?}", fill.side).to_uppercase(),
                fill.quantity.to_string(),
                fill.price.to_string(),
                fill.commission.to_string(),
                fill.slippage.to_string(),
                fill.remaining.to_string(),
            ])?,
            TradeRecord::Rejected(decision) => writer.write_record([
                "REJECTED".to_string(),
                decision.signal_id.to_string(),
                decision.symbol.clone(),
                decision.timestamp.to_rfc3339(),
                format!("{:?}", decision.reason),
                decision.requested.to_string(),
                String::new(),
                String::new(),
                String::new(),
                decision.granted.to_string(),
            ])?,
            TradeRecord::Expired { order_id, symbol, timestamp, unfilled } => writer
                .write_record([
                    "EXPIRED".to_string(),
                    order_id.to_string(),
                    symbol.clone(),
                    timestamp.to_rfc3339(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    unfilled.to_string(),
                ])?,
        }
    }
    writer.flush()?;
    Ok(())
}

/// Full trade log, rejections and expiries included.
fn write_trades_json(path: &Path, result: &RunResult) -> Result<()> {
    let records: &[TradeRecord] = result.trade_log.records();
    let json = serde_json::to_string_pretty(records).context("failed to serialize trade log")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
