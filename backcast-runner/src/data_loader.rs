//! CSV bar loading, one file per symbol.
//!
//! Files are `<SYMBOL>.csv` with a `date,open,high,low,close,volume` header.
//! Symbols load in parallel; the merged stream keeps each file's row order,
//! and the feed's own validation enforces the per-symbol ordering contract.

use anyhow::{Context, Result};
use backcast_core::domain::Bar;
use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("no data file for symbol {symbol}: expected {path}")]
    MissingFile { symbol: String, path: String },

    #[error("bad date {value} in {path} (expected YYYY-MM-DD or RFC 3339)")]
    BadDate { value: String, path: String },
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

/// Load bars for every symbol from `csv_dir`, in parallel.
pub fn load_bars(csv_dir: &Path, symbols: &[String]) -> Result<Vec<Bar>> {
    let mut per_symbol: Vec<Vec<Bar>> = symbols
        .par_iter()
        .map(|symbol| load_symbol(csv_dir, symbol))
        .collect::<Result<_>>()?;

    let mut bars = Vec::with_capacity(per_symbol.iter().map(Vec::len).sum());
    for symbol_bars in &mut per_symbol {
        bars.append(symbol_bars);
    }
    Ok(bars)
}

fn load_symbol(csv_dir: &Path, symbol: &str) -> Result<Vec<Bar>> {
    let path: PathBuf = csv_dir.join(format!("{symbol}.csv"));
    if !path.exists() {
        return Err(DataLoadError::MissingFile {
            symbol: symbol.to_string(),
            path: path.display().to_string(),
        }
        .into());
    }

    let mut reader = csv::Reader::from_path(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut bars = Vec::new();
    for row in reader.deserialize() {
        let row: CsvRow =
            row.with_context(|| format!("malformed row in {}", path.display()))?;
        let timestamp = parse_date(&row.date).ok_or_else(|| DataLoadError::BadDate {
            value: row.date.clone(),
            path: path.display().to_string(),
        })?;
        bars.push(Bar {
            symbol: symbol.to_string(),
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    debug!(symbol, rows = bars.len(), "loaded bars");
    Ok(bars)
}

/// Accept plain dates (midnight UTC) or full RFC 3339 timestamps.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = value.parse::<NaiveDate>() {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    value.parse::<DateTime<Utc>>().ok()
}
