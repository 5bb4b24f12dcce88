//! Data handlers — the upstream edge of the event loop.
//!
//! A data handler yields bars in simulation order. The in-memory feed
//! validates the bar-stream contract up front so the loop never sees
//! out-of-order, duplicate, or malformed bars.

use crate::config::{BacktestConfig, MissingBarPolicy};
use crate::domain::Bar;
use crate::error::DataError;
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Source of bars for the simulation loop.
pub trait DataHandler {
    /// Next bar in (timestamp, symbol) order, or `None` when exhausted.
    fn next_bar(&mut self) -> Option<Bar>;

    /// Non-fatal data-quality findings, reported into the run result.
    fn warnings(&self) -> &[String] {
        &[]
    }
}

/// Pre-loaded multi-symbol feed.
///
/// Bars are filtered to the configured universe and date window, validated,
/// and served in deterministic (timestamp, symbol) order.
pub struct MemoryFeed {
    bars: VecDeque<Bar>,
    dataset_hash: String,
    warnings: Vec<String>,
}

impl MemoryFeed {
    /// Build a feed from raw bars.
    ///
    /// Input bars must be timestamp-ordered per symbol (interleaving across
    /// symbols is fine). Under `MissingBarPolicy::Fatal` every symbol must
    /// have a bar on every date in the union calendar.
    pub fn new(bars: Vec<Bar>, config: &BacktestConfig) -> Result<Self, DataError> {
        let mut kept: Vec<Bar> = Vec::with_capacity(bars.len());
        let mut last_seen: HashMap<String, chrono::DateTime<chrono::Utc>> = HashMap::new();

        for bar in bars {
            if !config.symbols.contains(&bar.symbol) {
                continue;
            }
            if let Some(&previous) = last_seen.get(&bar.symbol) {
                if bar.timestamp < previous {
                    return Err(DataError::NonMonotonicTimestamps {
                        symbol: bar.symbol,
                        previous,
                        current: bar.timestamp,
                    });
                }
                if bar.timestamp == previous {
                    return Err(DataError::DuplicateBar {
                        symbol: bar.symbol,
                        timestamp: bar.timestamp,
                    });
                }
            }
            last_seen.insert(bar.symbol.clone(), bar.timestamp);

            if bar.timestamp < config.start_date || bar.timestamp > config.end_date {
                continue;
            }
            if !bar.is_sane() {
                return Err(DataError::InsaneBar {
                    symbol: bar.symbol,
                    timestamp: bar.timestamp,
                });
            }
            kept.push(bar);
        }

        kept.sort_by(|a, b| (a.timestamp, &a.symbol).cmp(&(b.timestamp, &b.symbol)));

        let warnings = match config.missing_bar_policy {
            MissingBarPolicy::Fatal => {
                check_union_calendar(&kept, &config.symbols)?;
                Vec::new()
            }
            MissingBarPolicy::Skip => calendar_gap_warnings(&kept, &config.symbols),
        };

        let dataset_hash = hash_bars(&kept);
        Ok(Self {
            bars: kept.into(),
            dataset_hash,
            warnings,
        })
    }

    /// BLAKE3 hash of the validated bar stream; part of the run ID.
    pub fn dataset_hash(&self) -> &str {
        &self.dataset_hash
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

impl DataHandler for MemoryFeed {
    fn next_bar(&mut self) -> Option<Bar> {
        self.bars.pop_front()
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Every symbol must appear on every date any symbol trades.
fn check_union_calendar(bars: &[Bar], symbols: &[String]) -> Result<(), DataError> {
    let calendar: BTreeSet<_> = bars.iter().map(|b| b.timestamp).collect();
    let mut per_symbol: HashMap<&str, BTreeSet<_>> = HashMap::new();
    for bar in bars {
        per_symbol.entry(&bar.symbol).or_default().insert(bar.timestamp);
    }
    for symbol in symbols {
        let have = per_symbol.get(symbol.as_str());
        for &timestamp in &calendar {
            if !have.is_some_and(|set| set.contains(&timestamp)) {
                return Err(DataError::MissingBar {
                    symbol: symbol.clone(),
                    timestamp,
                });
            }
        }
    }
    Ok(())
}

/// One warning per symbol with gaps against the union calendar.
fn calendar_gap_warnings(bars: &[Bar], symbols: &[String]) -> Vec<String> {
    let calendar: BTreeSet<_> = bars.iter().map(|b| b.timestamp).collect();
    let mut per_symbol: HashMap<&str, usize> = HashMap::new();
    for bar in bars {
        *per_symbol.entry(&bar.symbol).or_default() += 1;
    }
    symbols
        .iter()
        .filter_map(|symbol| {
            let have = per_symbol.get(symbol.as_str()).copied().unwrap_or(0);
            let missing = calendar.len() - have;
            (missing > 0 && !calendar.is_empty()).then(|| {
                format!("{symbol}: {missing} bar(s) missing against the union calendar")
            })
        })
        .collect()
}

fn hash_bars(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.symbol.as_bytes());
        hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
