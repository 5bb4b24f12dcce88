//! Runner configuration — the on-disk TOML that describes a whole run.

use anyhow::{Context, Result};
use backcast_core::strategy::{MaCrossover, NullStrategy, Strategy};
use backcast_core::BacktestConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete run description: engine config plus data, strategy, and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Directory to write run artifacts into (one subdirectory per run id).
    pub output_dir: PathBuf,
    pub data: DataConfig,
    pub strategy: StrategyConfig,
    pub backtest: BacktestConfig,
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding one `<SYMBOL>.csv` per configured symbol.
    pub csv_dir: PathBuf,
}

/// Which signal generator to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyConfig {
    /// No signals; useful for data and pipeline smoke runs.
    Null,
    /// Dual moving-average crossover.
    MaCrossover { fast: usize, slow: usize },
}

impl StrategyConfig {
    pub fn build(&self) -> Box<dyn Strategy> {
        match *self {
            StrategyConfig::Null => Box::new(NullStrategy),
            StrategyConfig::MaCrossover { fast, slow } => Box::new(MaCrossover::new(fast, slow)),
        }
    }
}

impl RunnerConfig {
    /// Load and validate a TOML config file.
    ///
    /// Dates are RFC 3339 strings (e.g. `"2024-01-02T00:00:00Z"`).
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: RunnerConfig = toml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config
            .backtest
            .validate()
            .with_context(|| format!("invalid backtest config in {}", path.display()))?;
        if let StrategyConfig::MaCrossover { fast, slow } = config.strategy {
            anyhow::ensure!(
                fast > 0 && fast < slow,
                "MA_CROSSOVER requires 0 < fast < slow (got fast={fast}, slow={slow})"
            );
        }
        Ok(config)
    }
}
