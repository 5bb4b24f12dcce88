//! Backtest configuration — typed models, validated at startup.
//!
//! Every knob the engine honors lives here as a tagged serde enum or a plain
//! field, so a TOML file (or JSON snapshot) round-trips losslessly and the
//! config hash is stable.

use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price used for fills.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FillPriceRule {
    /// Next bar's open — the look-ahead-safe default.
    NextOpen,
    /// Current bar's close.
    Close,
    /// Synthetic quote around the current close with a configured spread;
    /// buys pay the ask, sells receive the bid.
    Mid { spread_bps: f64 },
}

impl Default for FillPriceRule {
    fn default() -> Self {
        FillPriceRule::NextOpen
    }
}

/// Slippage configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlippageConfig {
    /// No slippage (ideal case).
    None,
    /// Fixed slippage in basis points (1 bp = 0.01%).
    FixedBps { bps: f64 },
    /// Scales with order size relative to bar volume:
    /// `bps = impact_bps × (order_qty / bar_volume)`.
    VolumeImpact { impact_bps: f64 },
    /// Uniformly sampled in [0, max_bps], seeded from the run context.
    Random { max_bps: f64 },
}

/// Commission configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionConfig {
    /// No commission.
    None,
    /// Fixed per-trade commission.
    PerTrade { amount: Decimal },
    /// Per-share commission.
    PerShare { amount: Decimal },
    /// Percentage of trade notional.
    PercentNotional { percent: Decimal },
    /// Tiered by notional: the first tier whose `up_to` bound is >= the
    /// notional applies. Tiers must be sorted ascending; the last tier's
    /// bound is treated as unbounded.
    Tiered { tiers: Vec<CommissionTier> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionTier {
    pub up_to: Decimal,
    pub amount: Decimal,
}

/// Order-quantity derivation from signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizingPolicy {
    /// Fixed number of shares per signal.
    FixedQuantity { quantity: i64 },
    /// Fraction of current equity per position.
    FractionalEquity { fraction: f64 },
    /// Risk a fraction of equity against an assumed stop distance:
    /// `qty = (equity × risk_pct) / (price × stop_distance_pct)`.
    RiskBased { risk_pct: f64, stop_distance_pct: f64 },
}

/// What to do with a signal that violates a risk control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskMode {
    /// Clip to the maximum permissible quantity.
    Clip,
    /// Reject the signal outright.
    Reject,
}

/// What to do with the unfilled remainder of a participation-capped order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemainderPolicy {
    /// Retry against the next eligible bar until filled or expired.
    Requeue,
    /// Cancel the remainder after the partial fill.
    Cancel,
}

/// Policy for symbols missing a bar on a calendar date other symbols have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingBarPolicy {
    /// Emit nothing for the gap.
    Skip,
    /// Abort the run before the loop starts.
    Fatal,
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub symbols: Vec<String>,
    pub initial_cash: Decimal,
    #[serde(default)]
    pub fill_price_rule: FillPriceRule,
    pub slippage: SlippageConfig,
    pub commission: CommissionConfig,
    /// Max fraction of a bar's volume an order may consume, in (0, 1].
    pub participation_cap: f64,
    pub sizing: SizingPolicy,
    pub risk_mode: RiskMode,
    pub shorting_enabled: bool,
    /// Risk cap per symbol as a fraction of equity, in (0, 1].
    pub max_position_pct: f64,
    /// Gross exposure cap as a multiple of equity (1.0 = unlevered).
    pub max_gross_exposure_pct: f64,
    /// Market events for a symbol that must pass before an order is
    /// eligible to fill (transmission-delay stub).
    #[serde(default)]
    pub latency_bars: u32,
    pub remainder_policy: RemainderPolicy,
    pub missing_bar_policy: MissingBarPolicy,
    pub seed: u64,
}

impl BacktestConfig {
    /// Validate everything that must hold before the first event.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_cash <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveInitialCash(
                self.initial_cash.to_string(),
            ));
        }
        if !(self.participation_cap > 0.0 && self.participation_cap <= 1.0) {
            return Err(ConfigError::ParticipationCapOutOfRange(
                self.participation_cap,
            ));
        }
        if !(self.max_position_pct > 0.0 && self.max_position_pct <= 1.0) {
            return Err(ConfigError::MaxPositionPctOutOfRange(self.max_position_pct));
        }
        if self.max_gross_exposure_pct <= 0.0 {
            return Err(ConfigError::NonPositiveGrossExposure(
                self.max_gross_exposure_pct,
            ));
        }
        if self.start_date > self.end_date {
            return Err(ConfigError::InvertedDateWindow {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.symbols.is_empty() {
            return Err(ConfigError::EmptyUniverse);
        }
        match self.sizing {
            SizingPolicy::FixedQuantity { quantity } if quantity <= 0 => {
                return Err(ConfigError::InvalidSizingParameter(format!(
                    "quantity = {quantity}"
                )));
            }
            SizingPolicy::FractionalEquity { fraction } if fraction <= 0.0 || fraction > 1.0 => {
                return Err(ConfigError::InvalidSizingParameter(format!(
                    "fraction = {fraction}"
                )));
            }
            SizingPolicy::RiskBased {
                risk_pct,
                stop_distance_pct,
            } if risk_pct <= 0.0 || stop_distance_pct <= 0.0 => {
                return Err(ConfigError::InvalidSizingParameter(format!(
                    "risk_pct = {risk_pct}, stop_distance_pct = {stop_distance_pct}"
                )));
            }
            _ => {}
        }
        match self.slippage {
            SlippageConfig::FixedBps { bps } if bps < 0.0 => {
                return Err(ConfigError::InvalidSlippageParameter(format!("bps = {bps}")));
            }
            SlippageConfig::VolumeImpact { impact_bps } if impact_bps < 0.0 => {
                return Err(ConfigError::InvalidSlippageParameter(format!(
                    "impact_bps = {impact_bps}"
                )));
            }
            SlippageConfig::Random { max_bps } if max_bps < 0.0 => {
                return Err(ConfigError::InvalidSlippageParameter(format!(
                    "max_bps = {max_bps}"
                )));
            }
            _ => {}
        }
        match &self.commission {
            CommissionConfig::PerTrade { amount }
            | CommissionConfig::PerShare { amount } => {
                if *amount < Decimal::ZERO {
                    return Err(ConfigError::InvalidCommissionParameter(format!(
                        "amount = {amount}"
                    )));
                }
            }
            CommissionConfig::PercentNotional { percent } => {
                if *percent < Decimal::ZERO {
                    return Err(ConfigError::InvalidCommissionParameter(format!(
                        "percent = {percent}"
                    )));
                }
            }
            CommissionConfig::Tiered { tiers } => {
                if tiers.is_empty() {
                    return Err(ConfigError::EmptyCommissionTiers);
                }
                for tier in tiers {
                    if tier.amount < Decimal::ZERO {
                        return Err(ConfigError::InvalidCommissionParameter(format!(
                            "tier amount = {}",
                            tier.amount
                        )));
                    }
                }
            }
            CommissionConfig::None => {}
        }
        Ok(())
    }

    /// Deterministic BLAKE3 hash of the serialized config.
    ///
    /// Identical configs hash identically across runs, so the run id is
    /// content-addressable.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).expect("BacktestConfig must serialize");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
