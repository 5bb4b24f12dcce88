//! Error types for configuration, data, and engine failures.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Fatal configuration problems, reported before any event is processed.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("initial_cash must be positive, got {0}")]
    NonPositiveInitialCash(String),

    #[error("participation_cap must be in (0, 1], got {0}")]
    ParticipationCapOutOfRange(f64),

    #[error("max_position_pct must be in (0, 1], got {0}")]
    MaxPositionPctOutOfRange(f64),

    #[error("max_gross_exposure_pct must be positive, got {0}")]
    NonPositiveGrossExposure(f64),

    #[error("start_date {start} is after end_date {end}")]
    InvertedDateWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("symbol universe is empty")]
    EmptyUniverse,

    #[error("sizing policy parameter must be positive: {0}")]
    InvalidSizingParameter(String),

    #[error("slippage parameter must be non-negative: {0}")]
    InvalidSlippageParameter(String),

    #[error("commission parameter must be non-negative: {0}")]
    InvalidCommissionParameter(String),

    #[error("tiered commission requires at least one tier")]
    EmptyCommissionTiers,
}

/// Data-feed contract violations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("bars out of order for {symbol}: {current} after {previous}")]
    NonMonotonicTimestamps {
        symbol: String,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("duplicate bar for {symbol} at {timestamp}")]
    DuplicateBar {
        symbol: String,
        timestamp: DateTime<Utc>,
    },

    #[error("missing bar for {symbol} at {timestamp}")]
    MissingBar {
        symbol: String,
        timestamp: DateTime<Utc>,
    },

    #[error("insane bar for {symbol} at {timestamp} (OHLC ordering violated)")]
    InsaneBar {
        symbol: String,
        timestamp: DateTime<Utc>,
    },
}

/// Fatal internal-consistency failures during processing.
///
/// These signal a modeling bug, not a market condition; the run halts
/// rather than papering over them.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("equity identity violated at {timestamp}: equity {equity} != cash {cash} + market value {market_value}")]
    EquityIdentityViolation {
        timestamp: DateTime<Utc>,
        equity: String,
        cash: String,
        market_value: String,
    },

    #[error("fill for unknown order {0}")]
    FillForUnknownOrder(String),

    #[error("fill quantity {filled} exceeds remaining {remaining} on order {order}")]
    Overfill {
        order: String,
        filled: i64,
        remaining: i64,
    },

    #[error("cash went negative ({cash}) without margin enabled")]
    NegativeCash { cash: String },

    #[error(transparent)]
    Data(#[from] DataError),
}
