//! Order vocabulary: side, kind, time-in-force.

use serde::{Deserialize, Serialize};

/// Which way an order trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Sign applied to quantities: +1 for buys, -1 for sells.
    pub fn sign(&self) -> i64 {
        match self {
            OrderSide::Buy => 1,
            OrderSide::Sell => -1,
        }
    }
}

/// What kind of order and its price parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Fill at the configured fill-price rule.
    Market,
    /// Fill at limit price or better; eligible only when the bar crosses it.
    Limit { limit_price: f64 },
}

/// How long a residual order stays alive in the execution book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Expires after its first eligible bar.
    Day,
    /// Never expires on its own.
    GoodTillCancel,
    /// Expires after this many eligible bars.
    GoodForBars(u32),
}
