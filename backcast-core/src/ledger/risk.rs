//! Risk controls applied to signals before an order is emitted.
//!
//! Each control computes the maximum permissible quantity for the proposed
//! trade. Under `RiskMode::Clip` the order shrinks to the tightest cap;
//! under `RiskMode::Reject` any cap below the requested quantity kills the
//! signal. Either way the decision is recorded in the trade log.

use crate::domain::{OrderSide, Position, SignalId};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Why a signal was clipped or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    ShortingDisabled,
    MaxPositionSize,
    GrossExposure,
    InsufficientCash,
    ZeroQuantity,
    ExitWithoutPosition,
    NoPriceForSymbol,
}

/// Audit record for a signal that did not become a full-size order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    pub signal_id: SignalId,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub reason: RejectReason,
    pub requested: i64,
    /// Shares actually permitted (0 = rejected outright).
    pub granted: i64,
}

/// Inputs the caps need about current ledger state.
pub struct RiskInputs<'a> {
    pub cash: Decimal,
    pub equity: Decimal,
    pub gross_exposure: Decimal,
    pub position: Option<&'a Position>,
    pub price: Decimal,
    pub side: OrderSide,
}

/// Cap from the per-symbol position limit.
///
/// The resulting |position notional| must stay within
/// `max_position_pct × equity`.
pub fn max_position_cap(inputs: &RiskInputs<'_>, max_position_pct: f64) -> i64 {
    let budget = inputs.equity * decimal_from_f64(max_position_pct);
    let current_qty = inputs.position.map_or(0, |p| p.quantity);
    let current_notional = Decimal::from(current_qty) * inputs.price;

    // Room left in the direction of the trade. Trades that reduce exposure
    // are never capped by this control.
    let signed_budget = match inputs.side {
        OrderSide::Buy => budget - current_notional,
        OrderSide::Sell => budget + current_notional,
    };
    if signed_budget <= Decimal::ZERO {
        // Still allow reducing back toward flat.
        return reduce_only_cap(current_qty, inputs.side);
    }
    let room = (signed_budget / inputs.price)
        .floor()
        .to_i64()
        .unwrap_or(0);
    room + reduce_only_cap(current_qty, inputs.side)
}

/// Shares that merely reduce an existing opposite position (always allowed).
fn reduce_only_cap(current_qty: i64, side: OrderSide) -> i64 {
    match side {
        OrderSide::Buy if current_qty < 0 => -current_qty,
        OrderSide::Sell if current_qty > 0 => current_qty,
        _ => 0,
    }
}

/// Cap from the gross-exposure limit (a multiple of equity).
pub fn gross_exposure_cap(inputs: &RiskInputs<'_>, max_gross_pct: f64) -> i64 {
    let budget = inputs.equity * decimal_from_f64(max_gross_pct) - inputs.gross_exposure;
    let current_qty = inputs.position.map_or(0, |p| p.quantity);
    let reduce = reduce_only_cap(current_qty, inputs.side);
    if budget <= Decimal::ZERO {
        return reduce;
    }
    (budget / inputs.price).floor().to_i64().unwrap_or(0) + reduce
}

/// Cap from available cash (buys only; sells raise cash).
pub fn cash_cap(inputs: &RiskInputs<'_>) -> i64 {
    match inputs.side {
        OrderSide::Sell => i64::MAX,
        OrderSide::Buy => {
            if inputs.cash <= Decimal::ZERO {
                let current_qty = inputs.position.map_or(0, |p| p.quantity);
                return reduce_only_cap(current_qty, OrderSide::Buy);
            }
            (inputs.cash / inputs.price).floor().to_i64().unwrap_or(0)
        }
    }
}

/// Would this trade create or extend a net short position?
pub fn creates_short(position: Option<&Position>, side: OrderSide, quantity: i64) -> bool {
    if side == OrderSide::Buy {
        return false;
    }
    let current = position.map_or(0, |p| p.quantity);
    current - quantity < 0
}

fn decimal_from_f64(value: f64) -> Decimal {
    use rust_decimal::prelude::FromPrimitive;
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs<'a>(
        cash: i64,
        equity: i64,
        gross: i64,
        position: Option<&'a Position>,
        price: i64,
        side: OrderSide,
    ) -> RiskInputs<'a> {
        RiskInputs {
            cash: Decimal::from(cash),
            equity: Decimal::from(equity),
            gross_exposure: Decimal::from(gross),
            position,
            price: Decimal::from(price),
            side,
        }
    }

    #[test]
    fn cash_cap_limits_buys() {
        let i = inputs(5_000, 100_000, 0, None, 50, OrderSide::Buy);
        assert_eq!(cash_cap(&i), 100);
    }

    #[test]
    fn cash_cap_never_limits_sells() {
        let i = inputs(0, 100_000, 0, None, 50, OrderSide::Sell);
        assert_eq!(cash_cap(&i), i64::MAX);
    }

    #[test]
    fn max_position_cap_respects_existing_holding() {
        let mut pos = Position::flat("SPY");
        pos.apply(100, Decimal::from(50));
        // 10% of 100k = 10k budget; holding 5k already; room = 5k / 50 = 100.
        let i = inputs(100_000, 100_000, 5_000, Some(&pos), 50, OrderSide::Buy);
        assert_eq!(max_position_cap(&i, 0.1), 100);
    }

    #[test]
    fn max_position_cap_allows_reduction_when_full() {
        let mut pos = Position::flat("SPY");
        pos.apply(200, Decimal::from(50)); // 10k notional, exactly at a 10% cap
        let i = inputs(100_000, 100_000, 10_000, Some(&pos), 50, OrderSide::Sell);
        // Selling is reduction + the freed budget going short; at minimum the
        // full 200 reduction plus the 10% short budget (200 more).
        assert!(max_position_cap(&i, 0.1) >= 200);
    }

    #[test]
    fn gross_exposure_blocks_when_exhausted() {
        let i = inputs(100_000, 100_000, 100_000, None, 50, OrderSide::Buy);
        assert_eq!(gross_exposure_cap(&i, 1.0), 0);
    }

    #[test]
    fn creates_short_detection() {
        assert!(creates_short(None, OrderSide::Sell, 1));
        assert!(!creates_short(None, OrderSide::Buy, 100));

        let mut pos = Position::flat("SPY");
        pos.apply(100, Decimal::from(50));
        assert!(!creates_short(Some(&pos), OrderSide::Sell, 100));
        assert!(creates_short(Some(&pos), OrderSide::Sell, 101));
    }
}
