//! Trade-log replay — rebuild final ledger state from archived fills.
//!
//! Fills archive the exact rounded price, commission, and slippage that were
//! applied during the run, so replaying them against the initial cash must
//! reproduce the final cash and position state bit for bit.

use super::{TradeLog, TradeRecord};
use crate::domain::{OrderSide, Position};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Final state reconstructed from a trade log.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    pub cash: Decimal,
    pub positions: HashMap<String, Position>,
    pub total_commission: Decimal,
    pub total_slippage: Decimal,
}

/// Replay every fill in the log against `initial_cash`.
///
/// Rejected and expired records carry no state changes and are skipped.
pub fn replay_trade_log(initial_cash: Decimal, log: &TradeLog) -> LedgerSnapshot {
    let mut cash = initial_cash;
    let mut positions: HashMap<String, Position> = HashMap::new();
    let mut total_commission = Decimal::ZERO;
    let mut total_slippage = Decimal::ZERO;

    for record in log.records() {
        let fill = match record {
            TradeRecord::Fill(f) => f,
            TradeRecord::Rejected(_) | TradeRecord::Expired { .. } => continue,
        };

        let position = positions
            .entry(fill.symbol.clone())
            .or_insert_with(|| Position::flat(fill.symbol.clone()));
        position.apply(fill.signed_quantity(), fill.price);

        let notional = fill.price * Decimal::from(fill.quantity);
        match fill.side {
            OrderSide::Buy => cash -= notional,
            OrderSide::Sell => cash += notional,
        }
        cash -= fill.commission + fill.slippage;
        total_commission += fill.commission;
        total_slippage += fill.slippage;
    }

    LedgerSnapshot {
        cash,
        positions,
        total_commission,
        total_slippage,
    }
}
