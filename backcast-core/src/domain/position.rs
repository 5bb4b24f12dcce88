//! Position — signed per-symbol holding with moving-average cost basis.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-symbol position state.
///
/// Quantity is a signed share count (negative = short). The average cost is
/// maintained with the moving-average rule; reducing fills realize PnL into
/// the accumulator and leave the average cost untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: i64,
    pub avg_cost: Decimal,
    pub realized_pnl: Decimal,
}

impl Position {
    pub fn flat(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: 0,
            avg_cost: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    /// Mark-to-market value at the given price.
    pub fn market_value(&self, price: Decimal) -> Decimal {
        Decimal::from(self.quantity) * price
    }

    /// Apply a signed fill quantity at a price.
    ///
    /// Same-direction fills accumulate into the average cost. Opposite-
    /// direction fills first reduce the position, realizing
    /// `reduced × (price − avg_cost)` (sign-adjusted for shorts); any
    /// remainder past flat opens a new position at the fill price.
    ///
    /// Returns the realized PnL delta of this fill.
    pub fn apply(&mut self, signed_quantity: i64, price: Decimal) -> Decimal {
        if signed_quantity == 0 {
            return Decimal::ZERO;
        }

        let old_qty = self.quantity;
        let same_direction = old_qty == 0 || old_qty.signum() == signed_quantity.signum();

        if same_direction {
            let new_qty = old_qty + signed_quantity;
            self.avg_cost = (Decimal::from(old_qty) * self.avg_cost
                + Decimal::from(signed_quantity) * price)
                / Decimal::from(new_qty);
            self.quantity = new_qty;
            return Decimal::ZERO;
        }

        // Opposite direction: reduce toward flat first.
        let reduce = signed_quantity.abs().min(old_qty.abs());
        let realized =
            Decimal::from(old_qty.signum()) * Decimal::from(reduce) * (price - self.avg_cost);
        self.realized_pnl += realized;
        self.quantity = old_qty + signed_quantity;

        if self.quantity == 0 {
            self.avg_cost = Decimal::ZERO;
        } else if self.quantity.signum() != old_qty.signum() {
            // Direction flip: remainder opens fresh at the fill price.
            self.avg_cost = price;
        }
        realized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn accumulation_moves_average_cost() {
        let mut pos = Position::flat("SPY");
        pos.apply(100, dec("50"));
        assert_eq!(pos.quantity, 100);
        assert_eq!(pos.avg_cost, dec("50"));

        pos.apply(100, dec("60"));
        assert_eq!(pos.quantity, 200);
        assert_eq!(pos.avg_cost, dec("55"));
        assert_eq!(pos.realized_pnl, Decimal::ZERO);
    }

    #[test]
    fn reduction_realizes_pnl_and_keeps_cost() {
        let mut pos = Position::flat("SPY");
        pos.apply(100, dec("50"));
        let realized = pos.apply(-40, dec("60"));
        assert_eq!(realized, dec("400")); // 40 * (60 - 50)
        assert_eq!(pos.quantity, 60);
        assert_eq!(pos.avg_cost, dec("50"));
        assert_eq!(pos.realized_pnl, dec("400"));
    }

    #[test]
    fn full_close_resets_average_cost() {
        let mut pos = Position::flat("SPY");
        pos.apply(100, dec("50"));
        pos.apply(-100, dec("45"));
        assert!(pos.is_flat());
        assert_eq!(pos.avg_cost, Decimal::ZERO);
        assert_eq!(pos.realized_pnl, dec("-500"));
    }

    #[test]
    fn short_reduction_realizes_inverted() {
        let mut pos = Position::flat("SPY");
        pos.apply(-100, dec("50"));
        assert!(pos.is_short());
        // Cover half at 40: profit 10/share on 50 shares.
        let realized = pos.apply(50, dec("40"));
        assert_eq!(realized, dec("500"));
        assert_eq!(pos.quantity, -50);
        assert_eq!(pos.avg_cost, dec("50"));
    }

    #[test]
    fn direction_flip_opens_at_fill_price() {
        let mut pos = Position::flat("SPY");
        pos.apply(100, dec("50"));
        // Sell 150 at 55: close 100 (+500), open short 50 at 55.
        let realized = pos.apply(-150, dec("55"));
        assert_eq!(realized, dec("500"));
        assert_eq!(pos.quantity, -50);
        assert_eq!(pos.avg_cost, dec("55"));
    }

    #[test]
    fn market_value_signed() {
        let mut pos = Position::flat("SPY");
        pos.apply(-10, dec("100"));
        assert_eq!(pos.market_value(dec("110")), dec("-1100"));
    }
}
