//! Sizing policies — translate a signal into a target order quantity.

use crate::config::SizingPolicy;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Compute the target quantity for a signal before risk controls.
///
/// `strength` is clamped to [0, 1] and scales the policy's output, so a
/// half-conviction signal produces half the shares. The result is floored
/// to whole shares.
pub fn target_quantity(
    policy: &SizingPolicy,
    strength: f64,
    equity: Decimal,
    price: Decimal,
) -> i64 {
    let strength = strength.clamp(0.0, 1.0);
    if price <= Decimal::ZERO {
        return 0;
    }

    let raw = match *policy {
        SizingPolicy::FixedQuantity { quantity } => quantity as f64,
        SizingPolicy::FractionalEquity { fraction } => {
            let equity = equity.to_f64().unwrap_or(0.0);
            let price = price.to_f64().unwrap_or(f64::INFINITY);
            equity * fraction / price
        }
        SizingPolicy::RiskBased {
            risk_pct,
            stop_distance_pct,
        } => {
            let equity = equity.to_f64().unwrap_or(0.0);
            let price = price.to_f64().unwrap_or(f64::INFINITY);
            (equity * risk_pct) / (price * stop_distance_pct)
        }
    };

    (raw * strength).floor().max(0.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_quantity_ignores_equity() {
        let qty = target_quantity(
            &SizingPolicy::FixedQuantity { quantity: 100 },
            1.0,
            Decimal::from(1),
            Decimal::from(50),
        );
        assert_eq!(qty, 100);
    }

    #[test]
    fn strength_scales_quantity() {
        let qty = target_quantity(
            &SizingPolicy::FixedQuantity { quantity: 100 },
            0.5,
            Decimal::from(100_000),
            Decimal::from(50),
        );
        assert_eq!(qty, 50);
    }

    #[test]
    fn fractional_equity_floors_shares() {
        // 10% of 100k = 10k; at 33/share = 303.03 -> 303
        let qty = target_quantity(
            &SizingPolicy::FractionalEquity { fraction: 0.1 },
            1.0,
            Decimal::from(100_000),
            Decimal::from(33),
        );
        assert_eq!(qty, 303);
    }

    #[test]
    fn risk_based_sizing() {
        // risk 1% of 100k = 1000; stop 5% of 100 = 5/share -> 200 shares
        let qty = target_quantity(
            &SizingPolicy::RiskBased {
                risk_pct: 0.01,
                stop_distance_pct: 0.05,
            },
            1.0,
            Decimal::from(100_000),
            Decimal::from(100),
        );
        assert_eq!(qty, 200);
    }

    #[test]
    fn zero_price_yields_zero() {
        let qty = target_quantity(
            &SizingPolicy::FractionalEquity { fraction: 0.1 },
            1.0,
            Decimal::from(100_000),
            Decimal::ZERO,
        );
        assert_eq!(qty, 0);
    }
}
