//! Commission models, charged per fill and rounded to cents.

use crate::config::CommissionConfig;
use crate::domain::to_cents;
use rust_decimal::Decimal;

/// Commission for a fill of `quantity` shares at the given notional.
pub fn commission_cost(config: &CommissionConfig, quantity: i64, notional: Decimal) -> Decimal {
    let raw = match config {
        CommissionConfig::None => Decimal::ZERO,
        CommissionConfig::PerTrade { amount } => *amount,
        CommissionConfig::PerShare { amount } => *amount * Decimal::from(quantity),
        CommissionConfig::PercentNotional { percent } => {
            notional * *percent / Decimal::from(100)
        }
        CommissionConfig::Tiered { tiers } => {
            // First tier whose bound covers the notional; the last tier
            // catches everything above its bound.
            tiers
                .iter()
                .find(|t| notional <= t.up_to)
                .or_else(|| tiers.last())
                .map_or(Decimal::ZERO, |t| t.amount)
        }
    };
    to_cents(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommissionTier;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn per_trade_is_flat() {
        let c = CommissionConfig::PerTrade { amount: dec("1.00") };
        assert_eq!(commission_cost(&c, 100, dec("5000")), dec("1.00"));
        assert_eq!(commission_cost(&c, 1, dec("50")), dec("1.00"));
    }

    #[test]
    fn per_share_scales_with_quantity() {
        let c = CommissionConfig::PerShare { amount: dec("0.005") };
        assert_eq!(commission_cost(&c, 1000, dec("50000")), dec("5.00"));
    }

    #[test]
    fn percent_notional() {
        let c = CommissionConfig::PercentNotional { percent: dec("0.1") };
        assert_eq!(commission_cost(&c, 100, dec("5000")), dec("5.00"));
    }

    #[test]
    fn tiered_picks_first_covering_tier() {
        let c = CommissionConfig::Tiered {
            tiers: vec![
                CommissionTier { up_to: dec("1000"), amount: dec("1.00") },
                CommissionTier { up_to: dec("10000"), amount: dec("5.00") },
            ],
        };
        assert_eq!(commission_cost(&c, 10, dec("500")), dec("1.00"));
        assert_eq!(commission_cost(&c, 100, dec("5000")), dec("5.00"));
        // Above the last bound the last tier still applies.
        assert_eq!(commission_cost(&c, 1000, dec("50000")), dec("5.00"));
    }

    #[test]
    fn rounds_to_cents() {
        let c = CommissionConfig::PercentNotional { percent: dec("0.1") };
        // 0.1% of 333.33 = 0.33333 -> 0.33
        assert_eq!(commission_cost(&c, 10, dec("333.33")), dec("0.33"));
    }
}
