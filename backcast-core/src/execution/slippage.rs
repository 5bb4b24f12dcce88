//! Slippage models, charged as an explicit cash cost per fill.
//!
//! Slippage is not folded into the fill price; it is archived as its own
//! debit so the trade log stays exactly replayable.

use crate::config::SlippageConfig;
use crate::domain::to_cents;
use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

const BPS_DENOMINATOR: i64 = 10_000;

/// Draw the random component for one fill attempt.
///
/// Sampled once per attempt so re-costing a shrunk fill does not advance
/// the RNG stream; non-random models return 0.
pub fn sample_random_bps(config: &SlippageConfig, rng: &mut StdRng) -> f64 {
    match *config {
        SlippageConfig::Random { max_bps } if max_bps > 0.0 => rng.gen_range(0.0..=max_bps),
        _ => 0.0,
    }
}

/// Slippage cost for a fill of `quantity` shares at `notional`, against a
/// bar that traded `bar_volume` shares. `sampled_bps` is the value drawn by
/// [`sample_random_bps`] for this attempt.
pub fn slippage_cost(
    config: &SlippageConfig,
    quantity: i64,
    notional: Decimal,
    bar_volume: u64,
    sampled_bps: f64,
) -> Decimal {
    let bps = match *config {
        SlippageConfig::None => return Decimal::ZERO,
        SlippageConfig::FixedBps { bps } => bps,
        SlippageConfig::VolumeImpact { impact_bps } => {
            if bar_volume == 0 {
                return Decimal::ZERO;
            }
            impact_bps * quantity as f64 / bar_volume as f64
        }
        SlippageConfig::Random { .. } => sampled_bps,
    };
    let factor = Decimal::from_f64(bps).unwrap_or(Decimal::ZERO) / Decimal::from(BPS_DENOMINATOR);
    to_cents(notional * factor)
}
