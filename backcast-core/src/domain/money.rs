//! Fixed rounding rule for money entering the ledger.
//!
//! Bar prices live as `f64` at the data edge. The moment a price becomes a
//! booked monetary amount it is converted to `Decimal` at 4 decimal places;
//! commission and slippage are booked in cents. All ledger arithmetic after
//! conversion is exact.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Decimal places kept for fill prices.
pub const PRICE_DP: u32 = 4;

/// Decimal places kept for booked costs (cents).
pub const CENTS_DP: u32 = 2;

/// Convert an f64 price to an exact Decimal under the fixed rounding rule.
///
/// Non-finite inputs map to zero; bars are sanity-checked before they reach
/// the ledger, so this only guards internal misuse.
pub fn to_price(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO).round_dp(PRICE_DP)
}

/// Round a monetary amount to cents.
pub fn to_cents(value: Decimal) -> Decimal {
    value.round_dp(CENTS_DP)
}
