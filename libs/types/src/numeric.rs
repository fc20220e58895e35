//! Fixed-point decimal helpers for ratios and token amounts
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Ratios are expressed against `WAD = 1`: a 75% collateral ratio is `0.75`.

use rust_decimal::{Decimal, RoundingStrategy};

/// Unit of all fixed-point ratios
pub const WAD: Decimal = Decimal::ONE;

/// Multiply with overflow detection
pub fn checked_mul(a: Decimal, b: Decimal) -> Option<Decimal> {
    a.checked_mul(b)
}

/// Multiply three factors with overflow detection
pub fn checked_mul3(a: Decimal, b: Decimal, c: Decimal) -> Option<Decimal> {
    a.checked_mul(b)?.checked_mul(c)
}

/// True if `amount` has no more fractional digits than the asset supports
pub fn fits_decimals(amount: Decimal, decimals: u8) -> bool {
    amount.normalize().scale() <= u32::from(decimals)
}

/// Round a token amount down to the asset's precision
pub fn round_down(amount: Decimal, decimals: u8) -> Decimal {
    amount.round_dp_with_strategy(u32::from(decimals), RoundingStrategy::ToZero)
}
