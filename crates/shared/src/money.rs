//! Monetary rounding.
//!
//! All persisted amounts carry two decimal places and are rounded with
//! banker's rounding (half to even). Intermediate values keep full
//! `Decimal` precision until they are stored.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on every stored amount.
pub const MONEY_SCALE: u32 = 2;

/// Rounds an amount to two decimal places, half to even.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Computes `percent`% of `amount`, unrounded.
#[must_use]
pub fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    amount * percent / Decimal::ONE_HUNDRED
}
