//! Rule violations raised by the pure business logic.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result alias for rule evaluation.
pub type RuleResult<T> = Result<T, RuleError>;

/// A business rule rejected its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// Monetary amount was zero or negative.
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// A requested value falls outside configured bounds.
    #[error("{field} {value} is outside the allowed range {min}..={max}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The requested value.
        value: String,
        /// Lower bound (inclusive).
        min: String,
        /// Upper bound (inclusive).
        max: String,
    },

    /// Product or policy terms are inconsistent.
    #[error("Invalid {field}: {reason}")]
    InvalidTerms {
        /// Name of the offending field.
        field: &'static str,
        /// Human readable explanation.
        reason: String,
    },

    /// A debit would take the balance below zero.
    #[error("Debit of {amount} exceeds balance {balance}")]
    Overdraw {
        /// Current balance.
        balance: Decimal,
        /// Requested debit.
        amount: Decimal,
    },

    /// Decimal or date arithmetic overflowed.
    #[error("Arithmetic overflow while computing {0}")]
    Overflow(&'static str),
}

/// Fails unless `amount` is strictly positive.
pub fn require_positive(amount: Decimal) -> RuleResult<()> {
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(RuleError::NonPositiveAmount(amount))
    }
}
