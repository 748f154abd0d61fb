//! Error taxonomy for SACCO service operations.
//!
//! Business failures are distinct variants so callers can match on them
//! instead of parsing messages. A failed operation never leaves partial
//! state behind: the database transaction is dropped and rolled back.

use rust_decimal::Decimal;
use sacco_core::RuleError;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for service operations.
pub type SaccoResult<T> = Result<T, SaccoError>;

/// Errors raised by the SACCO services.
#[derive(Debug, Error)]
pub enum SaccoError {
    // ========== Business Errors ==========
    /// Entity is in a status that forbids the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Monetary amount was zero or negative.
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Available balance cannot cover the debit.
    #[error("Insufficient funds in account {account_id}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Account that was debited.
        account_id: Uuid,
        /// Available balance at the time of the request.
        available: Decimal,
        /// Requested debit.
        requested: Decimal,
    },

    /// Member already holds an account of this type.
    #[error("Member {member_id} already has a {account_type} account")]
    DuplicateAccount {
        /// Member id.
        member_id: Uuid,
        /// Account type name.
        account_type: &'static str,
    },

    /// User already has a SACCO membership.
    #[error("User {0} is already a SACCO member")]
    AlreadyMember(Uuid),

    /// Loan amount or term outside product bounds.
    #[error("{0}")]
    OutOfRange(String),

    /// Composite eligibility predicate failed.
    #[error("Eligibility check failed: {}", reasons.join("; "))]
    EligibilityFailed {
        /// Every unmet condition.
        reasons: Vec<String>,
    },

    /// Account still holds funds.
    #[error("Account {account_id} has non-zero balance {balance}")]
    NonZeroBalance {
        /// Account id.
        account_id: Uuid,
        /// Remaining balance.
        balance: Decimal,
    },

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Requested id.
        id: Uuid,
    },

    // ========== Infrastructure Errors ==========
    /// A row lock could not be acquired in time.
    #[error("Timed out waiting for a row lock, please retry")]
    LockTimeout,

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Broken internal invariant.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SaccoError {
    /// Shorthand for [`SaccoError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidState(_) => "INVALID_STATE",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::DuplicateAccount { .. } => "DUPLICATE_ACCOUNT",
            Self::AlreadyMember(_) => "ALREADY_MEMBER",
            Self::OutOfRange(_) => "OUT_OF_RANGE",
            Self::EligibilityFailed { .. } => "ELIGIBILITY_FAILED",
            Self::NonZeroBalance { .. } => "NON_ZERO_BALANCE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::LockTimeout => "LOCK_TIMEOUT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if retrying the same call may succeed.
    ///
    /// Only lock timeouts qualify. Nothing inside the services retries
    /// automatically.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout)
    }
}

impl From<DbErr> for SaccoError {
    fn from(err: DbErr) -> Self {
        let message = err.to_string();
        let lowered = message.to_lowercase();
        // 55P03 is PostgreSQL's lock_not_available
        if lowered.contains("55p03")
            || lowered.contains("lock timeout")
            || lowered.contains("database is locked")
        {
            Self::LockTimeout
        } else {
            Self::Database(message)
        }
    }
}

impl From<RuleError> for SaccoError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::NonPositiveAmount(amount) => Self::InvalidAmount(amount),
            RuleError::OutOfRange { .. } => Self::OutOfRange(err.to_string()),
            RuleError::InvalidTerms { .. } => Self::InvalidState(err.to_string()),
            RuleError::Overdraw { .. } | RuleError::Overflow(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SaccoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("snapshot serialization failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_lock_errors_are_retryable() {
        let err = SaccoError::from(DbErr::Custom(
            "error returned from database: canceling statement due to lock timeout".to_string(),
        ));
        assert!(matches!(err, SaccoError::LockTimeout));
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "LOCK_TIMEOUT");

        let err = SaccoError::from(DbErr::Custom("database is locked".to_string()));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_other_db_errors_are_not_retryable() {
        let err = SaccoError::from(DbErr::Custom("relation does not exist".to_string()));
        assert!(matches!(err, SaccoError::Database(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_rule_errors_map_to_taxonomy() {
        assert!(matches!(
            SaccoError::from(RuleError::NonPositiveAmount(dec!(0))),
            SaccoError::InvalidAmount(_)
        ));
        let err = SaccoError::from(RuleError::OutOfRange {
            field: "amount",
            value: "5".to_string(),
            min: "10".to_string(),
            max: "20".to_string(),
        });
        assert_eq!(err.error_code(), "OUT_OF_RANGE");
        assert!(err.to_string().contains("amount 5"));
    }

    #[test]
    fn test_eligibility_message_lists_reasons() {
        let err = SaccoError::EligibilityFailed {
            reasons: vec!["Member is not active".to_string(), "Member has 1 defaulted loan(s)".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Eligibility check failed: Member is not active; Member has 1 defaulted loan(s)"
        );
    }
}
