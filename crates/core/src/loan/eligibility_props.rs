//! Property-based tests for borrower eligibility.
//!
//! - `eligible` holds exactly when no reason was recorded
//! - An eligible request never exceeds the available capacity

use proptest::prelude::*;
use rust_decimal::Decimal;
use sacco_shared::config::LoanPolicy;

use super::eligibility::{BorrowerSnapshot, EligibilityPolicy, assess_eligibility};

/// Strategy to generate non-negative decimal amounts (0.00 to 100,000.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn borrower() -> impl Strategy<Value = BorrowerSnapshot> {
    (any::<bool>(), amount(), amount(), 0u64..5, amount(), 0u64..2).prop_map(
        |(active, savings, shares, loans, outstanding, defaulted)| BorrowerSnapshot {
            member_active: active,
            total_savings: savings,
            total_shares: shares,
            active_loan_count: loans,
            outstanding_balance: outstanding,
            defaulted_loan_count: defaulted,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_eligible_iff_no_reasons(borrower in borrower(), requested in amount()) {
        let policy = EligibilityPolicy::from(&LoanPolicy::default());
        let result = assess_eligibility(&borrower, requested, &policy);
        prop_assert_eq!(result.eligible, result.reasons.is_empty());
        prop_assert!(result.available_capacity >= Decimal::ZERO);
    }

    #[test]
    fn prop_eligible_request_fits_capacity(borrower in borrower(), requested in amount()) {
        let policy = EligibilityPolicy::from(&LoanPolicy::default());
        let result = assess_eligibility(&borrower, requested, &policy);
        if result.eligible {
            prop_assert!(requested <= result.available_capacity);
            prop_assert!(borrower.member_active);
            prop_assert!(borrower.active_loan_count < policy.max_active_loans);
            prop_assert_eq!(borrower.defaulted_loan_count, 0);
        }
    }
}
