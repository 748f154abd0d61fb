//! Borrower eligibility.
//!
//! Six independent checks, all evaluated so that `reasons` lists every unmet
//! condition:
//! 1. The member is active
//! 2. The member holds the minimum share capital
//! 3. `amount <= max(savings × savings_multiplier, shares × shares_multiplier)`
//! 4. Fewer than `max_active_loans` active or disbursed loans
//! 5. `outstanding + amount <= max_amount`
//! 6. No defaulted loans

use rust_decimal::Decimal;
use sacco_shared::config::LoanPolicy;
use serde::{Deserialize, Serialize};

/// Facts about a member relevant to borrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowerSnapshot {
    /// Member status is `active`.
    pub member_active: bool,
    /// Denormalized savings total.
    pub total_savings: Decimal,
    /// Denormalized shares total.
    pub total_shares: Decimal,
    /// Loans in `active` or `disbursed` status.
    pub active_loan_count: u64,
    /// Sum of balances across active/disbursed loans.
    pub outstanding_balance: Decimal,
    /// Loans in `defaulted` status.
    pub defaulted_loan_count: u64,
}

/// Limits applied by the eligibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityPolicy {
    /// Collateral multiplier on savings.
    pub savings_multiplier: Decimal,
    /// Collateral multiplier on shares.
    pub shares_multiplier: Decimal,
    /// Maximum concurrent active/disbursed loans.
    pub max_active_loans: u64,
    /// Minimum share capital.
    pub min_share_capital: Decimal,
}

impl From<&LoanPolicy> for EligibilityPolicy {
    fn from(policy: &LoanPolicy) -> Self {
        Self {
            savings_multiplier: policy.savings_multiplier,
            shares_multiplier: policy.shares_multiplier,
            max_active_loans: policy.max_active_loans,
            min_share_capital: policy.min_share_capital,
        }
    }
}

impl EligibilityPolicy {
    /// Collateral cap: `max(savings × m_s, shares × m_sh)`.
    #[must_use]
    pub fn max_loan_amount(&self, total_savings: Decimal, total_shares: Decimal) -> Decimal {
        (total_savings * self.savings_multiplier).max(total_shares * self.shares_multiplier)
    }
}

/// Outcome of an eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanEligibility {
    /// True when every check passed.
    pub eligible: bool,
    /// One entry per failed check.
    pub reasons: Vec<String>,
    /// Collateral cap.
    pub max_amount: Decimal,
    /// Current outstanding balance.
    pub current_outstanding: Decimal,
    /// `max(max_amount - outstanding, 0)`.
    pub available_capacity: Decimal,
}

/// Evaluates every eligibility check for a loan of `amount`.
#[must_use]
pub fn assess_eligibility(
    borrower: &BorrowerSnapshot,
    amount: Decimal,
    policy: &EligibilityPolicy,
) -> LoanEligibility {
    let mut reasons = Vec::new();
    let max_amount = policy.max_loan_amount(borrower.total_savings, borrower.total_shares);
    let outstanding = borrower.outstanding_balance;

    if !borrower.member_active {
        reasons.push("Member is not active".to_string());
    }

    if borrower.total_shares < policy.min_share_capital {
        reasons.push(format!(
            "Minimum share capital of {} required, member holds {}",
            policy.min_share_capital, borrower.total_shares
        ));
    }

    if amount > max_amount {
        reasons.push(format!(
            "Requested amount {amount} exceeds the maximum loan limit of {max_amount}"
        ));
    }

    if borrower.active_loan_count >= policy.max_active_loans {
        reasons.push(format!(
            "Member already has {} active loans (maximum {})",
            borrower.active_loan_count, policy.max_active_loans
        ));
    }

    if outstanding + amount > max_amount {
        reasons.push(format!(
            "Outstanding balance {outstanding} plus requested amount {amount} exceeds the loan limit of {max_amount}"
        ));
    }

    if borrower.defaulted_loan_count > 0 {
        reasons.push(format!(
            "Member has {} defaulted loan(s)",
            borrower.defaulted_loan_count
        ));
    }

    LoanEligibility {
        eligible: reasons.is_empty(),
        reasons,
        max_amount,
        current_outstanding: outstanding,
        available_capacity: (max_amount - outstanding).max(Decimal::ZERO),
    }
}
