//! Loan rules.
//!
//! This module implements the rules behind the loan lifecycle:
//! - Product terms and pricing (flat and reducing-balance interest)
//! - Amortization schedules
//! - Borrower eligibility (all checks evaluated, reasons accumulate)
//! - Repayment bookkeeping and default detection

pub mod eligibility;
pub mod pricing;
pub mod repayment;
pub mod schedule;

#[cfg(test)]
mod eligibility_props;
#[cfg(test)]
mod pricing_props;

pub use eligibility::{BorrowerSnapshot, EligibilityPolicy, LoanEligibility, assess_eligibility};
pub use pricing::{InterestMethod, LoanQuote, ProductTerms};
pub use repayment::{
    RepaymentOutcome, RepaymentState, apply_repayment, cap_repayment, default_cutoff,
    installments_remaining, is_in_default, next_due_date,
};
pub use schedule::{ScheduleInput, ScheduledInstallment, add_months, build_schedule};
