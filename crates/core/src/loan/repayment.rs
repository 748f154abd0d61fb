//! Repayment bookkeeping and default detection.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::schedule::add_months;
use crate::error::{RuleError, RuleResult, require_positive};

/// Loan figures a repayment updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepaymentState {
    /// Amount still owed.
    pub balance: Decimal,
    /// Amount repaid so far.
    pub amount_paid: Decimal,
    /// Regular installment.
    pub monthly_installment: Decimal,
}

/// Loan figures after a repayment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentOutcome {
    /// Amount actually applied after capping.
    pub applied: Decimal,
    /// New balance.
    pub balance: Decimal,
    /// New cumulative amount paid.
    pub amount_paid: Decimal,
    /// Installments still to pay.
    pub installments_remaining: i32,
    /// True once the balance reaches zero.
    pub completed: bool,
}

/// Caps a requested repayment at the outstanding balance.
#[must_use]
pub fn cap_repayment(requested: Decimal, balance: Decimal) -> Decimal {
    requested.min(balance)
}

/// Number of installments needed to clear `balance`.
#[must_use]
pub fn installments_remaining(balance: Decimal, monthly_installment: Decimal) -> i32 {
    if balance <= Decimal::ZERO {
        return 0;
    }
    if monthly_installment <= Decimal::ZERO {
        return 1;
    }
    (balance / monthly_installment)
        .ceil()
        .to_i32()
        .unwrap_or(i32::MAX)
}

/// Applies a repayment, silently capping overpayment.
///
/// # Errors
///
/// Returns `RuleError::NonPositiveAmount` for a non-positive request or a
/// loan with nothing left to pay.
pub fn apply_repayment(state: RepaymentState, requested: Decimal) -> RuleResult<RepaymentOutcome> {
    require_positive(requested)?;
    let applied = cap_repayment(requested, state.balance);
    require_positive(applied)?;

    let balance = state.balance - applied;
    Ok(RepaymentOutcome {
        applied,
        balance,
        amount_paid: state.amount_paid + applied,
        installments_remaining: installments_remaining(balance, state.monthly_installment),
        completed: balance.is_zero(),
    })
}

/// Due date of the next unpaid installment.
///
/// Installment `k` falls due `k` months after disbursement. Returns `None`
/// when nothing remains.
///
/// # Errors
///
/// Returns `RuleError::Overflow` past the representable date range.
pub fn next_due_date(
    disbursed_on: NaiveDate,
    term_months: i32,
    installments_remaining: i32,
) -> RuleResult<Option<NaiveDate>> {
    if installments_remaining <= 0 {
        return Ok(None);
    }
    let paid = (term_months - installments_remaining).max(0);
    let months = u32::try_from(paid + 1).map_err(|_| RuleError::Overflow("due date"))?;
    add_months(disbursed_on, months).map(Some)
}

/// Latest due date that can count as defaulted on `today`.
pub fn default_cutoff(today: NaiveDate, after_days: i64) -> RuleResult<NaiveDate> {
    Duration::try_days(after_days)
        .and_then(|grace| today.checked_sub_signed(grace))
        .ok_or(RuleError::Overflow("default cutoff"))
}

/// Returns true if a loan should be flagged as defaulted.
///
/// The due date must lie on or before `cutoff` (see [`default_cutoff`]),
/// and a payment made after the cutoff spares the loan.
#[must_use]
pub fn is_in_default(
    due_date: NaiveDate,
    last_payment_on: Option<NaiveDate>,
    cutoff: NaiveDate,
) -> bool {
    due_date <= cutoff && last_payment_on.is_none_or(|paid| paid <= cutoff)
}
