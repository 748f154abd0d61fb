//! Amortization schedule.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use sacco_shared::round_money;
use serde::{Deserialize, Serialize};

use super::pricing::{InterestMethod, monthly_rate};
use crate::error::{RuleError, RuleResult};

/// One row of a repayment schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    /// Installment number (1-based).
    pub number: i32,
    /// Date the installment falls due.
    pub due_date: NaiveDate,
    /// Amount due.
    pub payment: Decimal,
    /// Principal portion of `payment`.
    pub principal: Decimal,
    /// Interest portion of `payment`.
    pub interest: Decimal,
    /// Amount still owed after this installment.
    pub remaining_balance: Decimal,
}

/// Inputs for [`build_schedule`], taken from a priced loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleInput {
    /// Borrowed amount.
    pub principal: Decimal,
    /// Principal plus interest.
    pub total_amount: Decimal,
    /// Regular installment.
    pub monthly_installment: Decimal,
    /// Number of installments.
    pub term_months: i32,
    /// Annual interest rate in percent.
    pub annual_rate: Decimal,
    /// Interest method.
    pub interest_method: InterestMethod,
    /// Due date of the first installment.
    pub first_due_date: NaiveDate,
}

/// Adds calendar months, clamping to the end of shorter months.
///
/// # Errors
///
/// Returns `RuleError::Overflow` past the representable date range.
pub fn add_months(date: NaiveDate, months: u32) -> RuleResult<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or(RuleError::Overflow("due date"))
}

/// Splits a priced loan into monthly installments.
///
/// Every installment but the last pays `monthly_installment`; the last pays
/// whatever is left, so payments sum to `total_amount` and principal
/// portions sum to `principal` exactly.
///
/// # Errors
///
/// Returns an error for a non-positive term or on date overflow.
pub fn build_schedule(input: &ScheduleInput) -> RuleResult<Vec<ScheduledInstallment>> {
    if input.term_months < 1 {
        return Err(RuleError::InvalidTerms {
            field: "term_months",
            reason: "must be at least one month".to_string(),
        });
    }

    let rate = monthly_rate(input.annual_rate);
    let mut remaining_total = input.total_amount;
    let mut remaining_principal = input.principal;
    let mut rows = Vec::with_capacity(usize::try_from(input.term_months).unwrap_or_default());

    for number in 1..=input.term_months {
        let is_last = number == input.term_months;
        let payment = if is_last {
            remaining_total
        } else {
            input.monthly_installment.min(remaining_total)
        };

        let principal = if is_last {
            remaining_principal
        } else {
            let portion = match input.interest_method {
                InterestMethod::Flat if input.total_amount.is_zero() => Decimal::ZERO,
                InterestMethod::Flat => {
                    round_money(payment * input.principal / input.total_amount)
                }
                InterestMethod::ReducingBalance => {
                    payment - round_money(remaining_principal * rate)
                }
            };
            portion.max(Decimal::ZERO).min(remaining_principal)
        };

        remaining_total -= payment;
        remaining_principal -= principal;

        let offset = u32::try_from(number - 1).map_err(|_| RuleError::Overflow("due date"))?;
        rows.push(ScheduledInstallment {
            number,
            due_date: add_months(input.first_due_date, offset)?,
            payment,
            principal,
            interest: payment - principal,
            remaining_balance: remaining_total,
        });
    }

    Ok(rows)
}
