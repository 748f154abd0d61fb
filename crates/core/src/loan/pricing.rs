//! Loan product terms and pricing.
//!
//! A product fixes the amount and term bounds, the annual interest rate, the
//! interest method and two fee rates (percent of principal). Pricing a
//! request produces a [`LoanQuote`]:
//!
//! - Flat: `interest = P × r/100 × n/12`
//! - Reducing balance: annuity payment `P·i / (1 − (1+i)^−n)` with
//!   `i = r/1200`, `interest = payment × n − P`
//!
//! `total_amount = P + interest` is what the member owes. Fees are deducted
//! at disbursement and are not part of the balance. The monthly installment
//! is `total / n` rounded up to the cent so `n` installments always cover the
//! total.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use sacco_shared::{MONEY_SCALE, percent_of, round_money};
use serde::{Deserialize, Serialize};

use crate::error::{RuleError, RuleResult, require_positive};

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);
const PERCENT_PER_MONTH_DIVISOR: Decimal = Decimal::from_parts(1200, 0, 0, false, 0);

/// How interest is charged over the term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestMethod {
    /// Interest on the original principal for the whole term.
    Flat,
    /// Equal installments with interest on the outstanding principal.
    ReducingBalance,
}

impl InterestMethod {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::ReducingBalance => "reducing_balance",
        }
    }

    /// Parses a method from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flat" => Some(Self::Flat),
            "reducing_balance" => Some(Self::ReducingBalance),
            _ => None,
        }
    }
}

impl fmt::Display for InterestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounds and pricing parameters of a loan product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTerms {
    /// Smallest principal offered.
    pub min_amount: Decimal,
    /// Largest principal offered.
    pub max_amount: Decimal,
    /// Shortest term in months.
    pub min_term_months: i32,
    /// Longest term in months.
    pub max_term_months: i32,
    /// Annual interest rate in percent.
    pub interest_rate: Decimal,
    /// Interest method.
    pub interest_method: InterestMethod,
    /// Processing fee, percent of principal.
    pub processing_fee_rate: Decimal,
    /// Insurance fee, percent of principal.
    pub insurance_fee_rate: Decimal,
}

/// Priced loan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanQuote {
    /// Borrowed amount.
    pub principal: Decimal,
    /// Interest over the whole term.
    pub interest_amount: Decimal,
    /// Processing fee deducted at disbursement.
    pub processing_fee: Decimal,
    /// Insurance fee deducted at disbursement.
    pub insurance_fee: Decimal,
    /// `principal + interest_amount`.
    pub total_amount: Decimal,
    /// Installment due each month.
    pub monthly_installment: Decimal,
    /// Number of monthly installments.
    pub term_months: i32,
}

impl ProductTerms {
    /// Checks the terms are internally consistent.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::InvalidTerms` naming the first inconsistent field.
    pub fn validate(&self) -> RuleResult<()> {
        let invalid = |field: &'static str, reason: &str| {
            Err(RuleError::InvalidTerms {
                field,
                reason: reason.to_string(),
            })
        };

        if self.min_amount <= Decimal::ZERO {
            return invalid("min_amount", "must be positive");
        }
        if self.max_amount < self.min_amount {
            return invalid("max_amount", "must not be below min_amount");
        }
        if self.min_term_months < 1 {
            return invalid("min_term_months", "must be at least one month");
        }
        if self.max_term_months < self.min_term_months {
            return invalid("max_term_months", "must not be below min_term_months");
        }
        if self.interest_rate < Decimal::ZERO || self.interest_rate > Decimal::ONE_HUNDRED {
            return invalid("interest_rate", "must be between 0 and 100 percent");
        }
        if self.processing_fee_rate < Decimal::ZERO || self.insurance_fee_rate < Decimal::ZERO {
            return invalid("fee_rate", "must not be negative");
        }
        if self.processing_fee_rate + self.insurance_fee_rate >= Decimal::ONE_HUNDRED {
            return invalid("fee_rate", "fees must stay below the principal");
        }
        Ok(())
    }

    /// Checks a requested principal and term against the product bounds.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::OutOfRange` for the first field out of bounds.
    pub fn check_request(&self, amount: Decimal, term_months: i32) -> RuleResult<()> {
        if amount < self.min_amount || amount > self.max_amount {
            return Err(RuleError::OutOfRange {
                field: "amount",
                value: amount.to_string(),
                min: self.min_amount.to_string(),
                max: self.max_amount.to_string(),
            });
        }
        if term_months < self.min_term_months || term_months > self.max_term_months {
            return Err(RuleError::OutOfRange {
                field: "term_months",
                value: term_months.to_string(),
                min: self.min_term_months.to_string(),
                max: self.max_term_months.to_string(),
            });
        }
        Ok(())
    }

    /// Checks bounds, then prices the request.
    pub fn quote(&self, amount: Decimal, term_months: i32) -> RuleResult<LoanQuote> {
        self.check_request(amount, term_months)?;
        price(
            amount,
            term_months,
            self.interest_rate,
            self.interest_method,
            self.processing_fee_rate,
            self.insurance_fee_rate,
        )
    }
}

/// Prices a loan.
///
/// # Errors
///
/// Returns an error for a non-positive principal or term, or on overflow.
pub fn price(
    principal: Decimal,
    term_months: i32,
    annual_rate: Decimal,
    method: InterestMethod,
    processing_fee_rate: Decimal,
    insurance_fee_rate: Decimal,
) -> RuleResult<LoanQuote> {
    require_positive(principal)?;
    if term_months < 1 {
        return Err(RuleError::InvalidTerms {
            field: "term_months",
            reason: "must be at least one month".to_string(),
        });
    }

    let interest_amount = match method {
        InterestMethod::Flat => flat_interest(principal, annual_rate, term_months)?,
        InterestMethod::ReducingBalance => {
            reducing_balance_interest(principal, annual_rate, term_months)?
        }
    };
    let total_amount = principal + interest_amount;
    let monthly_installment = ceil_money(total_amount / Decimal::from(term_months));

    Ok(LoanQuote {
        principal,
        interest_amount,
        processing_fee: round_money(percent_of(principal, processing_fee_rate)),
        insurance_fee: round_money(percent_of(principal, insurance_fee_rate)),
        total_amount,
        monthly_installment,
        term_months,
    })
}

fn flat_interest(principal: Decimal, annual_rate: Decimal, term_months: i32) -> RuleResult<Decimal> {
    let yearly = percent_of(principal, annual_rate);
    let interest = yearly
        .checked_mul(Decimal::from(term_months))
        .ok_or(RuleError::Overflow("flat interest"))?
        / MONTHS_PER_YEAR;
    Ok(round_money(interest))
}

fn reducing_balance_interest(
    principal: Decimal,
    annual_rate: Decimal,
    term_months: i32,
) -> RuleResult<Decimal> {
    if annual_rate.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let payment = annuity_payment(principal, annual_rate, term_months)?;
    let paid = payment
        .checked_mul(Decimal::from(term_months))
        .ok_or(RuleError::Overflow("annuity total"))?;
    Ok(round_money(paid - principal))
}

/// Unrounded annuity payment for a reducing-balance loan.
pub(crate) fn annuity_payment(
    principal: Decimal,
    annual_rate: Decimal,
    term_months: i32,
) -> RuleResult<Decimal> {
    let n = Decimal::from(term_months);
    if annual_rate.is_zero() {
        return Ok(principal / n);
    }
    let i = monthly_rate(annual_rate);
    let mut factor = Decimal::ONE;
    for _ in 0..term_months {
        factor = factor
            .checked_mul(Decimal::ONE + i)
            .ok_or(RuleError::Overflow("annuity factor"))?;
    }
    let numerator = principal
        .checked_mul(i)
        .and_then(|v| v.checked_mul(factor))
        .ok_or(RuleError::Overflow("annuity payment"))?;
    numerator
        .checked_div(factor - Decimal::ONE)
        .ok_or(RuleError::Overflow("annuity payment"))
}

/// Monthly rate as a fraction from an annual percent.
pub(crate) fn monthly_rate(annual_rate: Decimal) -> Decimal {
    annual_rate / PERCENT_PER_MONTH_DIVISOR
}

fn ceil_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToPositiveInfinity)
}
