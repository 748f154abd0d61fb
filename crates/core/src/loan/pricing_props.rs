//! Property-based tests for pricing and schedules.
//!
//! - Installments cover the total and the schedule sums exactly
//! - Reducing-balance interest never exceeds flat interest at the same rate

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::pricing::{InterestMethod, price};
use super::repayment::{RepaymentState, apply_repayment};
use super::schedule::{ScheduleInput, build_schedule};

/// Strategy to generate principals (100.00 to 1,000,000.00).
fn principal() -> impl Strategy<Value = Decimal> {
    (10_000i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate annual rates (0.00% to 36.00%).
fn rate() -> impl Strategy<Value = Decimal> {
    (0i64..3_600i64).prop_map(|bp| Decimal::new(bp, 2))
}

fn method() -> impl Strategy<Value = InterestMethod> {
    prop_oneof![Just(InterestMethod::Flat), Just(InterestMethod::ReducingBalance)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_installments_cover_total(p in principal(), n in 1i32..=60, r in rate(), m in method()) {
        let quote = price(p, n, r, m, Decimal::ZERO, Decimal::ZERO).unwrap();
        prop_assert_eq!(quote.total_amount, p + quote.interest_amount);
        prop_assert!(quote.interest_amount >= Decimal::ZERO);
        prop_assert!(quote.monthly_installment * Decimal::from(n) >= quote.total_amount);
    }

    #[test]
    fn prop_schedule_sums_exactly(p in principal(), n in 1i32..=60, r in rate(), m in method()) {
        let quote = price(p, n, r, m, Decimal::ZERO, Decimal::ZERO).unwrap();
        let rows = build_schedule(&ScheduleInput {
            principal: p,
            total_amount: quote.total_amount,
            monthly_installment: quote.monthly_installment,
            term_months: n,
            annual_rate: r,
            interest_method: m,
            first_due_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        }).unwrap();

        prop_assert_eq!(rows.len(), usize::try_from(n).unwrap());
        let paid: Decimal = rows.iter().map(|row| row.payment).sum();
        let principal_paid: Decimal = rows.iter().map(|row| row.principal).sum();
        prop_assert_eq!(paid, quote.total_amount);
        prop_assert_eq!(principal_paid, p);
        prop_assert_eq!(rows.last().unwrap().remaining_balance, Decimal::ZERO);
        prop_assert!(rows.windows(2).all(|w| w[0].due_date < w[1].due_date));
    }

    #[test]
    fn prop_reducing_balance_is_cheaper(p in principal(), n in 2i32..=60, r in 1i64..3_600i64) {
        let r = Decimal::new(r, 2);
        let flat = price(p, n, r, InterestMethod::Flat, Decimal::ZERO, Decimal::ZERO).unwrap();
        let reducing = price(p, n, r, InterestMethod::ReducingBalance, Decimal::ZERO, Decimal::ZERO).unwrap();
        prop_assert!(reducing.interest_amount <= flat.interest_amount);
    }

    #[test]
    fn prop_paying_installments_completes_loan(p in principal(), n in 1i32..=36, r in rate(), m in method()) {
        let quote = price(p, n, r, m, Decimal::ZERO, Decimal::ZERO).unwrap();
        let mut state = RepaymentState {
            balance: quote.total_amount,
            amount_paid: Decimal::ZERO,
            monthly_installment: quote.monthly_installment,
        };
        let mut payments = 0;
        while !state.balance.is_zero() {
            let outcome = apply_repayment(state, quote.monthly_installment).unwrap();
            prop_assert!(outcome.balance >= Decimal::ZERO);
            state.balance = outcome.balance;
            state.amount_paid = outcome.amount_paid;
            payments += 1;
        }
        prop_assert_eq!(payments, n);
        prop_assert_eq!(state.amount_paid, quote.total_amount);
    }
}
