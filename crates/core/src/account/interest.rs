//! Monthly interest accrual.

use rust_decimal::Decimal;
use sacco_shared::{percent_of, round_money};

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Interest earned in one month on `balance` at `annual_rate` percent.
///
/// Rounded to cents, half to even. A zero or negative result means nothing
/// is credited.
#[must_use]
pub fn monthly_interest(balance: Decimal, annual_rate: Decimal) -> Decimal {
    if balance <= Decimal::ZERO || annual_rate <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_money(percent_of(balance, annual_rate) / MONTHS_PER_YEAR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(12000), dec!(5), dec!(50.00))]
    #[case(dec!(1000), dec!(4), dec!(3.33))]
    #[case(dec!(0.10), dec!(4), dec!(0.00))]
    #[case(dec!(1000), dec!(0), dec!(0))]
    #[case(dec!(0), dec!(6), dec!(0))]
    #[case(dec!(-50), dec!(6), dec!(0))]
    fn test_monthly_interest(
        #[case] balance: Decimal,
        #[case] rate: Decimal,
        #[case] expected: Decimal,
    ) {
        assert_eq!(monthly_interest(balance, rate), expected);
    }

    #[test]
    fn test_half_cent_rounds_to_even() {
        // 3 * 1 / 100 / 12 = 0.0025 -> 0.00; 0.015 -> 0.02
        assert_eq!(monthly_interest(dec!(3), dec!(1)), dec!(0.00));
        assert_eq!(monthly_interest(dec!(18), dec!(1)), dec!(0.02));
    }
}
