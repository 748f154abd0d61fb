//! Property-based tests for balance movements.
//!
//! - Credits and withdrawals keep `0 <= available <= balance`
//! - Every accepted sequence of entries forms a valid chain

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::{Balances, EntryDirection};
use super::chain::{ChainLink, verify_chain};

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn operation() -> impl Strategy<Value = (bool, Decimal)> {
    (any::<bool>(), positive_amount())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_balances_stay_consistent(ops in prop::collection::vec(operation(), 1..60)) {
        let mut balances = Balances::default();
        for (is_credit, amount) in ops {
            let result = if is_credit {
                balances.credit(amount)
            } else {
                balances.withdraw(amount)
            };
            match result {
                Ok(movement) => balances = movement.after,
                Err(_) => prop_assert!(!is_credit && !balances.can_withdraw(amount)),
            }
            prop_assert!(balances.is_consistent());
            prop_assert!(balances.balance >= Decimal::ZERO);
        }
    }

    #[test]
    fn prop_accepted_entries_form_valid_chain(ops in prop::collection::vec(operation(), 1..60)) {
        let mut balances = Balances::default();
        let mut links = Vec::new();
        for (is_credit, amount) in ops {
            let direction = if is_credit { EntryDirection::Credit } else { EntryDirection::Debit };
            let result = if is_credit { balances.credit(amount) } else { balances.withdraw(amount) };
            if let Ok(movement) = result {
                let seq = i64::try_from(links.len()).unwrap() + 1;
                links.push(ChainLink {
                    entry_seq: seq,
                    direction,
                    amount,
                    balance_before: movement.before.balance,
                    balance_after: movement.after.balance,
                });
                balances = movement.after;
            }
        }
        let check = verify_chain(&links, balances.balance);
        prop_assert!(check.is_consistent(), "{:?}", check.breaks);
    }
}
