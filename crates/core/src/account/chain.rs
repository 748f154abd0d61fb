//! Transaction chain verification.
//!
//! Entries on one account are totally ordered by `entry_seq`. A healthy chain
//! satisfies, for every entry `i`:
//! - `entry_seq[i] == i + 1`
//! - `balance_after[i] == balance_before[i] ± amount[i]`
//! - `balance_after[i] == balance_before[i + 1]`
//!
//! and the last `balance_after` equals the balance stored on the account.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::EntryDirection;

/// The fields of one ledger entry the chain check reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLink {
    /// Position of the entry in the account's sequence (1-based).
    pub entry_seq: i64,
    /// Credit or debit.
    pub direction: EntryDirection,
    /// Entry amount.
    pub amount: Decimal,
    /// Balance before the entry.
    pub balance_before: Decimal,
    /// Balance after the entry.
    pub balance_after: Decimal,
}

/// One detected inconsistency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainBreak {
    /// A sequence number is missing or repeated.
    SequenceGap {
        /// Expected sequence number.
        expected: i64,
        /// Sequence number found.
        found: i64,
    },
    /// `balance_before` does not continue from the previous entry.
    Discontinuity {
        /// Sequence number of the entry.
        entry_seq: i64,
        /// `balance_after` of the previous entry.
        expected_before: Decimal,
        /// `balance_before` recorded on this entry.
        found_before: Decimal,
    },
    /// `balance_after` does not follow from `balance_before` and the amount.
    Arithmetic {
        /// Sequence number of the entry.
        entry_seq: i64,
        /// Computed `balance_after`.
        expected_after: Decimal,
        /// Recorded `balance_after`.
        found_after: Decimal,
    },
    /// Last `balance_after` differs from the stored account balance.
    StoredBalanceMismatch {
        /// Balance implied by the chain.
        ledger_balance: Decimal,
        /// Balance stored on the account.
        stored_balance: Decimal,
    },
}

/// Result of verifying an account's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCheck {
    /// Number of entries inspected.
    pub entries: usize,
    /// Balance implied by the last entry (zero when there are none).
    pub ledger_balance: Decimal,
    /// Balance stored on the account.
    pub stored_balance: Decimal,
    /// Every inconsistency found, in chain order.
    pub breaks: Vec<ChainBreak>,
}

impl LedgerCheck {
    /// Returns true if no inconsistency was found.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.breaks.is_empty()
    }
}

/// Verifies `links`, which must already be sorted by `entry_seq`.
#[must_use]
pub fn verify_chain(links: &[ChainLink], stored_balance: Decimal) -> LedgerCheck {
    let mut breaks = Vec::new();
    let mut previous_after = Decimal::ZERO;
    let mut expected_seq = 1_i64;

    for link in links {
        if link.entry_seq != expected_seq {
            breaks.push(ChainBreak::SequenceGap {
                expected: expected_seq,
                found: link.entry_seq,
            });
        }
        if link.balance_before != previous_after {
            breaks.push(ChainBreak::Discontinuity {
                entry_seq: link.entry_seq,
                expected_before: previous_after,
                found_before: link.balance_before,
            });
        }
        let expected_after = link.balance_before + link.direction.signed(link.amount);
        if link.balance_after != expected_after {
            breaks.push(ChainBreak::Arithmetic {
                entry_seq: link.entry_seq,
                expected_after,
                found_after: link.balance_after,
            });
        }
        previous_after = link.balance_after;
        expected_seq = link.entry_seq + 1;
    }

    if previous_after != stored_balance {
        breaks.push(ChainBreak::StoredBalanceMismatch {
            ledger_balance: previous_after,
            stored_balance,
        });
    }

    LedgerCheck {
        entries: links.len(),
        ledger_balance: previous_after,
        stored_balance,
        breaks,
    }
}
