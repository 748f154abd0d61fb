//! Account statement arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::EntryDirection;

/// Credit/debit totals over a statement window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementTotals {
    /// Balance before the first entry of the window.
    pub opening_balance: Decimal,
    /// Sum of credit entries in the window.
    pub total_credits: Decimal,
    /// Sum of debit entries in the window.
    pub total_debits: Decimal,
    /// `opening + credits - debits`.
    pub closing_balance: Decimal,
    /// Number of entries in the window.
    pub entry_count: usize,
}

impl StatementTotals {
    /// Creates empty totals starting at `opening_balance`.
    #[must_use]
    pub fn opening(opening_balance: Decimal) -> Self {
        Self {
            opening_balance,
            total_credits: Decimal::ZERO,
            total_debits: Decimal::ZERO,
            closing_balance: opening_balance,
            entry_count: 0,
        }
    }

    /// Adds one entry.
    pub fn push(&mut self, direction: EntryDirection, amount: Decimal) {
        match direction {
            EntryDirection::Credit => self.total_credits += amount,
            EntryDirection::Debit => self.total_debits += amount,
        }
        self.closing_balance += direction.signed(amount);
        self.entry_count += 1;
    }

    /// Builds totals from an opening balance and the window's entries.
    pub fn from_entries<I>(opening_balance: Decimal, entries: I) -> Self
    where
        I: IntoIterator<Item = (EntryDirection, Decimal)>,
    {
        let mut totals = Self::opening(opening_balance);
        for (direction, amount) in entries {
            totals.push(direction, amount);
        }
        totals
    }
}
