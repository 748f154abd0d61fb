//! Balance movements.
//!
//! `balance` is the booked amount. `available_balance` is the part free to
//! withdraw and never exceeds `balance`. Both stay non-negative.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{RuleError, RuleResult, require_positive};

/// Side of a ledger entry, seen from the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    /// Money in: `balance_after = balance_before + amount`.
    Credit,
    /// Money out: `balance_after = balance_before - amount`.
    Debit,
}

impl EntryDirection {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    /// Returns the signed effect of `amount` in this direction.
    #[must_use]
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Self::Credit => amount,
            Self::Debit => -amount,
        }
    }
}

impl fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Before/after pair produced by one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    /// Balances before the entry.
    pub before: Balances,
    /// Balances after the entry.
    pub after: Balances,
}

/// The two balances an account carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balances {
    /// Booked balance.
    pub balance: Decimal,
    /// Portion of `balance` free to withdraw.
    pub available_balance: Decimal,
}

impl Balances {
    /// Creates a balance pair.
    #[must_use]
    pub fn new(balance: Decimal, available_balance: Decimal) -> Self {
        Self {
            balance,
            available_balance,
        }
    }

    /// Returns true if both invariants hold: `0 <= available <= balance`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.available_balance >= Decimal::ZERO && self.available_balance <= self.balance
    }

    /// Returns true if a discretionary withdrawal of `amount` may proceed.
    #[must_use]
    pub fn can_withdraw(&self, amount: Decimal) -> bool {
        amount > Decimal::ZERO && self.available_balance >= amount
    }

    /// Applies a credit to both balances.
    pub fn credit(self, amount: Decimal) -> RuleResult<Movement> {
        require_positive(amount)?;
        let after = Self {
            balance: self
                .balance
                .checked_add(amount)
                .ok_or(RuleError::Overflow("balance"))?,
            available_balance: self
                .available_balance
                .checked_add(amount)
                .ok_or(RuleError::Overflow("available balance"))?,
        };
        Ok(Movement { before: self, after })
    }

    /// Applies a discretionary withdrawal, gated on [`Self::can_withdraw`].
    pub fn withdraw(self, amount: Decimal) -> RuleResult<Movement> {
        require_positive(amount)?;
        if !self.can_withdraw(amount) {
            return Err(RuleError::Overdraw {
                balance: self.available_balance,
                amount,
            });
        }
        self.debit(amount)
    }

    /// Applies a system debit (fees, same-operation deductions).
    ///
    /// Skips the availability check but still refuses to take `balance`
    /// below zero. Held funds absorb the part of `amount` that exceeds
    /// `available_balance`.
    pub fn debit(self, amount: Decimal) -> RuleResult<Movement> {
        require_positive(amount)?;
        if amount > self.balance {
            return Err(RuleError::Overdraw {
                balance: self.balance,
                amount,
            });
        }
        let balance = self.balance - amount;
        let available_balance = (self.available_balance - amount)
            .max(Decimal::ZERO)
            .min(balance);
        Ok(Movement {
            before: self,
            after: Self {
                balance,
                available_balance,
            },
        })
    }
}
