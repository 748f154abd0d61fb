//! Account balance rules.
//!
//! This module implements the arithmetic behind every ledger entry:
//! - Credit/debit movements on `balance` and `available_balance`
//! - The withdrawal capability predicate
//! - Monthly interest accrual
//! - Statement totals
//! - Transaction chain verification

pub mod balance;
pub mod chain;
pub mod interest;
pub mod statement;

#[cfg(test)]
mod balance_props;

pub use balance::{Balances, EntryDirection, Movement};
pub use chain::{ChainBreak, ChainLink, LedgerCheck, verify_chain};
pub use interest::monthly_interest;
pub use statement::StatementTotals;
