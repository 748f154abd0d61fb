//! Shared configuration and money helpers for the SACCO ledger.
//!
//! This crate provides common pieces used across all other crates:
//! - Layered configuration (`SaccoConfig`)
//! - Decimal rounding helpers for monetary amounts

pub mod config;
pub mod money;

pub use config::SaccoConfig;
pub use money::{MONEY_SCALE, percent_of, round_money};
