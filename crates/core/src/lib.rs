//! Core business rules for the SACCO ledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Every rule the services enforce is computed here so it can be tested without
//! a database.
//!
//! # Modules
//!
//! - `account` - Balance movements, interest accrual, statements and chain checks
//! - `loan` - Pricing, amortization schedules, eligibility, repayment and default rules
//! - `membership` - Membership eligibility, enrollment tiering and member numbers
//! - `audit` - Actor and audit vocabulary
//! - `clock` / `reference` - Ports for time and random references

pub mod account;
pub mod audit;
pub mod clock;
pub mod error;
pub mod loan;
pub mod membership;
pub mod reference;

pub use audit::{Actor, AuditAction, AuditEvent, AuditSubject};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{RuleError, RuleResult};
pub use reference::{RandomReferenceGenerator, ReferenceGenerator};
