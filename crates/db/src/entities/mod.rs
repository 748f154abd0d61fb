//! `SeaORM` entity definitions for the SACCO tables.

pub mod prelude;

pub mod accounts;
pub mod audit_logs;
pub mod loan_products;
pub mod loans;
pub mod member_sequences;
pub mod members;
pub mod sea_orm_active_enums;
pub mod transactions;
