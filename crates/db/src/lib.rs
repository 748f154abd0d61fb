//! Database layer for the SACCO ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions and migrations
//! - Repositories for data access
//! - The account, loan and membership services, which run every mutation
//!   in a single locked database transaction

pub mod entities;
pub mod error;
pub mod migration;
pub mod repositories;
pub mod services;

pub use error::{SaccoError, SaccoResult};
pub use repositories::{
    AccountRepository, AuditLogRepository, LoanRepository, MemberRepository,
    TransactionRepository,
};
pub use services::{
    AccountService, EntryMetadata, LoanService, MembershipService, ServiceContext,
};

use std::time::Duration;

use sacco_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection sized from configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with_config(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_millis(config.lock_timeout_ms))
        .sqlx_logging(false);
    Database::connect(options).await
}
