//! SACCO services.
//!
//! Every mutating operation runs inside one database transaction:
//! begin, lock rows in the global order (members by ascending id, then
//! accounts by ascending id, then loans), mutate, write the audit row,
//! commit. Any error drops the transaction and rolls everything back.

pub mod account;
pub mod ledger;
pub mod loan;
pub mod membership;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sacco_core::{Clock, RandomReferenceGenerator, ReferenceGenerator, SystemClock};
use sacco_shared::SaccoConfig;
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction, TransactionTrait,
};
use serde_json::Value;

use crate::error::SaccoResult;

pub use account::{AccountService, AccountStatement, OpenAccountOptions, TransferReceipt};
pub use loan::{
    Disbursement, LoanApplication, LoanProductStats, LoanService, LoanSummary, NewLoanProduct,
    Repayment,
};
pub use membership::{
    AutoEnrollment, MemberStats, MembershipService, MembershipSummary, Registration,
    TotalsReconciliation,
};

/// Dependencies shared by every service.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
    references: Arc<dyn ReferenceGenerator>,
    config: Arc<SaccoConfig>,
}

impl ServiceContext {
    /// Creates a context on the wall clock with random references.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: SaccoConfig) -> Self {
        Self {
            db,
            clock: Arc::new(SystemClock),
            references: Arc::new(RandomReferenceGenerator),
            config: Arc::new(config),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the reference generator.
    #[must_use]
    pub fn with_references(mut self, references: Arc<dyn ReferenceGenerator>) -> Self {
        self.references = references;
        self
    }

    /// Database connection.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &SaccoConfig {
        &self.config
    }

    /// Current instant according to the configured clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn references(&self) -> &dyn ReferenceGenerator {
        self.references.as_ref()
    }

    /// Opens a transaction with the configured lock timeout.
    pub(crate) async fn begin(&self) -> SaccoResult<DatabaseTransaction> {
        let txn = self.db.begin().await?;
        if txn.get_database_backend() == DatabaseBackend::Postgres {
            let timeout = self.config.database.lock_timeout_ms;
            txn.execute_unprepared(&format!("SET LOCAL lock_timeout = '{timeout}ms'"))
                .await?;
        }
        Ok(txn)
    }
}

/// Free-form details attached to a ledger entry.
#[derive(Debug, Clone, Default)]
pub struct EntryMetadata {
    /// Human readable description.
    pub description: Option<String>,
    /// Arbitrary JSON, e.g. a payment gateway receipt.
    pub metadata: Option<Value>,
}

impl EntryMetadata {
    /// Metadata with only a description.
    #[must_use]
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            metadata: None,
        }
    }
}
