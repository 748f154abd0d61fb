//! Database-level guards for the ledger (PostgreSQL only).
//!
//! Adds balance CHECK constraints and triggers that reject UPDATE and DELETE
//! on `sacco_transactions` and `sacco_audit_logs`. SQLite has no
//! `ALTER TABLE ... ADD CONSTRAINT`, so on other backends the services are
//! the only guard.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DbBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.get_database_backend() != DbBackend::Postgres {
            return Ok(());
        }
        let db = manager.get_connection();
        db.execute_unprepared(CHECKS_SQL).await?;
        db.execute_unprepared(APPEND_ONLY_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.get_database_backend() != DbBackend::Postgres {
            return Ok(());
        }
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const CHECKS_SQL: &str = r"
ALTER TABLE sacco_accounts
    ADD CONSTRAINT chk_sacco_accounts_available_non_negative CHECK (available_balance >= 0),
    ADD CONSTRAINT chk_sacco_accounts_available_le_balance CHECK (available_balance <= balance);

ALTER TABLE sacco_transactions
    ADD CONSTRAINT chk_sacco_transactions_amount_positive CHECK (amount > 0),
    ADD CONSTRAINT chk_sacco_transactions_direction CHECK (
        (direction = 'credit' AND balance_after = balance_before + amount)
        OR (direction = 'debit' AND balance_after = balance_before - amount)
    );

ALTER TABLE sacco_loans
    ADD CONSTRAINT chk_sacco_loans_balance_non_negative CHECK (balance >= 0);
";

const APPEND_ONLY_SQL: &str = r"
-- Ledger rows and audit rows are immutable once written
CREATE OR REPLACE FUNCTION sacco_reject_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION '% is append-only', TG_TABLE_NAME;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_sacco_transactions_append_only
    BEFORE UPDATE OR DELETE ON sacco_transactions
    FOR EACH ROW EXECUTE FUNCTION sacco_reject_mutation();

CREATE TRIGGER trg_sacco_audit_logs_append_only
    BEFORE UPDATE OR DELETE ON sacco_audit_logs
    FOR EACH ROW EXECUTE FUNCTION sacco_reject_mutation();
";

const DROP_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_sacco_audit_logs_append_only ON sacco_audit_logs;
DROP TRIGGER IF EXISTS trg_sacco_transactions_append_only ON sacco_transactions;
DROP FUNCTION IF EXISTS sacco_reject_mutation();

ALTER TABLE sacco_loans DROP CONSTRAINT IF EXISTS chk_sacco_loans_balance_non_negative;
ALTER TABLE sacco_transactions
    DROP CONSTRAINT IF EXISTS chk_sacco_transactions_direction,
    DROP CONSTRAINT IF EXISTS chk_sacco_transactions_amount_positive;
ALTER TABLE sacco_accounts
    DROP CONSTRAINT IF EXISTS chk_sacco_accounts_available_le_balance,
    DROP CONSTRAINT IF EXISTS chk_sacco_accounts_available_non_negative;
";
