//! Core SACCO schema.
//!
//! Creates members, accounts, the transaction ledger, loan products, loans,
//! the audit log and the per-year member sequence table.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DbBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();

        // ============================================================
        // MEMBERS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(SaccoMembers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SaccoMembers::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SaccoMembers::UserId).uuid().not_null().unique_key())
                    .col(
                        ColumnDef::new(SaccoMembers::MemberNumber)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SaccoMembers::MembershipType).string_len(16).not_null())
                    .col(ColumnDef::new(SaccoMembers::Status).string_len(32).not_null())
                    .col(money(SaccoMembers::TotalSavings, backend))
                    .col(money(SaccoMembers::TotalShares, backend))
                    .col(money(SaccoMembers::TotalLoans, backend))
                    .col(ColumnDef::new(SaccoMembers::JoinedDate).date().not_null())
                    .col(ColumnDef::new(SaccoMembers::ApprovedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SaccoMembers::ApprovedBy).uuid())
                    .col(ColumnDef::new(SaccoMembers::SuspendedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SaccoMembers::SuspensionReason).text())
                    .col(timestamp(SaccoMembers::CreatedAt))
                    .col(timestamp(SaccoMembers::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // ACCOUNTS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(SaccoAccounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SaccoAccounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SaccoAccounts::MemberId).uuid().not_null())
                    .col(
                        ColumnDef::new(SaccoAccounts::AccountNumber)
                            .string_len(40)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SaccoAccounts::AccountType).string_len(16).not_null())
                    .col(money(SaccoAccounts::Balance, backend))
                    .col(money(SaccoAccounts::AvailableBalance, backend))
                    .col(rate(SaccoAccounts::InterestRate))
                    .col(ColumnDef::new(SaccoAccounts::Status).string_len(16).not_null())
                    .col(ColumnDef::new(SaccoAccounts::LastEntrySeq).big_integer().not_null())
                    .col(timestamp(SaccoAccounts::OpenedAt))
                    .col(ColumnDef::new(SaccoAccounts::ClosedAt).timestamp_with_time_zone())
                    .col(timestamp(SaccoAccounts::CreatedAt))
                    .col(timestamp(SaccoAccounts::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sacco_accounts_member")
                            .from(SaccoAccounts::Table, SaccoAccounts::MemberId)
                            .to(SaccoMembers::Table, SaccoMembers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_sacco_accounts_member_type")
                    .table(SaccoAccounts::Table)
                    .col(SaccoAccounts::MemberId)
                    .col(SaccoAccounts::AccountType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // TRANSACTIONS (immutable ledger)
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(SaccoTransactions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SaccoTransactions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SaccoTransactions::AccountId).uuid().not_null())
                    .col(ColumnDef::new(SaccoTransactions::MemberId).uuid().not_null())
                    .col(
                        ColumnDef::new(SaccoTransactions::TransactionType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SaccoTransactions::Direction).string_len(8).not_null())
                    .col(money(SaccoTransactions::Amount, backend))
                    .col(money(SaccoTransactions::BalanceBefore, backend))
                    .col(money(SaccoTransactions::BalanceAfter, backend))
                    .col(ColumnDef::new(SaccoTransactions::EntrySeq).big_integer().not_null())
                    .col(ColumnDef::new(SaccoTransactions::TransactionReference).string_len(32))
                    .col(ColumnDef::new(SaccoTransactions::Description).text())
                    .col(ColumnDef::new(SaccoTransactions::Metadata).json_binary())
                    .col(ColumnDef::new(SaccoTransactions::ProcessedBy).uuid())
                    .col(timestamp(SaccoTransactions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sacco_transactions_account")
                            .from(SaccoTransactions::Table, SaccoTransactions::AccountId)
                            .to(SaccoAccounts::Table, SaccoAccounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sacco_transactions_member")
                            .from(SaccoTransactions::Table, SaccoTransactions::MemberId)
                            .to(SaccoMembers::Table, SaccoMembers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_sacco_transactions_account_seq")
                    .table(SaccoTransactions::Table)
                    .col(SaccoTransactions::AccountId)
                    .col(SaccoTransactions::EntrySeq)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sacco_transactions_reference")
                    .table(SaccoTransactions::Table)
                    .col(SaccoTransactions::TransactionReference)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // LOAN PRODUCTS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(SaccoLoanProducts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SaccoLoanProducts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SaccoLoanProducts::Name).string_len(100).not_null())
                    .col(ColumnDef::new(SaccoLoanProducts::Description).text())
                    .col(money(SaccoLoanProducts::MinAmount, backend))
                    .col(money(SaccoLoanProducts::MaxAmount, backend))
                    .col(ColumnDef::new(SaccoLoanProducts::MinTermMonths).integer().not_null())
                    .col(ColumnDef::new(SaccoLoanProducts::MaxTermMonths).integer().not_null())
                    .col(rate(SaccoLoanProducts::InterestRate))
                    .col(
                        ColumnDef::new(SaccoLoanProducts::InterestMethod)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(rate(SaccoLoanProducts::ProcessingFeeRate))
                    .col(rate(SaccoLoanProducts::InsuranceFeeRate))
                    .col(ColumnDef::new(SaccoLoanProducts::IsActive).boolean().not_null())
                    .col(timestamp(SaccoLoanProducts::CreatedAt))
                    .col(timestamp(SaccoLoanProducts::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // LOANS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(SaccoLoans::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SaccoLoans::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(SaccoLoans::LoanNumber)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SaccoLoans::MemberId).uuid().not_null())
                    .col(ColumnDef::new(SaccoLoans::LoanProductId).uuid().not_null())
                    .col(money(SaccoLoans::PrincipalAmount, backend))
                    .col(money(SaccoLoans::InterestAmount, backend))
                    .col(money(SaccoLoans::TotalAmount, backend))
                    .col(money(SaccoLoans::ProcessingFee, backend))
                    .col(money(SaccoLoans::InsuranceFee, backend))
                    .col(money(SaccoLoans::Balance, backend))
                    .col(money(SaccoLoans::AmountPaid, backend))
                    .col(ColumnDef::new(SaccoLoans::TermMonths).integer().not_null())
                    .col(money(SaccoLoans::MonthlyInstallment, backend))
                    .col(ColumnDef::new(SaccoLoans::InstallmentsRemaining).integer().not_null())
                    .col(rate(SaccoLoans::InterestRate))
                    .col(ColumnDef::new(SaccoLoans::InterestMethod).string_len(32).not_null())
                    .col(ColumnDef::new(SaccoLoans::Purpose).text())
                    .col(ColumnDef::new(SaccoLoans::Guarantors).json_binary().not_null())
                    .col(ColumnDef::new(SaccoLoans::Status).string_len(32).not_null())
                    .col(timestamp(SaccoLoans::AppliedAt))
                    .col(ColumnDef::new(SaccoLoans::ApprovedDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(SaccoLoans::ApprovedBy).uuid())
                    .col(ColumnDef::new(SaccoLoans::RejectedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SaccoLoans::RejectedBy).uuid())
                    .col(ColumnDef::new(SaccoLoans::RejectionReason).text())
                    .col(ColumnDef::new(SaccoLoans::DisbursedDate).date())
                    .col(ColumnDef::new(SaccoLoans::DisbursedBy).uuid())
                    .col(ColumnDef::new(SaccoLoans::DueDate).date())
                    .col(ColumnDef::new(SaccoLoans::MaturityDate).date())
                    .col(ColumnDef::new(SaccoLoans::LastPaymentAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SaccoLoans::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SaccoLoans::DefaultedAt).timestamp_with_time_zone())
                    .col(timestamp(SaccoLoans::CreatedAt))
                    .col(timestamp(SaccoLoans::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sacco_loans_member")
                            .from(SaccoLoans::Table, SaccoLoans::MemberId)
                            .to(SaccoMembers::Table, SaccoMembers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sacco_loans_product")
                            .from(SaccoLoans::Table, SaccoLoans::LoanProductId)
                            .to(SaccoLoanProducts::Table, SaccoLoanProducts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sacco_loans_member_status")
                    .table(SaccoLoans::Table)
                    .col(SaccoLoans::MemberId)
                    .col(SaccoLoans::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sacco_loans_status_due")
                    .table(SaccoLoans::Table)
                    .col(SaccoLoans::Status)
                    .col(SaccoLoans::DueDate)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // AUDIT LOG (append-only)
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(SaccoAuditLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SaccoAuditLogs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SaccoAuditLogs::Action).string_len(64).not_null())
                    .col(ColumnDef::new(SaccoAuditLogs::SubjectType).string_len(32).not_null())
                    .col(ColumnDef::new(SaccoAuditLogs::SubjectId).uuid().not_null())
                    .col(ColumnDef::new(SaccoAuditLogs::OldValues).json_binary())
                    .col(ColumnDef::new(SaccoAuditLogs::NewValues).json_binary())
                    .col(ColumnDef::new(SaccoAuditLogs::ActorId).uuid())
                    .col(timestamp(SaccoAuditLogs::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sacco_audit_logs_subject")
                    .table(SaccoAuditLogs::Table)
                    .col(SaccoAuditLogs::SubjectType)
                    .col(SaccoAuditLogs::SubjectId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // MEMBER NUMBER SEQUENCES
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(SaccoMemberSequences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SaccoMemberSequences::Year)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SaccoMemberSequences::LastValue)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SaccoMemberSequences::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaccoAuditLogs::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaccoLoans::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaccoLoanProducts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaccoTransactions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaccoAccounts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaccoMembers::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

/// Monetary column: `DECIMAL(20, 2) NOT NULL`.
///
/// SQLite's schema builder caps decimal precision at 16 digits.
fn money<T: IntoIden>(name: T, backend: DbBackend) -> ColumnDef {
    let precision = if backend == DbBackend::Sqlite { 16 } else { 20 };
    ColumnDef::new(name).decimal_len(precision, 2).not_null().to_owned()
}

/// Percentage column: `DECIMAL(9, 4) NOT NULL`.
fn rate<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).decimal_len(9, 4).not_null().to_owned()
}

fn timestamp<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

#[derive(DeriveIden)]
enum SaccoMembers {
    Table,
    Id,
    UserId,
    MemberNumber,
    MembershipType,
    Status,
    TotalSavings,
    TotalShares,
    TotalLoans,
    JoinedDate,
    ApprovedAt,
    ApprovedBy,
    SuspendedAt,
    SuspensionReason,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SaccoAccounts {
    Table,
    Id,
    MemberId,
    AccountNumber,
    AccountType,
    Balance,
    AvailableBalance,
    InterestRate,
    Status,
    LastEntrySeq,
    OpenedAt,
    ClosedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SaccoTransactions {
    Table,
    Id,
    AccountId,
    MemberId,
    TransactionType,
    Direction,
    Amount,
    BalanceBefore,
    BalanceAfter,
    EntrySeq,
    TransactionReference,
    Description,
    Metadata,
    ProcessedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SaccoLoanProducts {
    Table,
    Id,
    Name,
    Description,
    MinAmount,
    MaxAmount,
    MinTermMonths,
    MaxTermMonths,
    InterestRate,
    InterestMethod,
    ProcessingFeeRate,
    InsuranceFeeRate,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SaccoLoans {
    Table,
    Id,
    LoanNumber,
    MemberId,
    LoanProductId,
    PrincipalAmount,
    InterestAmount,
    TotalAmount,
    ProcessingFee,
    InsuranceFee,
    Balance,
    AmountPaid,
    TermMonths,
    MonthlyInstallment,
    InstallmentsRemaining,
    InterestRate,
    InterestMethod,
    Purpose,
    Guarantors,
    Status,
    AppliedAt,
    ApprovedDate,
    ApprovedBy,
    RejectedAt,
    RejectedBy,
    RejectionReason,
    DisbursedDate,
    DisbursedBy,
    DueDate,
    MaturityDate,
    LastPaymentAt,
    CompletedAt,
    DefaultedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SaccoAuditLogs {
    Table,
    Id,
    Action,
    SubjectType,
    SubjectId,
    OldValues,
    NewValues,
    ActorId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SaccoMemberSequences {
    Table,
    Year,
    LastValue,
}
