//! Account service: deposits, withdrawals, transfers, interest and account
//! status changes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sacco_core::account::{
    ChainLink, EntryDirection, LedgerCheck, StatementTotals, monthly_interest, verify_chain,
};
use sacco_core::{Actor, AuditAction, AuditEvent, AuditSubject};
use sea_orm::DatabaseTransaction;
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::ledger::{
    EntryRequest, Posted, create_account, default_rate, post_entry, require_active,
    require_positive, set_account_status,
};
use super::{EntryMetadata, ServiceContext};
use crate::entities::{
    accounts, members,
    sea_orm_active_enums::{AccountStatus, AccountType, MemberStatus, TransactionType},
    transactions,
};
use crate::error::{SaccoError, SaccoResult};
use crate::repositories::{
    AccountRepository, AuditLogRepository, MemberRepository, TransactionRepository,
};

/// Options for opening an account.
#[derive(Debug, Clone, Default)]
pub struct OpenAccountOptions {
    /// Annual interest rate in percent. Defaults to the per-type policy.
    pub interest_rate: Option<Decimal>,
}

/// Both legs of a completed transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    /// Reference shared by both legs.
    pub reference: String,
    /// Debit leg on the source account.
    pub debit: transactions::Model,
    /// Credit leg on the destination account.
    pub credit: transactions::Model,
}

/// Account statement over a date window.
#[derive(Debug, Clone, Serialize)]
pub struct AccountStatement {
    /// Account as it stands now.
    pub account: accounts::Model,
    /// First day of the window.
    pub start: NaiveDate,
    /// Last day of the window, inclusive.
    pub end: NaiveDate,
    /// Opening, closing and per-direction totals.
    pub totals: StatementTotals,
    /// Entries in the window, oldest first.
    pub transactions: Vec<transactions::Model>,
}

/// Member account operations.
#[derive(Debug, Clone)]
pub struct AccountService {
    ctx: ServiceContext,
}

impl AccountService {
    /// Creates a new account service.
    #[must_use]
    pub const fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Opens an account of `account_type` for an active member.
    #[instrument(skip(self, options))]
    pub async fn open_account(
        &self,
        member_id: Uuid,
        account_type: AccountType,
        options: OpenAccountOptions,
        actor: Actor,
    ) -> SaccoResult<accounts::Model> {
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let member = MemberRepository::lock(&txn, member_id).await?;
        if member.status != MemberStatus::Active {
            return Err(SaccoError::InvalidState(format!(
                "Member {} is {}",
                member.member_number,
                member.status.as_str()
            )));
        }

        let rate = options
            .interest_rate
            .unwrap_or_else(|| default_rate(&self.ctx.config().accounts, account_type));
        let account = create_account(
            &txn,
            &member,
            account_type,
            AccountStatus::Active,
            rate,
            actor,
            now,
        )
        .await?;

        txn.commit().await?;

        info!(account_id = %account.id, account_number = %account.account_number, "Account opened");
        Ok(account)
    }

    /// Credits `amount` to an active account.
    #[instrument(skip(self, details))]
    pub async fn deposit(
        &self,
        account_id: Uuid,
        amount: Decimal,
        details: EntryMetadata,
        actor: Actor,
    ) -> SaccoResult<transactions::Model> {
        require_positive(amount)?;
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let (member, account) = lock_account(&txn, account_id).await?;
        let posted = post_entry(
            &txn,
            &member,
            &account,
            EntryRequest {
                transaction_type: TransactionType::Deposit,
                direction: EntryDirection::Credit,
                amount,
                reference: None,
                details,
                processed_by: actor.id(),
                check_available: false,
            },
            now,
        )
        .await?;

        record_entry(&txn, AuditAction::Deposit, &account, &posted, actor).await?;
        txn.commit().await?;

        info!(account_id = %account_id, amount = %amount, balance = %posted.account.balance, "Deposit posted");
        Ok(posted.entry)
    }

    /// Debits `amount` from an active account if the available balance
    /// covers it.
    #[instrument(skip(self, description))]
    pub async fn withdraw(
        &self,
        account_id: Uuid,
        amount: Decimal,
        description: Option<String>,
        actor: Actor,
    ) -> SaccoResult<transactions::Model> {
        require_positive(amount)?;
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let (member, account) = lock_account(&txn, account_id).await?;
        let posted = post_entry(
            &txn,
            &member,
            &account,
            EntryRequest {
                transaction_type: TransactionType::Withdrawal,
                direction: EntryDirection::Debit,
                amount,
                reference: None,
                details: EntryMetadata {
                    description,
                    metadata: None,
                },
                processed_by: actor.id(),
                check_available: true,
            },
            now,
        )
        .await?;

        record_entry(&txn, AuditAction::Withdrawal, &account, &posted, actor).await?;
        txn.commit().await?;

        info!(account_id = %account_id, amount = %amount, balance = %posted.account.balance, "Withdrawal posted");
        Ok(posted.entry)
    }

    /// Moves `amount` between two active accounts as one atomic pair of
    /// entries sharing a reference.
    #[instrument(skip(self, description))]
    pub async fn transfer(
        &self,
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount: Decimal,
        description: Option<String>,
        actor: Actor,
    ) -> SaccoResult<TransferReceipt> {
        require_positive(amount)?;
        if from_account_id == to_account_id {
            return Err(SaccoError::InvalidState(
                "Cannot transfer to the same account".to_string(),
            ));
        }
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let source = AccountRepository::find(&txn, from_account_id).await?;
        let destination = AccountRepository::find(&txn, to_account_id).await?;

        let member_ids: BTreeSet<Uuid> = [source.member_id, destination.member_id].into();
        let mut members = BTreeMap::new();
        for member_id in member_ids {
            members.insert(member_id, MemberRepository::lock(&txn, member_id).await?);
        }
        let account_ids: BTreeSet<Uuid> = [from_account_id, to_account_id].into();
        let mut accounts = BTreeMap::new();
        for id in account_ids {
            accounts.insert(id, AccountRepository::lock(&txn, id).await?);
        }

        let source = take(&mut accounts, from_account_id, "account")?;
        let destination = take(&mut accounts, to_account_id, "account")?;
        require_active(&source)?;
        require_active(&destination)?;

        let reference = self.ctx.references().transfer_reference();
        let description = description.unwrap_or_else(|| {
            format!(
                "Transfer from {} to {}",
                source.account_number, destination.account_number
            )
        });

        let source_member = take(&mut members, source.member_id, "member")?;
        let debit = post_entry(
            &txn,
            &source_member,
            &source,
            EntryRequest {
                transaction_type: TransactionType::Transfer,
                direction: EntryDirection::Debit,
                amount,
                reference: Some(reference.clone()),
                details: EntryMetadata::described(description.clone()),
                processed_by: actor.id(),
                check_available: true,
            },
            now,
        )
        .await?;
        members.insert(debit.member.id, debit.member.clone());

        let destination_member = take(&mut members, destination.member_id, "member")?;
        let credit = post_entry(
            &txn,
            &destination_member,
            &destination,
            EntryRequest {
                transaction_type: TransactionType::Transfer,
                direction: EntryDirection::Credit,
                amount,
                reference: Some(reference.clone()),
                details: EntryMetadata::described(description),
                processed_by: actor.id(),
                check_available: false,
            },
            now,
        )
        .await?;

        AuditLogRepository::record(
            &txn,
            AuditEvent::new(AuditAction::Transfer, AuditSubject::Account, from_account_id)
                .with_old(json!({
                    "from_balance": source.balance,
                    "to_balance": destination.balance,
                }))
                .with_new(json!({
                    "reference": reference,
                    "to_account_id": to_account_id,
                    "amount": amount,
                    "from_balance": debit.account.balance,
                    "to_balance": credit.account.balance,
                    "debit_transaction_id": debit.entry.id,
                    "credit_transaction_id": credit.entry.id,
                })),
            actor,
            now,
        )
        .await?;

        txn.commit().await?;

        info!(
            reference = %reference,
            from_account_id = %from_account_id,
            to_account_id = %to_account_id,
            amount = %amount,
            "Transfer completed"
        );
        Ok(TransferReceipt {
            reference,
            debit: debit.entry,
            credit: credit.entry,
        })
    }

    /// Credits one month of interest to an account.
    ///
    /// Returns `None`, writing nothing, when the interest rounds to zero.
    #[instrument(skip(self))]
    pub async fn calculate_interest(
        &self,
        account_id: Uuid,
    ) -> SaccoResult<Option<transactions::Model>> {
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let (member, account) = lock_account(&txn, account_id).await?;
        let interest = monthly_interest(account.balance, account.interest_rate);
        if interest <= Decimal::ZERO {
            return Ok(None);
        }

        let posted = post_entry(
            &txn,
            &member,
            &account,
            EntryRequest {
                transaction_type: TransactionType::Interest,
                direction: EntryDirection::Credit,
                amount: interest,
                reference: None,
                details: EntryMetadata::described(format!(
                    "Monthly interest at {}% p.a.",
                    account.interest_rate.normalize()
                )),
                processed_by: None,
                check_available: false,
            },
            now,
        )
        .await?;

        record_entry(&txn, AuditAction::Interest, &account, &posted, Actor::System).await?;
        txn.commit().await?;

        info!(account_id = %account_id, interest = %interest, "Interest credited");
        Ok(Some(posted.entry))
    }

    /// Credits monthly interest to every active interest-bearing account.
    ///
    /// Each account is processed in its own transaction. Failures are logged
    /// and skipped. Returns the number of interest entries written.
    #[instrument(skip(self))]
    pub async fn accrue_monthly_interest(&self) -> SaccoResult<usize> {
        let candidates = AccountRepository::list_interest_bearing(self.ctx.db()).await?;
        let mut credited = 0;
        for account in candidates {
            match self.calculate_interest(account.id).await {
                Ok(Some(_)) => credited += 1,
                Ok(None) => {}
                Err(err) => {
                    warn!(account_id = %account.id, error = %err, "Interest accrual skipped");
                }
            }
        }
        info!(credited, "Monthly interest accrual finished");
        Ok(credited)
    }

    /// Freezes an active account.
    #[instrument(skip(self, reason))]
    pub async fn freeze_account(
        &self,
        account_id: Uuid,
        reason: &str,
        actor: Actor,
    ) -> SaccoResult<accounts::Model> {
        self.change_status(
            account_id,
            AccountStatus::Active,
            AccountStatus::Frozen,
            AuditAction::AccountFrozen,
            Some(reason),
            actor,
        )
        .await
    }

    /// Restores a frozen account to active.
    #[instrument(skip(self))]
    pub async fn unfreeze_account(
        &self,
        account_id: Uuid,
        actor: Actor,
    ) -> SaccoResult<accounts::Model> {
        self.change_status(
            account_id,
            AccountStatus::Frozen,
            AccountStatus::Active,
            AuditAction::AccountUnfrozen,
            None,
            actor,
        )
        .await
    }

    /// Closes an account whose balance is exactly zero.
    #[instrument(skip(self))]
    pub async fn close_account(
        &self,
        account_id: Uuid,
        actor: Actor,
    ) -> SaccoResult<accounts::Model> {
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let account = AccountRepository::lock(&txn, account_id).await?;
        if account.status == AccountStatus::Closed {
            return Err(SaccoError::InvalidState(format!(
                "Account {} is already closed",
                account.account_number
            )));
        }
        if !account.balance.is_zero() {
            return Err(SaccoError::NonZeroBalance {
                account_id,
                balance: account.balance,
            });
        }

        let closed = set_account_status(&txn, &account, AccountStatus::Closed, now).await?;
        AuditLogRepository::record(
            &txn,
            AuditEvent::new(AuditAction::AccountClosed, AuditSubject::Account, account_id)
                .with_old(json!({ "status": account.status.as_str() }))
                .with_new(json!({ "status": closed.status.as_str(), "closed_at": closed.closed_at })),
            actor,
            now,
        )
        .await?;
        txn.commit().await?;

        info!(account_id = %account_id, "Account closed");
        Ok(closed)
    }

    /// Finds an account by id.
    pub async fn get_account(&self, account_id: Uuid) -> SaccoResult<accounts::Model> {
        AccountRepository::find(self.ctx.db(), account_id).await
    }

    /// Lists a member's accounts.
    pub async fn get_member_accounts(&self, member_id: Uuid) -> SaccoResult<Vec<accounts::Model>> {
        MemberRepository::find(self.ctx.db(), member_id).await?;
        AccountRepository::list_for_member(self.ctx.db(), member_id).await
    }

    /// Most recent `limit` entries of an account, newest first.
    pub async fn get_transaction_history(
        &self,
        account_id: Uuid,
        limit: u64,
    ) -> SaccoResult<Vec<transactions::Model>> {
        AccountRepository::find(self.ctx.db(), account_id).await?;
        TransactionRepository::history(self.ctx.db(), account_id, limit).await
    }

    /// Statement of an account for the days `start..=end`.
    pub async fn get_account_statement(
        &self,
        account_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> SaccoResult<AccountStatement> {
        if end < start {
            return Err(SaccoError::InvalidState(format!(
                "Statement end {end} precedes start {start}"
            )));
        }
        let db = self.ctx.db();
        let account = AccountRepository::find(db, account_id).await?;

        let window_start = start.and_time(NaiveTime::MIN).and_utc();
        let window_end = end
            .succ_opt()
            .ok_or_else(|| SaccoError::InvalidState(format!("Statement end {end} is out of range")))?
            .and_time(NaiveTime::MIN)
            .and_utc();

        let opening = TransactionRepository::last_before(db, account_id, window_start)
            .await?
            .map_or(Decimal::ZERO, |entry| entry.balance_after);
        let entries =
            TransactionRepository::in_window(db, account_id, window_start, window_end).await?;
        let totals = StatementTotals::from_entries(
            opening,
            entries
                .iter()
                .map(|entry| (entry.direction.into(), entry.amount)),
        );

        Ok(AccountStatement {
            account,
            start,
            end,
            totals,
            transactions: entries,
        })
    }

    /// Replays an account's entries and compares them with its stored
    /// balance.
    pub async fn verify_account_ledger(&self, account_id: Uuid) -> SaccoResult<LedgerCheck> {
        let db = self.ctx.db();
        let account = AccountRepository::find(db, account_id).await?;
        let links: Vec<ChainLink> = TransactionRepository::chain(db, account_id)
            .await?
            .into_iter()
            .map(|entry| ChainLink {
                entry_seq: entry.entry_seq,
                direction: entry.direction.into(),
                amount: entry.amount,
                balance_before: entry.balance_before,
                balance_after: entry.balance_after,
            })
            .collect();

        let check = verify_chain(&links, account.balance);
        if !check.is_consistent() {
            warn!(account_id = %account_id, breaks = check.breaks.len(), "Ledger chain inconsistent");
        }
        Ok(check)
    }

    async fn change_status(
        &self,
        account_id: Uuid,
        from: AccountStatus,
        to: AccountStatus,
        action: AuditAction,
        reason: Option<&str>,
        actor: Actor,
    ) -> SaccoResult<accounts::Model> {
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let account = AccountRepository::lock(&txn, account_id).await?;
        if account.status != from {
            return Err(SaccoError::InvalidState(format!(
                "Account {} is {}, expected {}",
                account.account_number,
                account.status.as_str(),
                from.as_str()
            )));
        }

        let updated = set_account_status(&txn, &account, to, now).await?;
        AuditLogRepository::record(
            &txn,
            AuditEvent::new(action, AuditSubject::Account, account_id)
                .with_old(json!({ "status": from.as_str() }))
                .with_new(json!({ "status": to.as_str(), "reason": reason })),
            actor,
            now,
        )
        .await?;
        txn.commit().await?;

        info!(account_id = %account_id, status = to.as_str(), "Account status changed");
        Ok(updated)
    }
}

/// Locks an account and its member in the global lock order.
pub(crate) async fn lock_account(
    txn: &DatabaseTransaction,
    account_id: Uuid,
) -> SaccoResult<(members::Model, accounts::Model)> {
    let unlocked = AccountRepository::find(txn, account_id).await?;
    let member = MemberRepository::lock(txn, unlocked.member_id).await?;
    let account = AccountRepository::lock(txn, account_id).await?;
    Ok((member, account))
}

fn take<T>(rows: &mut BTreeMap<Uuid, T>, id: Uuid, entity: &'static str) -> SaccoResult<T> {
    rows.remove(&id).ok_or_else(|| SaccoError::not_found(entity, id))
}

async fn record_entry(
    txn: &DatabaseTransaction,
    action: AuditAction,
    before: &accounts::Model,
    posted: &Posted,
    actor: Actor,
) -> SaccoResult<()> {
    AuditLogRepository::record(
        txn,
        AuditEvent::new(action, AuditSubject::Account, before.id)
            .with_old(json!({
                "balance": before.balance,
                "available_balance": before.available_balance,
            }))
            .with_new(json!({
                "transaction_id": posted.entry.id,
                "amount": posted.entry.amount,
                "balance": posted.account.balance,
                "available_balance": posted.account.available_balance,
            })),
        actor,
        posted.entry.created_at.into(),
    )
    .await?;
    Ok(())
}
