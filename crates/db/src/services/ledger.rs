//! Posting of ledger entries.
//!
//! Every balance change in the system goes through [`post_entry`]. The caller
//! must already hold the member and account row locks inside `conn`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sacco_core::account::{Balances, EntryDirection};
use sacco_core::membership::account_number;
use sacco_core::{Actor, AuditAction, AuditEvent, AuditSubject, RuleError};
use sacco_shared::config::AccountPolicy;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde_json::json;
use uuid::Uuid;

use super::EntryMetadata;
use crate::entities::{
    accounts, members,
    sea_orm_active_enums::{AccountStatus, AccountType, TransactionType},
    transactions,
};
use crate::error::{SaccoError, SaccoResult};
use crate::repositories::{
    AccountRepository, AuditLogRepository, MemberRepository, TransactionRepository,
    member::TotalsDelta,
};

/// One entry to post against an account.
#[derive(Debug, Clone)]
pub(crate) struct EntryRequest {
    pub transaction_type: TransactionType,
    pub direction: EntryDirection,
    pub amount: Decimal,
    pub reference: Option<String>,
    pub details: EntryMetadata,
    pub processed_by: Option<Uuid>,
    /// Debits only: gate on the available balance.
    pub check_available: bool,
}

/// Rows as they stand after an entry was posted.
#[derive(Debug, Clone)]
pub(crate) struct Posted {
    pub entry: transactions::Model,
    pub account: accounts::Model,
    pub member: members::Model,
}

/// Rejects non-positive amounts before any row is touched.
pub(crate) fn require_positive(amount: Decimal) -> SaccoResult<()> {
    if amount <= Decimal::ZERO {
        return Err(SaccoError::InvalidAmount(amount));
    }
    Ok(())
}

pub(crate) fn require_active(account: &accounts::Model) -> SaccoResult<()> {
    if account.status != AccountStatus::Active {
        return Err(SaccoError::InvalidState(format!(
            "Account {} is {}",
            account.account_number,
            account.status.as_str()
        )));
    }
    Ok(())
}

/// Appends one entry and moves the account balance and member totals.
pub(crate) async fn post_entry<C: ConnectionTrait>(
    conn: &C,
    member: &members::Model,
    account: &accounts::Model,
    request: EntryRequest,
    now: DateTime<Utc>,
) -> SaccoResult<Posted> {
    require_active(account)?;

    let current = Balances::new(account.balance, account.available_balance);
    let movement = match request.direction {
        EntryDirection::Credit => current.credit(request.amount),
        EntryDirection::Debit if request.check_available => current.withdraw(request.amount),
        EntryDirection::Debit => current.debit(request.amount),
    }
    .map_err(|err| match err {
        RuleError::Overdraw { .. } => SaccoError::InsufficientFunds {
            account_id: account.id,
            available: account.available_balance,
            requested: request.amount,
        },
        other => other.into(),
    })?;

    let entry_seq = account.last_entry_seq + 1;
    let entry = TransactionRepository::insert(
        conn,
        transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(account.id),
            member_id: Set(account.member_id),
            transaction_type: Set(request.transaction_type),
            direction: Set(request.direction.into()),
            amount: Set(request.amount),
            balance_before: Set(movement.before.balance),
            balance_after: Set(movement.after.balance),
            entry_seq: Set(entry_seq),
            transaction_reference: Set(request.reference),
            description: Set(request.details.description),
            metadata: Set(request.details.metadata),
            processed_by: Set(request.processed_by),
            created_at: Set(now.into()),
        },
    )
    .await?;

    let mut active: accounts::ActiveModel = account.clone().into();
    active.balance = Set(movement.after.balance);
    active.available_balance = Set(movement.after.available_balance);
    active.last_entry_seq = Set(entry_seq);
    active.updated_at = Set(now.into());
    let account = active.update(conn).await?;

    let change = request.direction.signed(request.amount);
    let delta = match account.account_type {
        AccountType::Savings => TotalsDelta {
            savings: change,
            ..TotalsDelta::default()
        },
        AccountType::Shares => TotalsDelta {
            shares: change,
            ..TotalsDelta::default()
        },
        AccountType::Checking => TotalsDelta::default(),
    };
    let member = MemberRepository::apply_totals(conn, member, delta, now).await?;

    Ok(Posted {
        entry,
        account,
        member,
    })
}

/// Default annual rate for a new account of `account_type`.
pub(crate) fn default_rate(policy: &AccountPolicy, account_type: AccountType) -> Decimal {
    match account_type {
        AccountType::Shares => policy.shares_interest_rate,
        AccountType::Savings => policy.savings_interest_rate,
        AccountType::Checking => policy.checking_interest_rate,
    }
}

/// Inserts an account for a locked member and audits it.
pub(crate) async fn create_account<C: ConnectionTrait>(
    conn: &C,
    member: &members::Model,
    account_type: AccountType,
    status: AccountStatus,
    interest_rate: Decimal,
    actor: Actor,
    now: DateTime<Utc>,
) -> SaccoResult<accounts::Model> {
    if AccountRepository::find_by_member_and_type(conn, member.id, account_type)
        .await?
        .is_some()
    {
        return Err(SaccoError::DuplicateAccount {
            member_id: member.id,
            account_type: account_type.as_str(),
        });
    }

    let account = accounts::ActiveModel {
        id: Set(Uuid::new_v4()),
        member_id: Set(member.id),
        account_number: Set(account_number(&member.member_number, account_type.code())),
        account_type: Set(account_type),
        balance: Set(Decimal::ZERO),
        available_balance: Set(Decimal::ZERO),
        interest_rate: Set(interest_rate),
        status: Set(status),
        last_entry_seq: Set(0),
        opened_at: Set(now.into()),
        closed_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(conn)
    .await?;

    AuditLogRepository::record(
        conn,
        AuditEvent::new(AuditAction::AccountOpened, AuditSubject::Account, account.id).with_new(
            json!({
                "member_id": member.id,
                "account_number": account.account_number,
                "account_type": account_type.as_str(),
                "status": status.as_str(),
                "interest_rate": interest_rate,
            }),
        ),
        actor,
        now,
    )
    .await?;

    Ok(account)
}

/// Sets a new status on a locked account.
pub(crate) async fn set_account_status<C: ConnectionTrait>(
    conn: &C,
    account: &accounts::Model,
    status: AccountStatus,
    now: DateTime<Utc>,
) -> SaccoResult<accounts::Model> {
    let mut active: accounts::ActiveModel = account.clone().into();
    active.status = Set(status);
    if status == AccountStatus::Closed {
        active.closed_at = Set(Some(now.into()));
    }
    active.updated_at = Set(now.into());
    Ok(active.update(conn).await?)
}
