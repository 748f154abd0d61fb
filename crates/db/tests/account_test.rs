//! Account service integration tests: deposits, withdrawals, transfers,
//! interest, statements and status changes.

mod common;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rstest::rstest;
use sacco_core::reference::is_transfer_reference;
use sacco_core::{Actor, AuditSubject};
use sacco_db::entities::sea_orm_active_enums::{
    AccountStatus, AccountType, EntryDirection, TransactionType,
};
use sacco_db::services::OpenAccountOptions;
use sacco_db::{AuditLogRepository, SaccoError, TransactionRepository};

use common::{date, harness};

#[tokio::test]
async fn test_deposits_accumulate_balance_and_savings_total() {
    let h = harness().await;
    let fixture = h.active_member().await;

    h.deposit(fixture.savings.id, dec!(1000)).await;
    h.deposit(fixture.savings.id, dec!(500)).await;

    let savings = h.account(fixture.savings.id).await;
    assert_eq!(savings.balance, dec!(1500));
    assert_eq!(savings.available_balance, dec!(1500));
    assert_eq!(savings.last_entry_seq, 2);

    let member = h.member(fixture.member.id).await;
    assert_eq!(member.total_savings, savings.balance);
    assert_eq!(member.total_shares, Decimal::ZERO);
}

#[tokio::test]
async fn test_share_deposit_moves_share_total_only() {
    let h = harness().await;
    let fixture = h.active_member().await;

    h.deposit(fixture.shares.id, dec!(2500)).await;

    let member = h.member(fixture.member.id).await;
    assert_eq!(member.total_shares, dec!(2500));
    assert_eq!(member.total_savings, Decimal::ZERO);
}

#[rstest]
#[case::zero(Decimal::ZERO)]
#[case::negative(dec!(-10))]
#[tokio::test]
async fn test_non_positive_amounts_are_rejected(#[case] amount: Decimal) {
    let h = harness().await;
    let fixture = h.active_member().await;

    let deposit = h
        .accounts
        .deposit(fixture.savings.id, amount, Default::default(), h.admin)
        .await;
    assert!(matches!(deposit, Err(SaccoError::InvalidAmount(_))));

    let withdraw = h
        .accounts
        .withdraw(fixture.savings.id, amount, None, h.admin)
        .await;
    assert!(matches!(withdraw, Err(SaccoError::InvalidAmount(_))));
}

#[tokio::test]
async fn test_pending_savings_account_refuses_deposits() {
    let h = harness().await;
    let fixture = h.pending_member().await;
    assert_eq!(fixture.savings.status, AccountStatus::Pending);
    assert_eq!(fixture.shares.status, AccountStatus::Active);

    let result = h
        .accounts
        .deposit(fixture.savings.id, dec!(100), Default::default(), h.admin)
        .await;

    assert!(matches!(result, Err(SaccoError::InvalidState(_))));
}

#[tokio::test]
async fn test_withdrawal_over_available_leaves_no_trace() {
    let h = harness().await;
    let fixture = h.active_member().await;
    h.deposit(fixture.savings.id, dec!(300)).await;

    let result = h
        .accounts
        .withdraw(fixture.savings.id, dec!(300.01), None, h.admin)
        .await;

    match result {
        Err(SaccoError::InsufficientFunds {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, dec!(300));
            assert_eq!(requested, dec!(300.01));
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }

    let savings = h.account(fixture.savings.id).await;
    assert_eq!(savings.balance, dec!(300));
    let entries = TransactionRepository::chain(h.ctx.db(), fixture.savings.id)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(h.member(fixture.member.id).await.total_savings, dec!(300));
}

#[tokio::test]
async fn test_withdrawal_debits_balance_and_total() {
    let h = harness().await;
    let fixture = h.active_member().await;
    h.deposit(fixture.savings.id, dec!(800)).await;

    let entry = h
        .accounts
        .withdraw(fixture.savings.id, dec!(300), Some("rent".to_string()), h.admin)
        .await
        .unwrap();

    assert_eq!(entry.transaction_type, TransactionType::Withdrawal);
    assert_eq!(entry.direction, EntryDirection::Debit);
    assert_eq!(entry.balance_before, dec!(800));
    assert_eq!(entry.balance_after, dec!(500));
    assert_eq!(entry.description.as_deref(), Some("rent"));
    assert_eq!(entry.processed_by, h.admin.id());
    assert_eq!(h.member(fixture.member.id).await.total_savings, dec!(500));
}

#[tokio::test]
async fn test_transfer_moves_funds_under_one_reference() {
    let h = harness().await;
    let alice = h.active_member().await;
    let bob = h.active_member().await;
    h.deposit(alice.savings.id, dec!(1000)).await;
    h.deposit(bob.savings.id, dec!(200)).await;

    let receipt = h
        .accounts
        .transfer(alice.savings.id, bob.savings.id, dec!(300), None, h.admin)
        .await
        .unwrap();

    assert!(is_transfer_reference(&receipt.reference));
    assert_eq!(h.account(alice.savings.id).await.balance, dec!(700));
    assert_eq!(h.account(bob.savings.id).await.balance, dec!(500));

    let legs = TransactionRepository::by_reference(h.ctx.db(), &receipt.reference)
        .await
        .unwrap();
    assert_eq!(legs.len(), 2);
    assert!(legs.iter().all(|leg| leg.amount == dec!(300)));
    assert!(legs.iter().all(|leg| leg.transaction_type == TransactionType::Transfer));
    assert_eq!(receipt.debit.direction, EntryDirection::Debit);
    assert_eq!(receipt.credit.direction, EntryDirection::Credit);

    assert_eq!(h.member(alice.member.id).await.total_savings, dec!(700));
    assert_eq!(h.member(bob.member.id).await.total_savings, dec!(500));

    let audit = AuditLogRepository::for_subject(h.ctx.db(), AuditSubject::Account, alice.savings.id)
        .await
        .unwrap();
    let transfer = audit.iter().find(|row| row.action == "transfer").unwrap();
    let values = transfer.new_values.as_ref().unwrap();
    assert_eq!(values["reference"], receipt.reference.as_str());
}

#[tokio::test]
async fn test_transfer_between_own_accounts_updates_both_totals() {
    let h = harness().await;
    let fixture = h.active_member().await;
    h.deposit(fixture.savings.id, dec!(1000)).await;

    h.accounts
        .transfer(fixture.savings.id, fixture.shares.id, dec!(400), None, h.admin)
        .await
        .unwrap();

    let member = h.member(fixture.member.id).await;
    assert_eq!(member.total_savings, dec!(600));
    assert_eq!(member.total_shares, dec!(400));
}

#[tokio::test]
async fn test_transfer_rejections_change_nothing() {
    let h = harness().await;
    let alice = h.active_member().await;
    let bob = h.active_member().await;
    h.deposit(alice.savings.id, dec!(100)).await;

    let same = h
        .accounts
        .transfer(alice.savings.id, alice.savings.id, dec!(10), None, h.admin)
        .await;
    assert!(matches!(same, Err(SaccoError::InvalidState(_))));

    let too_much = h
        .accounts
        .transfer(alice.savings.id, bob.savings.id, dec!(150), None, h.admin)
        .await;
    assert!(matches!(too_much, Err(SaccoError::InsufficientFunds { .. })));

    h.accounts
        .freeze_account(bob.savings.id, "review", h.admin)
        .await
        .unwrap();
    let frozen = h
        .accounts
        .transfer(alice.savings.id, bob.savings.id, dec!(50), None, h.admin)
        .await;
    assert!(matches!(frozen, Err(SaccoError::InvalidState(_))));

    assert_eq!(h.account(alice.savings.id).await.balance, dec!(100));
    assert_eq!(h.account(bob.savings.id).await.balance, Decimal::ZERO);
    assert_eq!(h.member(alice.member.id).await.total_savings, dec!(100));
}

#[tokio::test]
async fn test_monthly_interest_is_a_system_credit() {
    let h = harness().await;
    let fixture = h.active_member().await;
    h.deposit(fixture.savings.id, dec!(12000)).await;

    let entry = h
        .accounts
        .calculate_interest(fixture.savings.id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(entry.amount, dec!(40));
    assert_eq!(entry.transaction_type, TransactionType::Interest);
    assert_eq!(entry.processed_by, None);
    assert_eq!(h.account(fixture.savings.id).await.balance, dec!(12040));
    assert_eq!(h.member(fixture.member.id).await.total_savings, dec!(12040));
}

#[tokio::test]
async fn test_zero_interest_writes_nothing() {
    let h = harness().await;
    let fixture = h.active_member().await;
    h.deposit(fixture.shares.id, dec!(5000)).await;

    let result = h.accounts.calculate_interest(fixture.shares.id).await.unwrap();

    assert!(result.is_none());
    assert_eq!(h.account(fixture.shares.id).await.last_entry_seq, 1);
}

#[tokio::test]
async fn test_interest_sweep_credits_funded_accounts_only() {
    let h = harness().await;
    let funded = h.active_member().await;
    let empty = h.active_member().await;
    h.deposit(funded.savings.id, dec!(6000)).await;

    let credited = h.accounts.accrue_monthly_interest().await.unwrap();

    assert_eq!(credited, 1);
    assert_eq!(h.account(funded.savings.id).await.balance, dec!(6020));
    assert_eq!(h.account(empty.savings.id).await.balance, Decimal::ZERO);
}

#[tokio::test]
async fn test_ledger_chain_links_every_entry() {
    let h = harness().await;
    let fixture = h.active_member().await;
    h.deposit(fixture.savings.id, dec!(1000)).await;
    h.accounts
        .withdraw(fixture.savings.id, dec!(250), None, h.admin)
        .await
        .unwrap();
    h.deposit(fixture.savings.id, dec!(75)).await;

    let entries = TransactionRepository::chain(h.ctx.db(), fixture.savings.id)
        .await
        .unwrap();
    for pair in entries.windows(2) {
        assert_eq!(pair[0].balance_after, pair[1].balance_before);
        assert_eq!(pair[0].entry_seq + 1, pair[1].entry_seq);
    }

    let check = h
        .accounts
        .verify_account_ledger(fixture.savings.id)
        .await
        .unwrap();
    assert!(check.is_consistent());
    assert_eq!(check.entries, 3);
    assert_eq!(check.ledger_balance, dec!(825));
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let h = harness().await;
    let fixture = h.active_member().await;
    for amount in [dec!(10), dec!(20), dec!(30)] {
        h.deposit(fixture.savings.id, amount).await;
    }

    let history = h
        .accounts
        .get_transaction_history(fixture.savings.id, 2)
        .await
        .unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].amount, dec!(30));
    assert_eq!(history[1].amount, dec!(20));
}

#[tokio::test]
async fn test_statement_uses_balance_before_window_as_opening() {
    let h = harness().await;
    let fixture = h.active_member().await;
    h.deposit(fixture.savings.id, dec!(1000)).await;

    h.clock.advance(Duration::days(9));
    h.deposit(fixture.savings.id, dec!(400)).await;
    h.accounts
        .withdraw(fixture.savings.id, dec!(150), None, h.admin)
        .await
        .unwrap();

    let statement = h
        .accounts
        .get_account_statement(fixture.savings.id, date(2025, 3, 5), date(2025, 3, 31))
        .await
        .unwrap();

    assert_eq!(statement.totals.opening_balance, dec!(1000));
    assert_eq!(statement.totals.total_credits, dec!(400));
    assert_eq!(statement.totals.total_debits, dec!(150));
    assert_eq!(statement.totals.closing_balance, dec!(1250));
    assert_eq!(statement.transactions.len(), 2);

    let first_day = h
        .accounts
        .get_account_statement(fixture.savings.id, date(2025, 3, 1), date(2025, 3, 1))
        .await
        .unwrap();
    assert_eq!(first_day.totals.opening_balance, Decimal::ZERO);
    assert_eq!(first_day.totals.closing_balance, dec!(1000));
}

#[tokio::test]
async fn test_statement_rejects_end_past_calendar() {
    let h = harness().await;
    let fixture = h.active_member().await;

    let result = h
        .accounts
        .get_account_statement(fixture.savings.id, date(2025, 3, 1), NaiveDate::MAX)
        .await;

    assert!(matches!(result, Err(SaccoError::InvalidState(_))));
}

#[tokio::test]
async fn test_freeze_unfreeze_and_close() {
    let h = harness().await;
    let fixture = h.active_member().await;
    h.deposit(fixture.savings.id, dec!(50)).await;

    let frozen = h
        .accounts
        .freeze_account(fixture.savings.id, "suspicious activity", h.admin)
        .await
        .unwrap();
    assert_eq!(frozen.status, AccountStatus::Frozen);
    assert!(matches!(
        h.accounts
            .freeze_account(fixture.savings.id, "again", h.admin)
            .await,
        Err(SaccoError::InvalidState(_))
    ));
    assert!(matches!(
        h.accounts
            .withdraw(fixture.savings.id, dec!(10), None, h.admin)
            .await,
        Err(SaccoError::InvalidState(_))
    ));

    h.accounts
        .unfreeze_account(fixture.savings.id, h.admin)
        .await
        .unwrap();
    assert!(matches!(
        h.accounts.unfreeze_account(fixture.savings.id, h.admin).await,
        Err(SaccoError::InvalidState(_))
    ));

    assert!(matches!(
        h.accounts.close_account(fixture.savings.id, h.admin).await,
        Err(SaccoError::NonZeroBalance { .. })
    ));
    h.accounts
        .withdraw(fixture.savings.id, dec!(50), None, h.admin)
        .await
        .unwrap();
    let closed = h
        .accounts
        .close_account(fixture.savings.id, h.admin)
        .await
        .unwrap();
    assert_eq!(closed.status, AccountStatus::Closed);
    assert!(closed.closed_at.is_some());
    assert!(matches!(
        h.accounts.close_account(fixture.savings.id, h.admin).await,
        Err(SaccoError::InvalidState(_))
    ));

    let audit =
        AuditLogRepository::for_subject(h.ctx.db(), AuditSubject::Account, fixture.savings.id)
            .await
            .unwrap();
    let frozen_row = audit.iter().find(|row| row.action == "account_frozen").unwrap();
    assert_eq!(
        frozen_row.new_values.as_ref().unwrap()["reason"],
        "suspicious activity"
    );
}

#[tokio::test]
async fn test_open_account_rules() {
    let h = harness().await;
    let fixture = h.active_member().await;

    let checking = h
        .accounts
        .open_account(
            fixture.member.id,
            AccountType::Checking,
            OpenAccountOptions::default(),
            h.admin,
        )
        .await
        .unwrap();
    assert_eq!(checking.status, AccountStatus::Active);
    assert_eq!(
        checking.account_number,
        format!("{}-CK", fixture.member.member_number)
    );

    let duplicate = h
        .accounts
        .open_account(
            fixture.member.id,
            AccountType::Savings,
            OpenAccountOptions::default(),
            h.admin,
        )
        .await;
    assert!(matches!(duplicate, Err(SaccoError::DuplicateAccount { .. })));

    let pending = h.pending_member().await;
    let inactive = h
        .accounts
        .open_account(
            pending.member.id,
            AccountType::Checking,
            OpenAccountOptions {
                interest_rate: Some(dec!(2)),
            },
            Actor::System,
        )
        .await;
    assert!(matches!(inactive, Err(SaccoError::InvalidState(_))));
}

#[tokio::test]
async fn test_unknown_account_is_not_found() {
    let h = harness().await;
    let result = h.accounts.get_account(uuid::Uuid::new_v4()).await;
    assert!(matches!(result, Err(SaccoError::NotFound { entity: "account", .. })));
}
