//! Row-lock tests against PostgreSQL.
//!
//! These run on a multi-connection pool so operations genuinely overlap.
//! They verify that:
//! - Barrier-started withdrawals on one account never overdraw it
//! - Opposite-direction transfers take locks in the same order and never deadlock
//! - Two registrations for one user yield one member and one `AlreadyMember`
//! - A held row lock surfaces as the retryable `LockTimeout`
//! - Ledger and audit rows reject UPDATE and DELETE
//!
//! Each test skips when `DATABASE_URL` does not reach a PostgreSQL server.

#![allow(clippy::items_after_statements)]

mod common;

use std::sync::Arc;

use futures::future::join_all;
use rust_decimal_macros::dec;
use sacco_core::AuditSubject;
use sacco_db::services::Registration;
use sacco_db::{AccountRepository, AuditLogRepository, SaccoError, TransactionRepository};
use sacco_shared::SaccoConfig;
use sea_orm::{ConnectionTrait, TransactionTrait};
use tokio::sync::Barrier;

use common::{postgres_harness, profile};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_barrier_withdrawals_serialize_on_account_lock() {
    let Some(h) = postgres_harness(SaccoConfig::default()).await else {
        return;
    };
    let fixture = h.active_member().await;
    h.deposit(fixture.savings.id, dec!(1000)).await;

    const ATTEMPTS: usize = 10;
    let barrier = Arc::new(Barrier::new(ATTEMPTS));
    let handles = (0..ATTEMPTS).map(|_| {
        let accounts = h.accounts.clone();
        let barrier = Arc::clone(&barrier);
        let account_id = fixture.savings.id;
        let actor = h.admin;
        tokio::spawn(async move {
            barrier.wait().await;
            accounts.withdraw(account_id, dec!(150), None, actor).await
        })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let succeeded = results.iter().filter(|result| result.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|result| matches!(result, Err(SaccoError::InsufficientFunds { .. })))
        .count();
    assert_eq!(succeeded, 6, "results: {results:?}");
    assert_eq!(rejected, 4, "results: {results:?}");

    let savings = h.account(fixture.savings.id).await;
    assert_eq!(savings.balance, dec!(100));
    assert_eq!(savings.available_balance, dec!(100));
    assert_eq!(savings.last_entry_seq, 7);
    assert_eq!(h.member(fixture.member.id).await.total_savings, dec!(100));

    let check = h
        .accounts
        .verify_account_ledger(fixture.savings.id)
        .await
        .unwrap();
    assert!(check.is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_barrier_reverse_transfers_do_not_deadlock() {
    let Some(h) = postgres_harness(SaccoConfig::default()).await else {
        return;
    };
    let alice = h.active_member().await;
    let bob = h.active_member().await;
    h.deposit(alice.savings.id, dec!(1000)).await;
    h.deposit(bob.savings.id, dec!(1000)).await;

    const TRANSFERS: usize = 20;
    let barrier = Arc::new(Barrier::new(TRANSFERS));
    let handles = (0..TRANSFERS).map(|i| {
        let accounts = h.accounts.clone();
        let barrier = Arc::clone(&barrier);
        let (from, to) = if i % 2 == 0 {
            (alice.savings.id, bob.savings.id)
        } else {
            (bob.savings.id, alice.savings.id)
        };
        let actor = h.admin;
        tokio::spawn(async move {
            barrier.wait().await;
            accounts.transfer(from, to, dec!(25), None, actor).await
        })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();
    assert!(results.iter().all(Result::is_ok), "results: {results:?}");

    let a = h.account(alice.savings.id).await;
    let b = h.account(bob.savings.id).await;
    assert_eq!(a.balance, dec!(1000));
    assert_eq!(b.balance, dec!(1000));

    for account in [alice.savings.id, bob.savings.id] {
        let entries = TransactionRepository::chain(h.ctx.db(), account)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1 + TRANSFERS);
        for pair in entries.windows(2) {
            assert_eq!(pair[0].balance_after, pair[1].balance_before);
            assert_eq!(pair[0].entry_seq + 1, pair[1].entry_seq);
        }
    }
    assert_eq!(h.member(alice.member.id).await.total_savings, dec!(1000));
    assert_eq!(h.member(bob.member.id).await.total_savings, dec!(1000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_registrations_yield_one_member() {
    let Some(h) = postgres_harness(SaccoConfig::default()).await else {
        return;
    };
    let user = profile(h.ctx.now(), 30);

    let barrier = Arc::new(Barrier::new(2));
    let handles = (0..2).map(|_| {
        let membership = h.membership.clone();
        let barrier = Arc::clone(&barrier);
        let user = user.clone();
        let actor = h.admin;
        tokio::spawn(async move {
            barrier.wait().await;
            membership
                .register_member(&user, Registration::default(), actor)
                .await
        })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|result| matches!(result, Err(SaccoError::AlreadyMember(id)) if *id == user.user_id)),
        "results: {results:?}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_held_row_lock_times_out_as_retryable() {
    let mut config = SaccoConfig::default();
    config.database.lock_timeout_ms = 200;
    let Some(h) = postgres_harness(config).await else {
        return;
    };
    let fixture = h.active_member().await;
    h.deposit(fixture.savings.id, dec!(500)).await;

    let holder = h.ctx.db().begin().await.unwrap();
    AccountRepository::lock(&holder, fixture.savings.id)
        .await
        .unwrap();

    let err = h
        .accounts
        .withdraw(fixture.savings.id, dec!(100), None, h.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, SaccoError::LockTimeout), "got {err:?}");
    assert!(err.is_retryable());

    holder.rollback().await.unwrap();

    let savings = h.account(fixture.savings.id).await;
    assert_eq!(savings.balance, dec!(500));
    assert_eq!(savings.last_entry_seq, 1);

    // Once the lock is released the same request goes through.
    h.accounts
        .withdraw(fixture.savings.id, dec!(100), None, h.admin)
        .await
        .unwrap();
    assert_eq!(h.account(fixture.savings.id).await.balance, dec!(400));
}

#[tokio::test]
async fn test_ledger_and_audit_rows_are_append_only() {
    let Some(h) = postgres_harness(SaccoConfig::default()).await else {
        return;
    };
    let fixture = h.active_member().await;
    let entry = h
        .accounts
        .deposit(fixture.savings.id, dec!(250), Default::default(), h.admin)
        .await
        .unwrap();
    let db = h.ctx.db();

    let update = db
        .execute_unprepared(&format!(
            "UPDATE sacco_transactions SET amount = 1 WHERE id = '{}'",
            entry.id
        ))
        .await;
    assert!(update.unwrap_err().to_string().contains("append-only"));

    let delete = db
        .execute_unprepared(&format!(
            "DELETE FROM sacco_transactions WHERE id = '{}'",
            entry.id
        ))
        .await;
    assert!(delete.unwrap_err().to_string().contains("append-only"));

    let trail = AuditLogRepository::for_subject(db, AuditSubject::Member, fixture.member.id)
        .await
        .unwrap();
    let audit_id = trail.first().unwrap().id;
    let delete_audit = db
        .execute_unprepared(&format!(
            "DELETE FROM sacco_audit_logs WHERE id = '{audit_id}'"
        ))
        .await;
    assert!(delete_audit.unwrap_err().to_string().contains("append-only"));

    let overdraw = db
        .execute_unprepared(&format!(
            "UPDATE sacco_accounts SET available_balance = balance + 1 WHERE id = '{}'",
            fixture.savings.id
        ))
        .await;
    assert!(overdraw.is_err());

    let savings = h.account(fixture.savings.id).await;
    assert_eq!(savings.balance, dec!(250));
}
