//! Membership service integration tests: registration, automatic
//! enrollment, approval cascades and totals reconciliation.

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sacco_core::{Actor, AuditSubject};
use sacco_db::entities::{
    members,
    sea_orm_active_enums::{AccountStatus, AccountType, MemberStatus, MembershipType},
};
use sacco_db::services::{AutoEnrollment, OpenAccountOptions, Registration};
use sacco_db::{AuditLogRepository, SaccoError};
use sacco_shared::SaccoConfig;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};

use common::{harness, harness_with, profile};

#[tokio::test]
async fn test_member_numbers_follow_yearly_sequence() {
    let h = harness().await;

    let first = h
        .membership
        .auto_create_membership(&profile(h.ctx.now(), 10))
        .await;
    let second = h
        .membership
        .auto_create_membership(&profile(h.ctx.now(), 10))
        .await;

    assert_eq!(first.member().unwrap().member_number, "SAC-2025-00001");
    assert_eq!(second.member().unwrap().member_number, "SAC-2025-00002");
}

#[tokio::test]
async fn test_auto_enrollment_is_idempotent() {
    let h = harness().await;
    let user = profile(h.ctx.now(), 10);

    let created = match h.membership.auto_create_membership(&user).await {
        AutoEnrollment::Created(member) => member,
        other => panic!("expected Created, got {other:?}"),
    };
    match h.membership.auto_create_membership(&user).await {
        AutoEnrollment::Existing(member) => assert_eq!(member.id, created.id),
        other => panic!("expected Existing, got {other:?}"),
    }
}

#[tokio::test]
async fn test_auto_enrollment_can_be_disabled() {
    let mut config = SaccoConfig::default();
    config.membership.auto_enrollment_enabled = false;
    let h = harness_with(config).await;

    let outcome = h
        .membership
        .auto_create_membership(&profile(h.ctx.now(), 200))
        .await;

    assert!(matches!(outcome, AutoEnrollment::Disabled));
    assert_eq!(h.membership.get_membership_summary().await.unwrap().total_members, 0);
}

#[tokio::test]
async fn test_disabled_enrollment_still_reports_existing_member() {
    let mut config = SaccoConfig::default();
    config.membership.auto_enrollment_enabled = false;
    let h = harness_with(config).await;
    let user = profile(h.ctx.now(), 200);
    let registered = h
        .membership
        .register_member(&user, Registration::default(), h.admin)
        .await
        .unwrap();

    match h.membership.auto_create_membership(&user).await {
        AutoEnrollment::Existing(member) => {
            assert_eq!(member.id, registered.id);
            assert_eq!(member.member_number, "SAC-2025-00001");
        }
        other => panic!("expected Existing, got {other:?}"),
    }
}

#[tokio::test]
async fn test_auto_enrollment_reports_failures() {
    let h = harness().await;
    h.ctx
        .db()
        .execute_unprepared("DROP TABLE sacco_member_sequences")
        .await
        .unwrap();

    let outcome = h
        .membership
        .auto_create_membership(&profile(h.ctx.now(), 10))
        .await;

    assert!(matches!(outcome, AutoEnrollment::Failed(SaccoError::Database(_))));
    assert_eq!(h.membership.get_membership_summary().await.unwrap().total_members, 0);
}

#[tokio::test]
async fn test_auto_enrollment_tiers_and_approval() {
    let h = harness().await;
    let now = h.ctx.now();

    let mut artist = profile(now, 5);
    artist.is_verified_artist = true;
    let artist = h.membership.auto_create_membership(&artist).await;
    let artist = artist.member().unwrap();
    assert_eq!(artist.membership_type, MembershipType::Associate);
    assert_eq!(artist.status, MemberStatus::Active);
    assert_eq!(artist.approved_by, None);
    let fixture = h.reload(artist.id).await;
    assert_eq!(fixture.savings.status, AccountStatus::Active);

    let seasoned = h
        .membership
        .auto_create_membership(&profile(now, 120))
        .await;
    let seasoned = seasoned.member().unwrap();
    assert_eq!(seasoned.membership_type, MembershipType::Regular);
    assert_eq!(seasoned.status, MemberStatus::Active);

    let newcomer = h.membership.auto_create_membership(&profile(now, 30)).await;
    let newcomer = newcomer.member().unwrap();
    assert_eq!(newcomer.membership_type, MembershipType::Regular);
    assert_eq!(newcomer.status, MemberStatus::PendingApproval);
    let fixture = h.reload(newcomer.id).await;
    assert_eq!(fixture.savings.status, AccountStatus::Pending);
}

#[tokio::test]
async fn test_approve_all_override() {
    let mut config = SaccoConfig::default();
    config.membership.auto_approve_all = true;
    let h = harness_with(config).await;

    let outcome = h
        .membership
        .auto_create_membership(&profile(h.ctx.now(), 1))
        .await;

    assert_eq!(outcome.member().unwrap().status, MemberStatus::Active);
}

#[tokio::test]
async fn test_registration_provisions_accounts() {
    let h = harness().await;
    let user = profile(h.ctx.now(), 30);

    let member = h
        .membership
        .register_member(
            &user,
            Registration {
                membership_type: MembershipType::Associate,
            },
            h.admin,
        )
        .await
        .unwrap();

    assert_eq!(member.status, MemberStatus::PendingApproval);
    assert_eq!(member.membership_type, MembershipType::Associate);
    assert_eq!(member.total_savings, Decimal::ZERO);
    let fixture = h.reload(member.id).await;
    assert_eq!(fixture.shares.status, AccountStatus::Active);
    assert_eq!(fixture.savings.status, AccountStatus::Pending);
    assert_eq!(fixture.shares.account_number, format!("{}-SH", member.member_number));
    assert_eq!(fixture.savings.account_number, format!("{}-SV", member.member_number));

    let again = h
        .membership
        .register_member(&user, Registration::default(), h.admin)
        .await;
    assert!(matches!(again, Err(SaccoError::AlreadyMember(id)) if id == user.user_id));

    let audit = AuditLogRepository::for_subject(h.ctx.db(), AuditSubject::Member, member.id)
        .await
        .unwrap();
    assert_eq!(audit[0].action, "member_registered");
    assert_eq!(audit[0].actor_id, h.admin.id());
}

#[tokio::test]
async fn test_approval_activates_accounts() {
    let h = harness().await;
    let pending = h.pending_member().await;

    let approved = h
        .membership
        .approve_member(pending.member.id, h.admin)
        .await
        .unwrap();

    assert_eq!(approved.status, MemberStatus::Active);
    assert_eq!(approved.approved_by, h.admin.id());
    assert!(approved.approved_at.is_some());
    let fixture = h.reload(approved.id).await;
    assert_eq!(fixture.savings.status, AccountStatus::Active);

    let again = h.membership.approve_member(approved.id, h.admin).await;
    assert!(matches!(again, Err(SaccoError::InvalidState(_))));
}

#[tokio::test]
async fn test_suspension_freezes_and_reactivation_restores() {
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
    h.accounts.close_account(checking.id, h.admin).await.unwrap();
    h.deposit(fixture.savings.id, dec!(200)).await;

    let suspended = h
        .membership
        .suspend_member(fixture.member.id, "fraud investigation", h.admin)
        .await
        .unwrap();
    assert_eq!(suspended.status, MemberStatus::Suspended);
    assert_eq!(
        suspended.suspension_reason.as_deref(),
        Some("fraud investigation")
    );

    let frozen = h.reload(fixture.member.id).await;
    assert_eq!(frozen.shares.status, AccountStatus::Frozen);
    assert_eq!(frozen.savings.status, AccountStatus::Frozen);
    assert_eq!(h.account(checking.id).await.status, AccountStatus::Closed);
    assert!(matches!(
        h.accounts
            .withdraw(fixture.savings.id, dec!(50), None, h.admin)
            .await,
        Err(SaccoError::InvalidState(_))
    ));

    let audit = AuditLogRepository::for_subject(h.ctx.db(), AuditSubject::Member, fixture.member.id)
        .await
        .unwrap();
    let row = audit.iter().find(|row| row.action == "member_suspended").unwrap();
    assert_eq!(row.new_values.as_ref().unwrap()["reason"], "fraud investigation");

    let reactivated = h
        .membership
        .reactivate_member(fixture.member.id, h.admin)
        .await
        .unwrap();
    assert_eq!(reactivated.status, MemberStatus::Active);
    assert_eq!(reactivated.suspension_reason, None);
    let restored = h.reload(fixture.member.id).await;
    assert_eq!(restored.shares.status, AccountStatus::Active);
    assert_eq!(restored.savings.status, AccountStatus::Active);
    assert_eq!(h.account(checking.id).await.status, AccountStatus::Closed);

    let again = h
        .membership
        .reactivate_member(fixture.member.id, h.admin)
        .await;
    assert!(matches!(again, Err(SaccoError::InvalidState(_))));
}

#[tokio::test]
async fn test_pending_member_can_be_suspended() {
    let h = harness().await;
    let pending = h.pending_member().await;

    let suspended = h
        .membership
        .suspend_member(pending.member.id, "duplicate identity", Actor::System)
        .await
        .unwrap();

    assert_eq!(suspended.status, MemberStatus::Suspended);
    let fixture = h.reload(pending.member.id).await;
    assert_eq!(fixture.savings.status, AccountStatus::Frozen);
}

#[tokio::test]
async fn test_membership_eligibility_reasons() {
    let mut config = SaccoConfig::default();
    config.membership.artists_only = true;
    config.membership.min_account_age_days = 30;
    let h = harness_with(config).await;

    let mut user = profile(h.ctx.now(), 3);
    user.email_verified_at = None;
    let eligibility = h.membership.check_eligibility(&user).await.unwrap();
    assert!(!eligibility.eligible);
    assert_eq!(eligibility.reasons.len(), 3);

    let mut artist = profile(h.ctx.now(), 60);
    artist.is_verified_artist = true;
    assert!(h.membership.check_eligibility(&artist).await.unwrap().eligible);

    h.membership
        .register_member(&artist, Registration::default(), h.admin)
        .await
        .unwrap();
    let member_now = h.membership.check_eligibility(&artist).await.unwrap();
    assert!(!member_now.eligible);
    assert_eq!(member_now.reasons.len(), 1);
}

#[tokio::test]
async fn test_member_stats_and_summary() {
    let h = harness().await;
    let active = h.active_member().await;
    h.pending_member().await;
    h.deposit(active.savings.id, dec!(700)).await;
    h.deposit(active.shares.id, dec!(300)).await;

    let stats = h
        .membership
        .calculate_member_stats(active.member.id)
        .await
        .unwrap();
    assert_eq!(stats.accounts.len(), 2);
    assert_eq!(stats.transaction_count, 2);
    assert_eq!(stats.active_loans, 0);
    assert_eq!(stats.member.total_savings, dec!(700));

    let summary = h.membership.get_membership_summary().await.unwrap();
    assert_eq!(summary.total_members, 2);
    assert_eq!(summary.active, 1);
    assert_eq!(summary.pending_approval, 1);
    assert_eq!(summary.regular, 2);
    assert_eq!(summary.total_savings, dec!(700));
    assert_eq!(summary.total_shares, dec!(300));
}

#[tokio::test]
async fn test_reconciliation_detects_and_repairs_drift() {
    let h = harness().await;
    let fixture = h.active_member().await;
    h.deposit(fixture.savings.id, dec!(500)).await;

    let clean = h
        .membership
        .reconcile_member_totals(fixture.member.id, false, h.admin)
        .await
        .unwrap();
    assert!(clean.is_balanced());

    let mut drifted: members::ActiveModel = h.member(fixture.member.id).await.into();
    drifted.total_savings = Set(dec!(999));
    drifted.update(h.ctx.db()).await.unwrap();

    let report = h
        .membership
        .reconcile_member_totals(fixture.member.id, false, h.admin)
        .await
        .unwrap();
    assert!(!report.is_balanced());
    assert!(!report.repaired);
    assert_eq!(report.recorded.savings, dec!(999));
    assert_eq!(report.computed.savings, dec!(500));
    assert_eq!(h.member(fixture.member.id).await.total_savings, dec!(999));

    let repaired = h
        .membership
        .reconcile_member_totals(fixture.member.id, true, h.admin)
        .await
        .unwrap();
    assert!(repaired.repaired);
    assert_eq!(h.member(fixture.member.id).await.total_savings, dec!(500));

    let audit = AuditLogRepository::for_subject(h.ctx.db(), AuditSubject::Member, fixture.member.id)
        .await
        .unwrap();
    assert!(audit.iter().any(|row| row.action == "member_totals_repaired"));

    let after = h
        .membership
        .reconcile_member_totals(fixture.member.id, true, h.admin)
        .await
        .unwrap();
    assert!(after.is_balanced());
    assert!(!after.repaired);
}
