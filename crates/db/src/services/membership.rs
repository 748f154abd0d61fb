//! Membership service: registration, approval, suspension, automatic
//! enrollment and member-level reporting.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use sacco_core::membership::{
    MembershipEligibility, MembershipRules, UserProfile, check_membership_eligibility,
    decide_enrollment,
};
use sacco_core::{Actor, AuditAction, AuditEvent, AuditSubject};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseTransaction, Set};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::ServiceContext;
use super::ledger::{create_account, default_rate, set_account_status};
use crate::entities::{
    accounts, members,
    sea_orm_active_enums::{AccountStatus, AccountType, LoanStatus, MemberStatus, MembershipType},
};
use crate::error::{SaccoError, SaccoResult};
use crate::repositories::{
    AccountRepository, AuditLogRepository, LoanRepository, MemberRepository,
    TransactionRepository,
};

/// Input for a manual registration.
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    /// Tier to register under.
    pub membership_type: MembershipType,
}

impl Default for Registration {
    fn default() -> Self {
        Self {
            membership_type: MembershipType::Regular,
        }
    }
}

/// Outcome of [`MembershipService::auto_create_membership`].
#[derive(Debug)]
pub enum AutoEnrollment {
    /// The user already had a membership.
    Existing(members::Model),
    /// A membership was created.
    Created(members::Model),
    /// Automatic enrollment is switched off and the user has no membership.
    Disabled,
    /// Creation failed; nothing was written.
    Failed(SaccoError),
}

impl AutoEnrollment {
    /// The membership, if there is one.
    #[must_use]
    pub fn member(&self) -> Option<&members::Model> {
        match self {
            Self::Existing(member) | Self::Created(member) => Some(member),
            Self::Disabled | Self::Failed(_) => None,
        }
    }
}

/// A member's denormalized totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemberTotals {
    /// Savings held.
    pub savings: Decimal,
    /// Share capital held.
    pub shares: Decimal,
    /// Loan balance owed.
    pub loans: Decimal,
}

impl MemberTotals {
    fn recorded(member: &members::Model) -> Self {
        Self {
            savings: member.total_savings,
            shares: member.total_shares,
            loans: member.total_loans,
        }
    }
}

/// Stored totals compared with totals recomputed from accounts and loans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TotalsReconciliation {
    /// Member id.
    pub member_id: Uuid,
    /// Totals stored on the member row before reconciliation.
    pub recorded: MemberTotals,
    /// Totals derived from account and loan balances.
    pub computed: MemberTotals,
    /// Whether the stored totals were overwritten.
    pub repaired: bool,
}

impl TotalsReconciliation {
    /// Returns true if the stored totals matched.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.recorded == self.computed
    }
}

/// Per-member figures.
#[derive(Debug, Clone, Serialize)]
pub struct MemberStats {
    /// The member.
    pub member: members::Model,
    /// The member's accounts.
    pub accounts: Vec<accounts::Model>,
    /// Ledger entries posted across all accounts.
    pub transaction_count: u64,
    /// Disbursed or active loans.
    pub active_loans: usize,
    /// Fully repaid loans.
    pub completed_loans: usize,
    /// Defaulted loans.
    pub defaulted_loans: usize,
    /// Principal received across all disbursed loans.
    pub total_borrowed: Decimal,
    /// Repayments made across all loans.
    pub total_repaid: Decimal,
}

/// Cooperative-wide membership figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MembershipSummary {
    /// Every member.
    pub total_members: usize,
    /// Members in good standing.
    pub active: usize,
    /// Members waiting for approval.
    pub pending_approval: usize,
    /// Suspended members.
    pub suspended: usize,
    /// Regular tier.
    pub regular: usize,
    /// Associate tier.
    pub associate: usize,
    /// Savings across all members.
    pub total_savings: Decimal,
    /// Share capital across all members.
    pub total_shares: Decimal,
    /// Loan balance across all members.
    pub total_loans: Decimal,
}

/// Membership lifecycle operations.
#[derive(Debug, Clone)]
pub struct MembershipService {
    ctx: ServiceContext,
}

impl MembershipService {
    /// Creates a new membership service.
    #[must_use]
    pub const fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Registers a platform user as a member pending approval.
    #[instrument(skip(self, profile), fields(user_id = %profile.user_id))]
    pub async fn register_member(
        &self,
        profile: &UserProfile,
        registration: Registration,
        actor: Actor,
    ) -> SaccoResult<members::Model> {
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        if MemberRepository::find_by_user(&txn, profile.user_id)
            .await?
            .is_some()
        {
            return Err(SaccoError::AlreadyMember(profile.user_id));
        }
        let member = self
            .create_member(&txn, profile.user_id, registration.membership_type, false, actor, now)
            .await?;
        txn.commit().await?;

        info!(member_id = %member.id, member_number = %member.member_number, "Member registered");
        Ok(member)
    }

    /// Approves a pending member and activates their accounts.
    #[instrument(skip(self))]
    pub async fn approve_member(&self, member_id: Uuid, actor: Actor) -> SaccoResult<members::Model> {
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let member = MemberRepository::lock(&txn, member_id).await?;
        if member.status != MemberStatus::PendingApproval {
            return Err(SaccoError::InvalidState(format!(
                "Member {} is {}, expected pending_approval",
                member.member_number,
                member.status.as_str()
            )));
        }
        let activated = cascade_accounts(&txn, member_id, AccountStatus::Active, now, |status| {
            status != AccountStatus::Closed
        })
        .await?;

        let mut active: members::ActiveModel = member.clone().into();
        active.status = Set(MemberStatus::Active);
        active.approved_at = Set(Some(now.into()));
        active.approved_by = Set(actor.id());
        active.updated_at = Set(now.into());
        let approved = active.update(&txn).await?;

        AuditLogRepository::record(
            &txn,
            AuditEvent::new(AuditAction::MemberApproved, AuditSubject::Member, member_id)
                .with_old(json!({ "status": member.status.as_str() }))
                .with_new(json!({ "status": approved.status.as_str(), "activated_accounts": activated })),
            actor,
            now,
        )
        .await?;
        txn.commit().await?;

        info!(member_id = %member_id, "Member approved");
        Ok(approved)
    }

    /// Suspends a member and freezes every open account.
    #[instrument(skip(self, reason))]
    pub async fn suspend_member(
        &self,
        member_id: Uuid,
        reason: &str,
        actor: Actor,
    ) -> SaccoResult<members::Model> {
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let member = MemberRepository::lock(&txn, member_id).await?;
        let frozen = cascade_accounts(&txn, member_id, AccountStatus::Frozen, now, |status| {
            status != AccountStatus::Closed
        })
        .await?;

        let mut active: members::ActiveModel = member.clone().into();
        active.status = Set(MemberStatus::Suspended);
        active.suspended_at = Set(Some(now.into()));
        active.suspension_reason = Set(Some(reason.to_string()));
        active.updated_at = Set(now.into());
        let suspended = active.update(&txn).await?;

        AuditLogRepository::record(
            &txn,
            AuditEvent::new(AuditAction::MemberSuspended, AuditSubject::Member, member_id)
                .with_old(json!({ "status": member.status.as_str() }))
                .with_new(json!({
                    "status": suspended.status.as_str(),
                    "reason": reason,
                    "frozen_accounts": frozen,
                })),
            actor,
            now,
        )
        .await?;
        txn.commit().await?;

        warn!(member_id = %member_id, reason, "Member suspended");
        Ok(suspended)
    }

    /// Lifts a suspension and unfreezes the frozen accounts.
    #[instrument(skip(self))]
    pub async fn reactivate_member(
        &self,
        member_id: Uuid,
        actor: Actor,
    ) -> SaccoResult<members::Model> {
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        let member = MemberRepository::lock(&txn, member_id).await?;
        if member.status != MemberStatus::Suspended {
            return Err(SaccoError::InvalidState(format!(
                "Member {} is {}, expected suspended",
                member.member_number,
                member.status.as_str()
            )));
        }
        let restored = cascade_accounts(&txn, member_id, AccountStatus::Active, now, |status| {
            status == AccountStatus::Frozen
        })
        .await?;

        let mut active: members::ActiveModel = member.clone().into();
        active.status = Set(MemberStatus::Active);
        active.suspended_at = Set(None);
        active.suspension_reason = Set(None);
        active.updated_at = Set(now.into());
        let reactivated = active.update(&txn).await?;

        AuditLogRepository::record(
            &txn,
            AuditEvent::new(AuditAction::MemberReactivated, AuditSubject::Member, member_id)
                .with_old(json!({
                    "status": member.status.as_str(),
                    "suspension_reason": member.suspension_reason,
                }))
                .with_new(json!({
                    "status": reactivated.status.as_str(),
                    "restored_accounts": restored,
                })),
            actor,
            now,
        )
        .await?;
        txn.commit().await?;

        info!(member_id = %member_id, "Member reactivated");
        Ok(reactivated)
    }

    /// Evaluates every membership rule for a platform user.
    pub async fn check_eligibility(&self, profile: &UserProfile) -> SaccoResult<MembershipEligibility> {
        let already = MemberRepository::find_by_user(self.ctx.db(), profile.user_id)
            .await?
            .is_some();
        Ok(check_membership_eligibility(
            profile,
            already,
            &self.rules(),
            self.ctx.now(),
        ))
    }

    /// Enrolls a platform user without administrator involvement.
    ///
    /// Never returns an error: failures are logged and reported as
    /// [`AutoEnrollment::Failed`].
    #[instrument(skip(self, profile), fields(user_id = %profile.user_id))]
    pub async fn auto_create_membership(&self, profile: &UserProfile) -> AutoEnrollment {
        match self.try_auto_create(profile).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(user_id = %profile.user_id, error = %err, "Automatic enrollment failed");
                AutoEnrollment::Failed(err)
            }
        }
    }

    /// Figures for one member.
    pub async fn calculate_member_stats(&self, member_id: Uuid) -> SaccoResult<MemberStats> {
        let db = self.ctx.db();
        let member = MemberRepository::find(db, member_id).await?;
        let accounts = AccountRepository::list_for_member(db, member_id).await?;
        let transaction_count = TransactionRepository::count_for_member(db, member_id).await?;
        let loans = LoanRepository::list_for_member(db, member_id).await?;

        let count = |status: LoanStatus| loans.iter().filter(|loan| loan.status == status).count();
        Ok(MemberStats {
            active_loans: loans.iter().filter(|loan| loan.status.is_active()).count(),
            completed_loans: count(LoanStatus::Completed),
            defaulted_loans: count(LoanStatus::Defaulted),
            total_borrowed: loans
                .iter()
                .filter(|loan| loan.disbursed_date.is_some())
                .map(|loan| loan.principal_amount)
                .sum(),
            total_repaid: loans.iter().map(|loan| loan.amount_paid).sum(),
            member,
            accounts,
            transaction_count,
        })
    }

    /// Figures across every member.
    pub async fn get_membership_summary(&self) -> SaccoResult<MembershipSummary> {
        let all = MemberRepository::list(self.ctx.db()).await?;
        let mut summary = MembershipSummary {
            total_members: all.len(),
            ..MembershipSummary::default()
        };
        for member in &all {
            match member.status {
                MemberStatus::Active => summary.active += 1,
                MemberStatus::PendingApproval => summary.pending_approval += 1,
                MemberStatus::Suspended => summary.suspended += 1,
            }
            match member.membership_type {
                MembershipType::Regular => summary.regular += 1,
                MembershipType::Associate => summary.associate += 1,
            }
            summary.total_savings += member.total_savings;
            summary.total_shares += member.total_shares;
            summary.total_loans += member.total_loans;
        }
        Ok(summary)
    }

    /// Recomputes a member's totals from account and loan balances.
    ///
    /// With `repair` the member row is locked and overwritten when the
    /// stored totals drifted.
    #[instrument(skip(self))]
    pub async fn reconcile_member_totals(
        &self,
        member_id: Uuid,
        repair: bool,
        actor: Actor,
    ) -> SaccoResult<TotalsReconciliation> {
        if !repair {
            let db = self.ctx.db();
            let member = MemberRepository::find(db, member_id).await?;
            let computed = computed_totals(db, member_id).await?;
            return Ok(TotalsReconciliation {
                member_id,
                recorded: MemberTotals::recorded(&member),
                computed,
                repaired: false,
            });
        }

        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;
        let member = MemberRepository::lock(&txn, member_id).await?;
        AccountRepository::lock_for_member(&txn, member_id).await?;
        let recorded = MemberTotals::recorded(&member);
        let computed = computed_totals(&txn, member_id).await?;
        if recorded == computed {
            return Ok(TotalsReconciliation {
                member_id,
                recorded,
                computed,
                repaired: false,
            });
        }

        let mut active: members::ActiveModel = member.into();
        active.total_savings = Set(computed.savings);
        active.total_shares = Set(computed.shares);
        active.total_loans = Set(computed.loans);
        active.updated_at = Set(now.into());
        active.update(&txn).await?;

        AuditLogRepository::record(
            &txn,
            AuditEvent::new(AuditAction::MemberTotalsRepaired, AuditSubject::Member, member_id)
                .with_old(serde_json::to_value(recorded)?)
                .with_new(serde_json::to_value(computed)?),
            actor,
            now,
        )
        .await?;
        txn.commit().await?;

        warn!(member_id = %member_id, "Member totals drifted and were repaired");
        Ok(TotalsReconciliation {
            member_id,
            recorded,
            computed,
            repaired: true,
        })
    }

    fn rules(&self) -> MembershipRules {
        MembershipRules::from(&self.ctx.config().membership)
    }

    async fn try_auto_create(&self, profile: &UserProfile) -> SaccoResult<AutoEnrollment> {
        let now = self.ctx.now();
        let txn = self.ctx.begin().await?;

        if let Some(existing) = MemberRepository::find_by_user(&txn, profile.user_id).await? {
            return Ok(AutoEnrollment::Existing(existing));
        }
        if !self.ctx.config().membership.auto_enrollment_enabled {
            debug!("Automatic enrollment disabled");
            return Ok(AutoEnrollment::Disabled);
        }
        let decision = decide_enrollment(profile, &self.rules(), now);
        let created = self
            .create_member(
                &txn,
                profile.user_id,
                decision.tier.into(),
                decision.auto_approve,
                Actor::System,
                now,
            )
            .await;
        let member = match created {
            Ok(member) => member,
            // Lost the race to a concurrent enrollment of the same user
            Err(SaccoError::AlreadyMember(_)) => {
                let existing = MemberRepository::find_by_user(&txn, profile.user_id)
                    .await?
                    .ok_or_else(|| {
                        SaccoError::Internal(format!(
                            "membership for user {} vanished",
                            profile.user_id
                        ))
                    })?;
                return Ok(AutoEnrollment::Existing(existing));
            }
            Err(err) => return Err(err),
        };
        txn.commit().await?;

        info!(
            member_id = %member.id,
            member_number = %member.member_number,
            tier = member.membership_type.as_str(),
            auto_approved = decision.auto_approve,
            "Member enrolled automatically"
        );
        Ok(AutoEnrollment::Created(member))
    }

    /// Inserts a member with its shares and savings accounts.
    async fn create_member(
        &self,
        txn: &DatabaseTransaction,
        user_id: Uuid,
        membership_type: MembershipType,
        approved: bool,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> SaccoResult<members::Model> {
        let member_number = MemberRepository::next_member_number(txn, now.year()).await?;
        // Re-checked under the counter lock, which serializes member creation.
        if MemberRepository::find_by_user(txn, user_id).await?.is_some() {
            return Err(SaccoError::AlreadyMember(user_id));
        }
        let status = if approved {
            MemberStatus::Active
        } else {
            MemberStatus::PendingApproval
        };

        let member = members::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            member_number: Set(member_number),
            membership_type: Set(membership_type),
            status: Set(status),
            total_savings: Set(Decimal::ZERO),
            total_shares: Set(Decimal::ZERO),
            total_loans: Set(Decimal::ZERO),
            joined_date: Set(now.date_naive()),
            approved_at: Set(approved.then(|| now.into())),
            approved_by: Set(if approved { actor.id() } else { None }),
            suspended_at: Set(None),
            suspension_reason: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(txn)
        .await?;

        let policy = &self.ctx.config().accounts;
        create_account(
            txn,
            &member,
            AccountType::Shares,
            AccountStatus::Active,
            default_rate(policy, AccountType::Shares),
            actor,
            now,
        )
        .await?;
        let savings_status = if approved {
            AccountStatus::Active
        } else {
            AccountStatus::Pending
        };
        create_account(
            txn,
            &member,
            AccountType::Savings,
            savings_status,
            default_rate(policy, AccountType::Savings),
            actor,
            now,
        )
        .await?;

        AuditLogRepository::record(
            txn,
            AuditEvent::new(AuditAction::MemberRegistered, AuditSubject::Member, member.id)
                .with_new(json!({
                    "user_id": user_id,
                    "member_number": member.member_number,
                    "membership_type": membership_type.as_str(),
                    "status": status.as_str(),
                })),
            actor,
            now,
        )
        .await?;

        Ok(member)
    }
}

/// Moves a member's accounts selected by `applies` to `target`, locking them
/// in ascending id order. Returns the ids that changed.
async fn cascade_accounts<F>(
    txn: &DatabaseTransaction,
    member_id: Uuid,
    target: AccountStatus,
    now: DateTime<Utc>,
    applies: F,
) -> SaccoResult<Vec<Uuid>>
where
    F: Fn(AccountStatus) -> bool,
{
    let mut changed = Vec::new();
    for account in AccountRepository::lock_for_member(txn, member_id).await? {
        if account.status != target && applies(account.status) {
            set_account_status(txn, &account, target, now).await?;
            changed.push(account.id);
        }
    }
    Ok(changed)
}

async fn computed_totals<C: ConnectionTrait>(conn: &C, member_id: Uuid) -> SaccoResult<MemberTotals> {
    let accounts = AccountRepository::list_for_member(conn, member_id).await?;
    let sum_of = |account_type: AccountType| -> Decimal {
        accounts
            .iter()
            .filter(|account| account.account_type == account_type)
            .map(|account| account.balance)
            .sum()
    };
    let loans = LoanRepository::outstanding_for_member(conn, member_id).await?;
    Ok(MemberTotals {
        savings: sum_of(AccountType::Savings),
        shares: sum_of(AccountType::Shares),
        loans: loans.iter().map(|loan| loan.balance).sum(),
    })
}
