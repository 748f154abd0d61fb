//! Actor and audit vocabulary.
//!
//! Every state-changing operation records one [`AuditEvent`] inside the same
//! database transaction as the change it describes. The event names the
//! action, the subject entity and before/after snapshots; the acting user is
//! passed explicitly as an [`Actor`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Who is performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// Scheduled sweeps and other system-initiated work.
    System,
    /// An authenticated platform user.
    User(Uuid),
}

impl Actor {
    /// Returns the user id, or `None` for system work.
    #[must_use]
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Self::System => None,
            Self::User(id) => Some(*id),
        }
    }

    /// Returns true for system-initiated work.
    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }
}

/// Audited action names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Account opened.
    AccountOpened,
    /// Cash deposited.
    Deposit,
    /// Cash withdrawn.
    Withdrawal,
    /// Funds moved between two accounts.
    Transfer,
    /// Monthly interest credited.
    Interest,
    /// Account frozen.
    AccountFrozen,
    /// Account unfrozen.
    AccountUnfrozen,
    /// Account closed.
    AccountClosed,
    /// Loan product created.
    LoanProductCreated,
    /// Loan application submitted.
    LoanApplied,
    /// Loan approved.
    LoanApproved,
    /// Loan rejected.
    LoanRejected,
    /// Loan funds released.
    LoanDisbursed,
    /// Loan repayment recorded.
    LoanRepayment,
    /// Loan flagged as defaulted.
    LoanDefaulted,
    /// Member registered.
    MemberRegistered,
    /// Member approved.
    MemberApproved,
    /// Member suspended.
    MemberSuspended,
    /// Member reactivated.
    MemberReactivated,
    /// Denormalized member totals rewritten from source rows.
    MemberTotalsRepaired,
}

impl AuditAction {
    /// Returns the persisted action name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountOpened => "account_opened",
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
            Self::Interest => "interest",
            Self::AccountFrozen => "account_frozen",
            Self::AccountUnfrozen => "account_unfrozen",
            Self::AccountClosed => "account_closed",
            Self::LoanProductCreated => "loan_product_created",
            Self::LoanApplied => "loan_applied",
            Self::LoanApproved => "loan_approved",
            Self::LoanRejected => "loan_rejected",
            Self::LoanDisbursed => "loan_disbursed",
            Self::LoanRepayment => "loan_repayment",
            Self::LoanDefaulted => "loan_defaulted",
            Self::MemberRegistered => "member_registered",
            Self::MemberApproved => "member_approved",
            Self::MemberSuspended => "member_suspended",
            Self::MemberReactivated => "member_reactivated",
            Self::MemberTotalsRepaired => "member_totals_repaired",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of entity an audit event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSubject {
    /// `sacco_members` row.
    Member,
    /// `sacco_accounts` row.
    Account,
    /// `sacco_loans` row.
    Loan,
    /// `sacco_loan_products` row.
    LoanProduct,
}

impl AuditSubject {
    /// Returns the persisted subject type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Account => "account",
            Self::Loan => "loan",
            Self::LoanProduct => "loan_product",
        }
    }
}

/// One append-only audit record, before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    /// What happened.
    pub action: AuditAction,
    /// Kind of entity it happened to.
    pub subject: AuditSubject,
    /// Id of that entity.
    pub subject_id: Uuid,
    /// Snapshot before the change.
    pub old_values: Option<Value>,
    /// Snapshot after the change.
    pub new_values: Option<Value>,
}

impl AuditEvent {
    /// Starts an event with no snapshots.
    #[must_use]
    pub fn new(action: AuditAction, subject: AuditSubject, subject_id: Uuid) -> Self {
        Self {
            action,
            subject,
            subject_id,
            old_values: None,
            new_values: None,
        }
    }

    /// Attaches the before snapshot.
    #[must_use]
    pub fn with_old(mut self, values: Value) -> Self {
        self.old_values = Some(values);
        self
    }

    /// Attaches the after snapshot.
    #[must_use]
    pub fn with_new(mut self, values: Value) -> Self {
        self.new_values = Some(values);
        self
    }
}
