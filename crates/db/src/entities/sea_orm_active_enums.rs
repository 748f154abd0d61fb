//! `SeaORM` active enums for SACCO status and type columns.
//!
//! Values are stored as text so the schema stays portable between
//! PostgreSQL and SQLite.

use sacco_core::account::EntryDirection as CoreEntryDirection;
use sacco_core::loan::InterestMethod as CoreInterestMethod;
use sacco_core::membership::MembershipTier;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Membership tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum MembershipType {
    /// Default tier.
    #[sea_orm(string_value = "regular")]
    Regular,
    /// Artists and premium subscribers.
    #[sea_orm(string_value = "associate")]
    Associate,
}

impl MembershipType {
    /// Returns the string representation of the tier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Associate => "associate",
        }
    }
}

impl From<MembershipTier> for MembershipType {
    fn from(tier: MembershipTier) -> Self {
        match tier {
            MembershipTier::Regular => Self::Regular,
            MembershipTier::Associate => Self::Associate,
        }
    }
}

/// Member lifecycle status.
///
/// - PendingApproval → Active (approve)
/// - any → Suspended (suspend)
/// - Suspended → Active (reactivate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    /// Registered, waiting for an administrator.
    #[sea_orm(string_value = "pending_approval")]
    PendingApproval,
    /// Full member.
    #[sea_orm(string_value = "active")]
    Active,
    /// Suspended; every account is frozen.
    #[sea_orm(string_value = "suspended")]
    Suspended,
}

impl MemberStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }
}

/// Account type. A member holds at most one account of each type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Share capital.
    #[sea_orm(string_value = "shares")]
    Shares,
    /// Savings.
    #[sea_orm(string_value = "savings")]
    Savings,
    /// Checking; receives loan disbursements and pays repayments.
    #[sea_orm(string_value = "checking")]
    Checking,
}

impl AccountType {
    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shares => "shares",
            Self::Savings => "savings",
            Self::Checking => "checking",
        }
    }

    /// Suffix used in account numbers.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Shares => "SH",
            Self::Savings => "SV",
            Self::Checking => "CK",
        }
    }
}

/// Account status.
///
/// - Pending → Active (member approval)
/// - Active ⇄ Frozen (freeze / unfreeze, member suspension)
/// - Active | Frozen → Closed (zero balance only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Opened before membership approval.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepts entries.
    #[sea_orm(string_value = "active")]
    Active,
    /// Blocked from entries.
    #[sea_orm(string_value = "frozen")]
    Frozen,
    /// Closed permanently.
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl AccountStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Frozen => "frozen",
            Self::Closed => "closed",
        }
    }
}

/// Ledger entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Cash in.
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// Cash out.
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    /// One leg of a transfer.
    #[sea_orm(string_value = "transfer")]
    Transfer,
    /// Interest credit.
    #[sea_orm(string_value = "interest")]
    Interest,
    /// Fee deduction.
    #[sea_orm(string_value = "fee")]
    Fee,
    /// Loan repayment out of checking.
    #[sea_orm(string_value = "loan_repayment")]
    LoanRepayment,
}

/// Side of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum EntryDirection {
    /// Money in.
    #[sea_orm(string_value = "credit")]
    Credit,
    /// Money out.
    #[sea_orm(string_value = "debit")]
    Debit,
}

impl From<CoreEntryDirection> for EntryDirection {
    fn from(direction: CoreEntryDirection) -> Self {
        match direction {
            CoreEntryDirection::Credit => Self::Credit,
            CoreEntryDirection::Debit => Self::Debit,
        }
    }
}

impl From<EntryDirection> for CoreEntryDirection {
    fn from(direction: EntryDirection) -> Self {
        match direction {
            EntryDirection::Credit => Self::Credit,
            EntryDirection::Debit => Self::Debit,
        }
    }
}

/// Interest method of a loan product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum InterestMethod {
    /// Interest on the original principal.
    #[sea_orm(string_value = "flat")]
    Flat,
    /// Annuity on the outstanding principal.
    #[sea_orm(string_value = "reducing_balance")]
    ReducingBalance,
}

impl From<CoreInterestMethod> for InterestMethod {
    fn from(method: CoreInterestMethod) -> Self {
        match method {
            CoreInterestMethod::Flat => Self::Flat,
            CoreInterestMethod::ReducingBalance => Self::ReducingBalance,
        }
    }
}

impl From<InterestMethod> for CoreInterestMethod {
    fn from(method: InterestMethod) -> Self {
        match method {
            InterestMethod::Flat => Self::Flat,
            InterestMethod::ReducingBalance => Self::ReducingBalance,
        }
    }
}

/// Loan status.
///
/// The valid transitions are:
/// - PendingApproval → Approved | Rejected
/// - Approved → Disbursed
/// - Disbursed → Active (first repayment) | Completed | Defaulted
/// - Active → Completed | Defaulted
///
/// Completed, Defaulted and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Submitted, waiting for a decision.
    #[sea_orm(string_value = "pending_approval")]
    PendingApproval,
    /// Approved, not yet paid out.
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Refused.
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Paid out, no repayment yet.
    #[sea_orm(string_value = "disbursed")]
    Disbursed,
    /// Being repaid.
    #[sea_orm(string_value = "active")]
    Active,
    /// Fully repaid.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Written off.
    #[sea_orm(string_value = "defaulted")]
    Defaulted,
}

impl LoanStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Disbursed => "disbursed",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Defaulted => "defaulted",
        }
    }

    /// Returns true while money is owed (disbursed or active).
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Disbursed | Self::Active)
    }

    /// Returns true if no transition leaves this status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Defaulted | Self::Rejected)
    }

    /// Returns true if `next` is a valid transition from this status.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PendingApproval, Self::Approved | Self::Rejected)
                | (Self::Approved, Self::Disbursed)
                | (Self::Disbursed, Self::Active | Self::Completed | Self::Defaulted)
                | (Self::Active, Self::Completed | Self::Defaulted)
        )
    }
}
