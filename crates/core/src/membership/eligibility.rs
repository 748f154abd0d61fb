//! Membership eligibility.

use chrono::{DateTime, Utc};
use sacco_shared::config::MembershipPolicy;
use serde::{Deserialize, Serialize};

use super::UserProfile;

/// Policy knobs used by membership rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipRules {
    /// Only verified artists may join.
    pub artists_only: bool,
    /// Minimum account age in days.
    pub min_account_age_days: i64,
    /// Approve every automatic enrollment.
    pub auto_approve_all: bool,
    /// Account age after which a verified user is auto-approved.
    pub auto_approve_account_age_days: i64,
}

impl From<&MembershipPolicy> for MembershipRules {
    fn from(policy: &MembershipPolicy) -> Self {
        Self {
            artists_only: policy.artists_only,
            min_account_age_days: policy.min_account_age_days,
            auto_approve_all: policy.auto_approve_all,
            auto_approve_account_age_days: policy.auto_approve_account_age_days,
        }
    }
}

/// Outcome of a membership eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEligibility {
    /// True when every check passed.
    pub eligible: bool,
    /// One entry per failed check.
    pub reasons: Vec<String>,
}

/// Evaluates every membership check for `profile`.
#[must_use]
pub fn check_membership_eligibility(
    profile: &UserProfile,
    already_member: bool,
    rules: &MembershipRules,
    now: DateTime<Utc>,
) -> MembershipEligibility {
    let mut reasons = Vec::new();

    if already_member {
        reasons.push("User is already a SACCO member".to_string());
    }
    if !profile.is_email_verified() {
        reasons.push("Email address must be verified".to_string());
    }
    let age = profile.account_age_days(now);
    if age < rules.min_account_age_days {
        reasons.push(format!(
            "Account must be at least {} days old (currently {age})",
            rules.min_account_age_days
        ));
    }
    if rules.artists_only && !profile.is_verified_artist {
        reasons.push("Membership is limited to verified artists".to_string());
    }

    MembershipEligibility {
        eligible: reasons.is_empty(),
        reasons,
    }
}
