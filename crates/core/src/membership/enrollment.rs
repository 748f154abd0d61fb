//! Auto-enrollment tiering.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MembershipRules, UserProfile};

/// Membership tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipTier {
    /// Default tier.
    Regular,
    /// Artists and premium subscribers.
    Associate,
}

impl MembershipTier {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Associate => "associate",
        }
    }
}

impl fmt::Display for MembershipTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an automatically created membership starts out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentDecision {
    /// Tier to assign.
    pub tier: MembershipTier,
    /// Whether the membership is approved on creation.
    pub auto_approve: bool,
}

/// Decides tier and approval for an automatic enrollment.
#[must_use]
pub fn decide_enrollment(
    profile: &UserProfile,
    rules: &MembershipRules,
    now: DateTime<Utc>,
) -> EnrollmentDecision {
    let tier = if profile.is_verified_artist || profile.has_active_premium {
        MembershipTier::Associate
    } else {
        MembershipTier::Regular
    };

    let seasoned = profile.is_email_verified()
        && profile.account_age_days(now) > rules.auto_approve_account_age_days;
    let auto_approve = rules.auto_approve_all
        || profile.is_verified_artist
        || profile.has_active_premium
        || seasoned;

    EnrollmentDecision { tier, auto_approve }
}
