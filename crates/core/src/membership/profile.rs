//! Platform user facts consumed by membership rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the membership rules need to know about a platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Platform user id.
    pub user_id: Uuid,
    /// When the user verified their email, if ever.
    pub email_verified_at: Option<DateTime<Utc>>,
    /// When the platform account was created.
    pub registered_at: DateTime<Utc>,
    /// Holds a verified artist profile.
    pub is_verified_artist: bool,
    /// Holds an active premium subscription.
    pub has_active_premium: bool,
}

impl UserProfile {
    /// Returns true if the email address is verified.
    #[must_use]
    pub fn is_email_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    /// Whole days since registration, as of `now`.
    #[must_use]
    pub fn account_age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.registered_at).num_days()
    }
}
