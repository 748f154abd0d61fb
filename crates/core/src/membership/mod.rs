//! Membership rules.
//!
//! - Eligibility of a platform user to join (all checks evaluated)
//! - Auto-enrollment tier and approval decision
//! - Member and account number formats

pub mod eligibility;
pub mod enrollment;
pub mod number;
pub mod profile;

pub use eligibility::{MembershipEligibility, MembershipRules, check_membership_eligibility};
pub use enrollment::{EnrollmentDecision, MembershipTier, decide_enrollment};
pub use number::{account_number, format_member_number};
pub use profile::UserProfile;
