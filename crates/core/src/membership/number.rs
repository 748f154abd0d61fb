//! Member and account numbers.
//!
//! Member numbers are `SAC-<year>-<5-digit sequence>`. The sequence restarts
//! every year; uniqueness comes from the year prefix. Account numbers append
//! a type code to the owner's member number.

/// Prefix of every member number.
pub const MEMBER_PREFIX: &str = "SAC";

/// Formats a member number, e.g. `SAC-2025-00001`.
#[must_use]
pub fn format_member_number(year: i32, sequence: i64) -> String {
    format!("{MEMBER_PREFIX}-{year}-{sequence:05}")
}

/// Formats an account number, e.g. `SAC-2025-00001-SV`.
#[must_use]
pub fn account_number(member_number: &str, type_code: &str) -> String {
    format!("{member_number}-{type_code}")
}
