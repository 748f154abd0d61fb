//! Entity re-exports.

pub use super::accounts::Entity as Accounts;
pub use super::audit_logs::Entity as AuditLogs;
pub use super::loan_products::Entity as LoanProducts;
pub use super::loans::Entity as Loans;
pub use super::member_sequences::Entity as MemberSequences;
pub use super::members::Entity as Members;
pub use super::transactions::Entity as Transactions;
