//! Repository layer for database operations.
//!
//! Repositories are stateless: every function takes the connection to run
//! on, so the same query works against the pool for reads and inside a
//! service's database transaction for writes. Functions named `lock*`
//! issue `SELECT ... FOR UPDATE` and must only be called inside a
//! transaction.

pub mod account;
pub mod audit;
pub mod loan;
pub mod member;
pub mod transaction;

pub use account::AccountRepository;
pub use audit::AuditLogRepository;
pub use loan::LoanRepository;
pub use member::MemberRepository;
pub use transaction::TransactionRepository;
