//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod tc_record_repo;
pub mod verification_attempt_repo;

pub use tc_record_repo::TcRecordRepo;
pub use verification_attempt_repo::{BudgetCheck, VerificationAttemptRepo};
