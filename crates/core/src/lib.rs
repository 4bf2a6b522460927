//! Domain logic for the transfer-certificate portal.
//!
//! Nothing in this crate performs I/O beyond in-process locking, so the same
//! rules are shared by the HTTP layer, the repository layer, and tests.

pub mod admission;
pub mod artifact;
pub mod clock;
pub mod download_token;
pub mod error;
pub mod rate_limit;
pub mod roles;
pub mod search;
pub mod types;
pub mod verification;
