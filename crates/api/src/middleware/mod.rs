//! Request extractors shared by handlers.
//!
//! - [`auth`] -- JWT Bearer authentication ([`auth::AuthUser`]).
//! - [`rbac`] -- role checks built on top of `AuthUser`.
//! - [`client_ip`] -- the rate-limit key for public endpoints.

pub mod auth;
pub mod client_ip;
pub mod rbac;
