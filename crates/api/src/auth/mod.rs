//! Authentication primitives for the admin surface.
//!
//! - [`jwt`] -- HS256 access-token generation and validation.

pub mod jwt;
