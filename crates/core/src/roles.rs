//! Well-known role name constants carried in admin access tokens.

pub const ROLE_ADMIN: &str = "admin";
