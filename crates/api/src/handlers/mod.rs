pub mod admin_tc;
pub mod tc;
