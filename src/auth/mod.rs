//! Accounts, sessions and admin privilege.
//!
//! Users sign up and sign in with email and password and receive an opaque
//! bearer token. Tokens expire after the configured session TTL; expired rows
//! are purged by a background task. Admins are users listed in `admins`.

mod handler;
mod lib;
mod routes;

pub use lib::*;
pub use routes::routes;

pub fn migrations() -> &'static [(&'static str, &'static str)] {
    &[("auth_001_users.sql", include_str!("migrations/001_users.sql"))]
}
