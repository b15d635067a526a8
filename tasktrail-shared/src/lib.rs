//! # TaskTrail Shared Library
//!
//! Authentication, authorization and the audited write path shared by the
//! TaskTrail API server and its tooling.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, bearer tokens and the request authorization gate
//! - `db`: Connection pool and migrations
//! - `error`: Error classification into the external error contract
//! - `models`: Users, records and audit entries
//! - `repository`: Persistence boundary (Postgres and in-memory backends)

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;

/// Current version of the TaskTrail shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
