//! # TeamTrack Shared Library
//!
//! This crate contains the types and business logic shared by the TeamTrack
//! API server: database models, authentication/authorization, and the task
//! graph engine.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, teams, projects, tasks)
//! - `auth`: Password hashing, JWT tokens, and the authorization policy
//! - `graph`: Task graph engine (validation and mutation of the task graph)
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod graph;
pub mod models;

/// Current version of the TeamTrack shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
