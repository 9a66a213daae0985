#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Community blog for the water watch platform: posts, comments, and
//! likes, plus the bulk loaders that seed them from JSON fixtures.
//!
//! Authentication is an external collaborator; every operation that
//! acts on behalf of a user takes an explicit user id. Ownership is
//! still enforced here: deleting another user's post or comment is a
//! [`BlogError::Forbidden`].

pub mod loaders;
pub mod queries;

use thiserror::Error;

/// Errors from blog operations.
#[derive(Debug, Error)]
pub enum BlogError {
    /// A database query or command failed.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The referenced record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The acting user does not own the record.
    #[error("Only the author may do that")]
    Forbidden,
}
