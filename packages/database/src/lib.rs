#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `SQLite` connection bootstrap and schema creation for water watch.
//!
//! All durable state lives in a single `SQLite` database behind
//! `switchy_database`; this crate owns opening it and creating the
//! tables idempotently at startup. The incident table has no
//! uniqueness constraint on (name, `incident_type`): deduplication is
//! a check-then-insert in the ingestion pipeline, so concurrent uploads
//! of the same feature can race. See the repository `DESIGN.md`.

use std::path::Path;

use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;
use thiserror::Error;

/// Default path for the water watch database.
pub const DEFAULT_DB_PATH: &str = "data/water_watch.db";

/// Errors from database bootstrap.
#[derive(Debug, Error)]
pub enum DbError {
    /// Opening the `SQLite` database failed.
    #[error("Failed to open database: {0}")]
    Connect(String),

    /// A schema statement failed.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens (or creates) the database and ensures the schema exists.
///
/// Passing `None` opens an in-memory database, which is what the test
/// suites use.
///
/// # Errors
///
/// Returns [`DbError`] if the database cannot be opened or schema
/// creation fails.
pub async fn open_db(path: Option<&Path>) -> Result<Box<dyn Database>, DbError> {
    if let Some(parent) = path.and_then(Path::parent) {
        std::fs::create_dir_all(parent)?;
    }

    let db = init_sqlite_rusqlite(path).map_err(|e| DbError::Connect(e.to_string()))?;

    ensure_schema(db.as_ref()).await?;

    Ok(db)
}

/// Creates all tables and indexes if they don't already exist.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS municipalities (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT '',
            population_2021 INTEGER NOT NULL DEFAULT 0,
            geometry        TEXT NOT NULL,
            properties      TEXT NOT NULL DEFAULT '{}'
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS parks (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            location    TEXT NOT NULL DEFAULT '',
            management  TEXT NOT NULL DEFAULT '',
            owner       TEXT NOT NULL DEFAULT '',
            park_class  TEXT NOT NULL DEFAULT '',
            url         TEXT NOT NULL DEFAULT '',
            geometry    TEXT NOT NULL,
            properties  TEXT NOT NULL DEFAULT '{}'
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS users (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email    TEXT NOT NULL DEFAULT '',
            password TEXT NOT NULL DEFAULT ''
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS incidents (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            name          TEXT NOT NULL,
            incident_type TEXT NOT NULL,
            status        TEXT NOT NULL,
            started_at    TEXT,
            description   TEXT NOT NULL DEFAULT '',
            geometry      TEXT NOT NULL,
            properties    TEXT NOT NULL DEFAULT '{}',
            uploaded_by   INTEGER REFERENCES users(id) ON DELETE SET NULL,
            created_at    TEXT NOT NULL
        )",
    )
    .await?;

    // Non-unique: the duplicate policy is enforced by the ingestion
    // pipeline, not the storage layer.
    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_incidents_name_type
         ON incidents (name, incident_type)",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS uploaded_files (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            file_path       TEXT NOT NULL,
            uploaded_by     INTEGER REFERENCES users(id) ON DELETE SET NULL,
            uploaded_at     TEXT NOT NULL,
            processed       INTEGER NOT NULL DEFAULT 0,
            incidents_added INTEGER NOT NULL DEFAULT 0
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS posts (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            content     TEXT NOT NULL,
            date_posted TEXT NOT NULL,
            author_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            incident_id INTEGER REFERENCES incidents(id) ON DELETE CASCADE
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS comments (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            author_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            content     TEXT NOT NULL,
            date_posted TEXT NOT NULL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS likes (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            post_id    INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            UNIQUE (user_id, post_id)
        )",
    )
    .await?;

    // Enable foreign key enforcement (SQLite has it off by default)
    db.exec_raw("PRAGMA foreign_keys = ON").await?;

    log::debug!("Database schema ensured");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let db = open_db(None).await.unwrap();
        ensure_schema(db.as_ref()).await.unwrap();
        ensure_schema(db.as_ref()).await.unwrap();
    }
}
