#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `GeoJSON` ingestion and map-query layer for the water watch dashboard.
//!
//! The pipeline is: a feature collection (bulk file or user upload) goes
//! through [`normalize`] to produce entity records, [`ingest`]
//! deduplicates and persists them, and the map client reads them back
//! through [`queries`] (multi-dimensional filters), [`geojson`]
//! (feature-collection serialization), and [`search`] (substring lookup
//! across the three entity kinds).

pub mod geojson;
pub mod ingest;
pub mod normalize;
pub mod queries;
pub mod search;

use thiserror::Error;

/// Errors from dashboard operations.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// A database query or command failed.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The uploaded document is not a `FeatureCollection`.
    #[error("Invalid GeoJSON format")]
    InvalidFormat,
}
