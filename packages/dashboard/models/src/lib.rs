#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entity records and filter parameter types for the dashboard.
//!
//! Normalized types are what the feature normalizer produces from raw
//! `GeoJSON` features, before a database id exists. Row types are the
//! same entities as read back from the database. Geometry is carried as
//! an opaque [`serde_json::Value`] and the open properties mapping as an
//! ordered [`serde_json::Map`]; both are source-dataset passthrough and
//! never interpreted beyond serialization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A municipality as produced by the feature normalizer, not yet saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMunicipality {
    /// Municipality name.
    pub name: String,
    /// Status category (`city`, `town`, `rm`; free text in practice).
    pub status: String,
    /// 2021 census population, coerced to a non-negative integer.
    pub population_2021: i64,
    /// Raw `GeoJSON` geometry object.
    pub geometry: Value,
    /// Source-dataset properties, carried through verbatim.
    pub properties: Map<String, Value>,
}

/// A park as produced by the feature normalizer, not yet saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPark {
    /// Park name.
    pub name: String,
    /// Location description.
    pub location: String,
    /// Management authority.
    pub management: String,
    /// Owning body.
    pub owner: String,
    /// Park classification.
    pub park_class: String,
    /// Informational URL.
    pub url: String,
    /// Raw `GeoJSON` geometry object.
    pub geometry: Value,
    /// Source-dataset properties, carried through verbatim.
    pub properties: Map<String, Value>,
}

/// An incident as produced by the feature normalizer, not yet saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedIncident {
    /// Incident name.
    pub name: String,
    /// Incident type (`wildfire`, `flood`, ...; stored as free text).
    pub incident_type: String,
    /// Confirmation status (`confirmed` or `suspected`).
    pub status: String,
    /// Date the incident started, when one could be parsed.
    pub started_at: Option<NaiveDate>,
    /// Free-text description.
    pub description: String,
    /// Raw `GeoJSON` geometry object.
    pub geometry: Value,
    /// Source-dataset properties, carried through verbatim.
    pub properties: Map<String, Value>,
}

/// A municipality row as retrieved from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalityRow {
    /// Primary key.
    pub id: i64,
    /// Municipality name.
    pub name: String,
    /// Status category.
    pub status: String,
    /// 2021 census population.
    pub population_2021: i64,
    /// Raw `GeoJSON` geometry object.
    pub geometry: Value,
    /// Source-dataset properties.
    pub properties: Map<String, Value>,
}

/// A park row as retrieved from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkRow {
    /// Primary key.
    pub id: i64,
    /// Park name.
    pub name: String,
    /// Location description.
    pub location: String,
    /// Management authority.
    pub management: String,
    /// Owning body.
    pub owner: String,
    /// Park classification.
    pub park_class: String,
    /// Informational URL.
    pub url: String,
    /// Raw `GeoJSON` geometry object.
    pub geometry: Value,
    /// Source-dataset properties.
    pub properties: Map<String, Value>,
}

/// An incident row as retrieved from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRow {
    /// Primary key.
    pub id: i64,
    /// Incident name.
    pub name: String,
    /// Incident type, free text.
    pub incident_type: String,
    /// Confirmation status.
    pub status: String,
    /// Date the incident started.
    pub started_at: Option<NaiveDate>,
    /// Free-text description.
    pub description: String,
    /// Raw `GeoJSON` geometry object.
    pub geometry: Value,
    /// Source-dataset properties.
    pub properties: Map<String, Value>,
    /// User that uploaded this incident, if any. Cleared when the
    /// account is removed.
    pub uploaded_by: Option<i64>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}

/// An upload record as retrieved from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFileRow {
    /// Primary key.
    pub id: i64,
    /// Path of the stored file.
    pub file_path: String,
    /// User that performed the upload, if known.
    pub uploaded_by: Option<i64>,
    /// Upload timestamp (RFC 3339).
    pub uploaded_at: String,
    /// Whether the ingestion pipeline has run for this file.
    pub processed: bool,
    /// Number of incidents the pipeline added from this file.
    pub incidents_added: i64,
}

/// Filter parameters for the municipality layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MunicipalityFilter {
    /// Include municipalities with status `city`.
    pub include_city: bool,
    /// Include municipalities with status `town`.
    pub include_town: bool,
    /// Include rural municipalities (`rm` and its long form).
    pub include_rm: bool,
    /// Inclusive minimum population.
    pub pop_min: i64,
    /// Inclusive maximum population.
    pub pop_max: i64,
}

/// Filter parameters for the incident layer.
///
/// Each enabled toggle contributes to an allowed set; a record matches
/// only when its type and status are both in their allowed sets. All
/// toggles off therefore matches nothing, never everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentFilter {
    /// Include wildfire incidents.
    pub show_wildfires: bool,
    /// Include flood incidents.
    pub show_floods: bool,
    /// Include confirmed incidents.
    pub show_confirmed: bool,
    /// Include suspected incidents.
    pub show_suspected: bool,
}

impl IncidentFilter {
    /// Incident types allowed by the enabled toggles.
    #[must_use]
    pub fn allowed_types(&self) -> Vec<&'static str> {
        let mut types = Vec::new();
        if self.show_wildfires {
            types.push("wildfire");
        }
        if self.show_floods {
            types.push("flood");
        }
        types
    }

    /// Incident statuses allowed by the enabled toggles.
    #[must_use]
    pub fn allowed_statuses(&self) -> Vec<&'static str> {
        let mut statuses = Vec::new();
        if self.show_confirmed {
            statuses.push("confirmed");
        }
        if self.show_suspected {
            statuses.push("suspected");
        }
        statuses
    }
}

/// The full filter set the map client sends to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapFilters {
    /// Municipality layer filters.
    pub municipalities: MunicipalityFilter,
    /// Incident layer filters.
    pub incidents: IncidentFilter,
    /// Whether the park layer is shown at all.
    pub show_parks: bool,
}

/// Counts reported by the ingestion pipeline for one upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Records inserted.
    pub added: u64,
    /// Records skipped as content-level duplicates.
    pub duplicates: u64,
}

/// Aggregate counts for the dashboard view, computed over the filtered
/// entity sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Number of municipalities matching the filters.
    pub municipality_count: u64,
    /// Sum of the matching municipalities' populations.
    pub total_population: i64,
    /// Wildfire incidents within the filtered incident set.
    pub wildfire_count: u64,
    /// Flood incidents within the filtered incident set.
    pub flood_count: u64,
    /// Parks shown (zero when the layer is off).
    pub park_count: u64,
}

/// One search hit: a display label, a human-readable kind, and the raw
/// geometry to pan the map to. No ids, no properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Display label, e.g. `"City of Winnipeg, MB"`.
    pub label: String,
    /// Human-readable type label, e.g. `"Park"` or `"Wildfire"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Raw `GeoJSON` geometry of the matched record.
    pub geometry: Value,
}
