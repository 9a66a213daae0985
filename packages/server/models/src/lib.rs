#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request/response types and server configuration for water watch.
//!
//! The map client sends its filter toggles as the string booleans
//! `"true"`/`"false"` (anything that isn't exactly `"true"` counts as
//! false, and an absent parameter defaults to true). Response bodies
//! mirror the shapes the map frontend consumes, so field naming is
//! uneven: dashboard filters echo back in snake case, the health
//! payload is camel case.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use water_watch_dashboard_models::{
    DashboardSummary, IncidentFilter, MapFilters, MunicipalityFilter,
};

/// Filter defaults applied when the dashboard query omits a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDefaults {
    /// Default inclusive minimum population.
    pub pop_min: i64,
    /// Default inclusive maximum population.
    pub pop_max: i64,
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            pop_min: 0,
            pop_max: 1_000_000,
        }
    }
}

/// Upload handling configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Directory uploaded files are stored in.
    pub dir: PathBuf,
    /// Maximum accepted upload size in bytes.
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/uploads"),
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Explicit server configuration. Filter defaults and the upload size
/// limit live here and are passed into the handlers through shared
/// state, never read as ambient globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Path of the `SQLite` database file.
    pub database_path: PathBuf,
    /// Directory of static frontend files.
    pub static_dir: PathBuf,
    /// Upload handling configuration.
    pub upload: UploadConfig,
    /// Dashboard filter defaults.
    pub filters: FilterDefaults,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            database_path: PathBuf::from("data/water_watch.db"),
            static_dir: PathBuf::from("app/dist"),
            upload: UploadConfig::default(),
            filters: FilterDefaults::default(),
        }
    }
}

impl ServerConfig {
    /// Builds a configuration from environment variables, falling back
    /// to the defaults above for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database_path: std::env::var("DATABASE_PATH")
                .map_or(defaults.database_path, PathBuf::from),
            static_dir: std::env::var("STATIC_DIR").map_or(defaults.static_dir, PathBuf::from),
            upload: UploadConfig {
                dir: std::env::var("UPLOAD_DIR")
                    .map_or_else(|_| UploadConfig::default().dir, PathBuf::from),
                max_bytes: std::env::var("MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(UploadConfig::default().max_bytes),
            },
            filters: FilterDefaults {
                pop_min: std::env::var("POP_MIN_DEFAULT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.filters.pop_min),
                pop_max: std::env::var("POP_MAX_DEFAULT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.filters.pop_max),
            },
        }
    }
}

/// Interprets a map-client boolean parameter: absent means true,
/// present means `== "true"`.
#[must_use]
pub fn flag(value: Option<&str>) -> bool {
    value.is_none_or(|v| v == "true")
}

/// Query parameters for the dashboard view.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardParams {
    /// Include `city` municipalities.
    pub status_city: Option<String>,
    /// Include `town` municipalities.
    pub status_town: Option<String>,
    /// Include rural municipalities.
    #[serde(rename = "statusRM")]
    pub status_rm: Option<String>,
    /// Inclusive minimum population.
    pub pop_min: Option<i64>,
    /// Inclusive maximum population.
    pub pop_max: Option<i64>,
    /// Include wildfire incidents.
    pub show_wildfires: Option<String>,
    /// Include flood incidents.
    pub show_floods: Option<String>,
    /// Include confirmed incidents.
    pub status_confirmed: Option<String>,
    /// Include suspected incidents.
    pub status_suspected: Option<String>,
    /// Show the park layer.
    pub show_parks: Option<String>,
}

impl DashboardParams {
    /// Resolves the raw parameters against the configured defaults.
    #[must_use]
    pub fn to_filters(&self, defaults: &FilterDefaults) -> MapFilters {
        MapFilters {
            municipalities: MunicipalityFilter {
                include_city: flag(self.status_city.as_deref()),
                include_town: flag(self.status_town.as_deref()),
                include_rm: flag(self.status_rm.as_deref()),
                pop_min: self.pop_min.unwrap_or(defaults.pop_min),
                pop_max: self.pop_max.unwrap_or(defaults.pop_max),
            },
            incidents: IncidentFilter {
                show_wildfires: flag(self.show_wildfires.as_deref()),
                show_floods: flag(self.show_floods.as_deref()),
                show_confirmed: flag(self.status_confirmed.as_deref()),
                show_suspected: flag(self.status_suspected.as_deref()),
            },
            show_parks: flag(self.show_parks.as_deref()),
        }
    }
}

/// Query parameters for the `GeoJSON` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoJsonParams {
    /// Which category to return: `all` (default), `municipalities`,
    /// `incidents`, or `parks`.
    #[serde(rename = "type")]
    pub data_type: Option<String>,
}

/// Query parameters for the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    /// Free-text query.
    pub q: Option<String>,
}

/// Body of the like-toggle request.
#[derive(Debug, Clone, Deserialize)]
pub struct LikeRequest {
    /// Post to toggle.
    pub post_id: i64,
    /// Acting user, supplied by the auth layer in front of this
    /// service.
    pub user_id: i64,
}

/// Body of the create-comment request.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentRequest {
    /// Acting user.
    pub user_id: i64,
    /// Comment body.
    pub content: String,
}

/// Body of the delete-post/delete-comment requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ActorRequest {
    /// Acting user.
    pub user_id: i64,
}

/// Dashboard view payload: aggregate counts plus the filters that
/// produced them, echoed in the shape the map frontend consumes.
#[derive(Debug, Clone, Serialize)]
pub struct ApiDashboard {
    /// Number of municipalities matching the filters.
    pub municipality_count: u64,
    /// Sum of matching municipalities' populations.
    pub total_population: i64,
    /// Wildfires within the filtered incidents.
    pub wildfire_count: u64,
    /// Floods within the filtered incidents.
    pub flood_count: u64,
    /// Parks shown.
    pub park_count: u64,
    /// The applied filters.
    pub filters: ApiFilters,
}

impl ApiDashboard {
    /// Combines computed counts with the filters that produced them.
    #[must_use]
    pub fn new(summary: DashboardSummary, filters: &MapFilters) -> Self {
        Self {
            municipality_count: summary.municipality_count,
            total_population: summary.total_population,
            wildfire_count: summary.wildfire_count,
            flood_count: summary.flood_count,
            park_count: summary.park_count,
            filters: ApiFilters::from(filters),
        }
    }
}

/// Echo of the applied dashboard filters.
#[derive(Debug, Clone, Serialize)]
pub struct ApiFilters {
    /// Municipality status toggles.
    pub status: ApiStatusFilters,
    /// Inclusive minimum population.
    pub pop_min: i64,
    /// Inclusive maximum population.
    pub pop_max: i64,
    /// Incident toggles.
    pub incidents: ApiIncidentFilters,
    /// Park layer toggle.
    pub show_parks: bool,
}

/// Municipality status toggles.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ApiStatusFilters {
    /// Cities shown.
    pub city: bool,
    /// Towns shown.
    pub town: bool,
    /// Rural municipalities shown.
    pub rm: bool,
}

/// Incident toggles.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ApiIncidentFilters {
    /// Wildfires shown.
    pub wildfires: bool,
    /// Floods shown.
    pub floods: bool,
    /// Confirmed incidents shown.
    pub confirmed: bool,
    /// Suspected incidents shown.
    pub suspected: bool,
}

impl From<&MapFilters> for ApiFilters {
    fn from(filters: &MapFilters) -> Self {
        Self {
            status: ApiStatusFilters {
                city: filters.municipalities.include_city,
                town: filters.municipalities.include_town,
                rm: filters.municipalities.include_rm,
            },
            pop_min: filters.municipalities.pop_min,
            pop_max: filters.municipalities.pop_max,
            incidents: ApiIncidentFilters {
                wildfires: filters.incidents.show_wildfires,
                floods: filters.incidents.show_floods,
                confirmed: filters.incidents.show_confirmed,
                suspected: filters.incidents.show_suspected,
            },
            show_parks: filters.show_parks,
        }
    }
}

/// Successful upload response.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UploadResponse {
    /// Always true on this shape.
    pub success: bool,
    /// Incidents added from the file.
    pub added: u64,
    /// Features skipped as duplicates.
    pub duplicates: u64,
    /// Total incidents now stored.
    pub total: u64,
}

/// Like-toggle response.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LikeResponse {
    /// Whether the user now likes the post.
    pub liked: bool,
    /// The post's like count after the toggle.
    pub likes_count: i64,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_flags_default_to_true() {
        let filters = DashboardParams::default().to_filters(&FilterDefaults::default());
        assert!(filters.municipalities.include_city);
        assert!(filters.incidents.show_suspected);
        assert!(filters.show_parks);
        assert_eq!(filters.municipalities.pop_min, 0);
        assert_eq!(filters.municipalities.pop_max, 1_000_000);
    }

    #[test]
    fn anything_but_the_literal_true_is_false() {
        assert!(flag(None));
        assert!(flag(Some("true")));
        assert!(!flag(Some("false")));
        assert!(!flag(Some("True")));
        assert!(!flag(Some("1")));
        assert!(!flag(Some("")));
    }

    #[test]
    fn explicit_range_overrides_defaults() {
        let params = DashboardParams {
            pop_min: Some(500),
            pop_max: Some(2000),
            ..DashboardParams::default()
        };
        let filters = params.to_filters(&FilterDefaults::default());
        assert_eq!(filters.municipalities.pop_min, 500);
        assert_eq!(filters.municipalities.pop_max, 2000);
    }
}
