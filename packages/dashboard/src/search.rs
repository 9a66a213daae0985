//! Free-text search across municipalities, parks, and incidents.
//!
//! Case-insensitive substring match on the name field of each entity
//! kind, capped per kind, concatenated in a fixed order. Results carry
//! only a label, a human-readable kind, and the raw geometry.

use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use water_watch_dashboard_models::SearchResult;

use crate::DashboardError;

/// Maximum results returned per entity kind.
pub const RESULTS_PER_KIND: i64 = 5;

/// Title-cases free text: every alphabetic run starts upper-case and
/// continues lower-case, with non-alphabetic characters as boundaries
/// (`rural municipality` → `Rural Municipality`, `govt
/// inaction/sabotage` → `Govt Inaction/Sabotage`).
#[must_use]
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alphabetic = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alphabetic {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alphabetic = true;
        } else {
            out.push(c);
            prev_alphabetic = false;
        }
    }

    out
}

fn parse_geometry(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()))
}

/// Searches the three entity kinds for names containing `raw_query`.
///
/// The query is trimmed and lower-cased first; an empty query
/// short-circuits to an empty result list. Matches are capped at
/// [`RESULTS_PER_KIND`] per kind and concatenated: municipalities,
/// then parks, then incidents.
///
/// # Errors
///
/// Returns [`DashboardError`] if any query fails.
pub async fn search(db: &dyn Database, raw_query: &str) -> Result<Vec<SearchResult>, DashboardError> {
    let query = raw_query.trim().to_lowercase();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let mut results = Vec::new();

    let rows = db
        .query_raw_params(
            "SELECT name, status, geometry FROM municipalities
             WHERE LOWER(name) LIKE '%' || $1 || '%'
             ORDER BY id LIMIT $2",
            &[
                DatabaseValue::String(query.clone()),
                DatabaseValue::Int64(RESULTS_PER_KIND),
            ],
        )
        .await?;
    for row in &rows {
        let name: String = row.to_value("name").unwrap_or_default();
        let status: String = row.to_value("status").unwrap_or_default();
        let geometry: String = row.to_value("geometry").unwrap_or_default();
        results.push(SearchResult {
            label: format!("{} of {name}, MB", title_case(&status)),
            kind: title_case(&status),
            geometry: parse_geometry(&geometry),
        });
    }

    let rows = db
        .query_raw_params(
            "SELECT name, geometry FROM parks
             WHERE LOWER(name) LIKE '%' || $1 || '%'
             ORDER BY id LIMIT $2",
            &[
                DatabaseValue::String(query.clone()),
                DatabaseValue::Int64(RESULTS_PER_KIND),
            ],
        )
        .await?;
    for row in &rows {
        let name: String = row.to_value("name").unwrap_or_default();
        let geometry: String = row.to_value("geometry").unwrap_or_default();
        results.push(SearchResult {
            label: format!("{name} (Park)"),
            kind: "Park".to_string(),
            geometry: parse_geometry(&geometry),
        });
    }

    let rows = db
        .query_raw_params(
            "SELECT name, incident_type, geometry FROM incidents
             WHERE LOWER(name) LIKE '%' || $1 || '%'
             ORDER BY id LIMIT $2",
            &[
                DatabaseValue::String(query),
                DatabaseValue::Int64(RESULTS_PER_KIND),
            ],
        )
        .await?;
    for row in &rows {
        let name: String = row.to_value("name").unwrap_or_default();
        let incident_type: String = row.to_value("incident_type").unwrap_or_default();
        let geometry: String = row.to_value("geometry").unwrap_or_default();
        results.push(SearchResult {
            label: format!("{name} ({})", title_case(&incident_type)),
            kind: title_case(&incident_type),
            geometry: parse_geometry(&geometry),
        });
    }

    Ok(results)
}
