//! Database queries for the dashboard entities.
//!
//! Filter queries build their `WHERE` clauses dynamically: every filter
//! dimension is a conjunctive restriction, and an empty allowed set
//! short-circuits to an empty result without touching the database.
//! Geometry and properties travel as JSON text columns and are parsed
//! back on read.

use std::fmt::Write as _;

use moosicbox_json_utils::database::ToValue as _;
use serde_json::{Map, Value};
use switchy_database::{Database, DatabaseValue};
use water_watch_dashboard_models::{
    DashboardSummary, IncidentFilter, IncidentRow, MapFilters, MunicipalityFilter,
    MunicipalityRow, NormalizedIncident, NormalizedMunicipality, NormalizedPark, ParkRow,
    UploadedFileRow,
};

use crate::DashboardError;

/// Parses a JSON text column, defaulting to the empty object.
fn parse_json_object(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::Object(Map::new()))
}

/// Parses a properties text column into the open mapping.
fn parse_properties(raw: &str) -> Map<String, Value> {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default()
}

fn parse_municipality(row: &switchy_database::Row) -> MunicipalityRow {
    let geometry: String = row.to_value("geometry").unwrap_or_default();
    let properties: String = row.to_value("properties").unwrap_or_default();
    MunicipalityRow {
        id: row.to_value("id").unwrap_or(0),
        name: row.to_value("name").unwrap_or_default(),
        status: row.to_value("status").unwrap_or_default(),
        population_2021: row.to_value("population_2021").unwrap_or(0),
        geometry: parse_json_object(&geometry),
        properties: parse_properties(&properties),
    }
}

fn parse_park(row: &switchy_database::Row) -> ParkRow {
    let geometry: String = row.to_value("geometry").unwrap_or_default();
    let properties: String = row.to_value("properties").unwrap_or_default();
    ParkRow {
        id: row.to_value("id").unwrap_or(0),
        name: row.to_value("name").unwrap_or_default(),
        location: row.to_value("location").unwrap_or_default(),
        management: row.to_value("management").unwrap_or_default(),
        owner: row.to_value("owner").unwrap_or_default(),
        park_class: row.to_value("park_class").unwrap_or_default(),
        url: row.to_value("url").unwrap_or_default(),
        geometry: parse_json_object(&geometry),
        properties: parse_properties(&properties),
    }
}

fn parse_incident(row: &switchy_database::Row) -> IncidentRow {
    let geometry: String = row.to_value("geometry").unwrap_or_default();
    let properties: String = row.to_value("properties").unwrap_or_default();
    let started_at: Option<String> = row.to_value("started_at").unwrap_or(None);
    IncidentRow {
        id: row.to_value("id").unwrap_or(0),
        name: row.to_value("name").unwrap_or_default(),
        incident_type: row.to_value("incident_type").unwrap_or_default(),
        status: row.to_value("status").unwrap_or_default(),
        started_at: started_at
            .and_then(|s| chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        description: row.to_value("description").unwrap_or_default(),
        geometry: parse_json_object(&geometry),
        properties: parse_properties(&properties),
        uploaded_by: row.to_value("uploaded_by").unwrap_or(None),
        created_at: row.to_value("created_at").unwrap_or_default(),
    }
}

// ============================================================
// Inserts
// ============================================================

/// Inserts a normalized municipality.
///
/// # Errors
///
/// Returns [`DashboardError`] if serialization or the insert fails.
pub async fn insert_municipality(
    db: &dyn Database,
    muni: &NormalizedMunicipality,
) -> Result<(), DashboardError> {
    db.exec_raw_params(
        "INSERT INTO municipalities (name, status, population_2021, geometry, properties)
         VALUES ($1, $2, $3, $4, $5)",
        &[
            DatabaseValue::String(muni.name.clone()),
            DatabaseValue::String(muni.status.clone()),
            DatabaseValue::Int64(muni.population_2021),
            DatabaseValue::String(serde_json::to_string(&muni.geometry)?),
            DatabaseValue::String(serde_json::to_string(&muni.properties)?),
        ],
    )
    .await?;
    Ok(())
}

/// Inserts a normalized park.
///
/// # Errors
///
/// Returns [`DashboardError`] if serialization or the insert fails.
pub async fn insert_park(db: &dyn Database, park: &NormalizedPark) -> Result<(), DashboardError> {
    db.exec_raw_params(
        "INSERT INTO parks (name, location, management, owner, park_class, url, geometry, properties)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        &[
            DatabaseValue::String(park.name.clone()),
            DatabaseValue::String(park.location.clone()),
            DatabaseValue::String(park.management.clone()),
            DatabaseValue::String(park.owner.clone()),
            DatabaseValue::String(park.park_class.clone()),
            DatabaseValue::String(park.url.clone()),
            DatabaseValue::String(serde_json::to_string(&park.geometry)?),
            DatabaseValue::String(serde_json::to_string(&park.properties)?),
        ],
    )
    .await?;
    Ok(())
}

/// Inserts a normalized incident, attributed to `uploaded_by` when the
/// upload path knows the user.
///
/// # Errors
///
/// Returns [`DashboardError`] if serialization or the insert fails.
pub async fn insert_incident(
    db: &dyn Database,
    incident: &NormalizedIncident,
    uploaded_by: Option<i64>,
) -> Result<(), DashboardError> {
    db.exec_raw_params(
        "INSERT INTO incidents (
            name, incident_type, status, started_at, description,
            geometry, properties, uploaded_by, created_at
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        &[
            DatabaseValue::String(incident.name.clone()),
            DatabaseValue::String(incident.incident_type.clone()),
            DatabaseValue::String(incident.status.clone()),
            incident.started_at.map_or(DatabaseValue::Null, |d| {
                DatabaseValue::String(d.to_string())
            }),
            DatabaseValue::String(incident.description.clone()),
            DatabaseValue::String(serde_json::to_string(&incident.geometry)?),
            DatabaseValue::String(serde_json::to_string(&incident.properties)?),
            uploaded_by.map_or(DatabaseValue::Null, DatabaseValue::Int64),
            DatabaseValue::String(chrono::Utc::now().to_rfc3339()),
        ],
    )
    .await?;
    Ok(())
}

/// Returns whether an incident with this (name, type) pair already
/// exists. This is the content-level duplicate check; it is a plain
/// read, so two concurrent uploads can both see "no" (see `DESIGN.md`).
///
/// # Errors
///
/// Returns [`DashboardError`] if the query fails.
pub async fn incident_exists(
    db: &dyn Database,
    name: &str,
    incident_type: &str,
) -> Result<bool, DashboardError> {
    let rows = db
        .query_raw_params(
            "SELECT id FROM incidents WHERE name = $1 AND incident_type = $2 LIMIT 1",
            &[
                DatabaseValue::String(name.to_string()),
                DatabaseValue::String(incident_type.to_string()),
            ],
        )
        .await?;
    Ok(!rows.is_empty())
}

/// Records an upload and returns its id.
///
/// # Errors
///
/// Returns [`DashboardError`] if the insert fails.
pub async fn insert_uploaded_file(
    db: &dyn Database,
    file_path: &str,
    uploaded_by: Option<i64>,
) -> Result<i64, DashboardError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO uploaded_files (file_path, uploaded_by, uploaded_at)
             VALUES ($1, $2, $3)
             RETURNING id",
            &[
                DatabaseValue::String(file_path.to_string()),
                uploaded_by.map_or(DatabaseValue::Null, DatabaseValue::Int64),
                DatabaseValue::String(chrono::Utc::now().to_rfc3339()),
            ],
        )
        .await?;

    Ok(rows.first().map_or(0, |r| r.to_value("id").unwrap_or(0)))
}

/// Marks an upload as processed with the number of incidents it added.
///
/// # Errors
///
/// Returns [`DashboardError`] if the update fails.
pub async fn mark_upload_processed(
    db: &dyn Database,
    upload_id: i64,
    incidents_added: u64,
) -> Result<(), DashboardError> {
    db.exec_raw_params(
        "UPDATE uploaded_files SET processed = 1, incidents_added = $1 WHERE id = $2",
        &[
            DatabaseValue::Int64(i64::try_from(incidents_added).unwrap_or(i64::MAX)),
            DatabaseValue::Int64(upload_id),
        ],
    )
    .await?;
    Ok(())
}

/// Fetches an upload record by id.
///
/// # Errors
///
/// Returns [`DashboardError`] if the query fails.
pub async fn get_uploaded_file(
    db: &dyn Database,
    upload_id: i64,
) -> Result<Option<UploadedFileRow>, DashboardError> {
    let rows = db
        .query_raw_params(
            "SELECT id, file_path, uploaded_by, uploaded_at, processed, incidents_added
             FROM uploaded_files WHERE id = $1",
            &[DatabaseValue::Int64(upload_id)],
        )
        .await?;

    Ok(rows.first().map(|row| {
        let processed: i64 = row.to_value("processed").unwrap_or(0);
        UploadedFileRow {
            id: row.to_value("id").unwrap_or(0),
            file_path: row.to_value("file_path").unwrap_or_default(),
            uploaded_by: row.to_value("uploaded_by").unwrap_or(None),
            uploaded_at: row.to_value("uploaded_at").unwrap_or_default(),
            processed: processed != 0,
            incidents_added: row.to_value("incidents_added").unwrap_or(0),
        }
    }))
}

// ============================================================
// Filtered reads
// ============================================================

/// Queries municipalities matching the status toggles and the inclusive
/// population range. A range with `min > max` matches nothing.
///
/// # Errors
///
/// Returns [`DashboardError`] if the query fails.
pub async fn filter_municipalities(
    db: &dyn Database,
    filter: &MunicipalityFilter,
) -> Result<Vec<MunicipalityRow>, DashboardError> {
    let mut sql = String::from(
        "SELECT id, name, status, population_2021, geometry, properties
         FROM municipalities
         WHERE population_2021 >= $1 AND population_2021 <= $2",
    );

    if !filter.include_city {
        sql.push_str(" AND status <> 'city'");
    }
    if !filter.include_town {
        sql.push_str(" AND status <> 'town'");
    }
    if !filter.include_rm {
        // "rm" appears in both short and long form in the source data
        sql.push_str(" AND status NOT IN ('rm', 'rural municipality')");
    }
    sql.push_str(" ORDER BY id");

    let rows = db
        .query_raw_params(
            &sql,
            &[
                DatabaseValue::Int64(filter.pop_min),
                DatabaseValue::Int64(filter.pop_max),
            ],
        )
        .await?;

    Ok(rows.iter().map(parse_municipality).collect())
}

/// Queries incidents whose type and status are both in the allowed sets
/// derived from the filter toggles. An empty allowed set on either
/// dimension matches nothing.
///
/// # Errors
///
/// Returns [`DashboardError`] if the query fails.
pub async fn filter_incidents(
    db: &dyn Database,
    filter: &IncidentFilter,
) -> Result<Vec<IncidentRow>, DashboardError> {
    let types = filter.allowed_types();
    let statuses = filter.allowed_statuses();

    if types.is_empty() || statuses.is_empty() {
        return Ok(Vec::new());
    }

    let mut sql = String::from(
        "SELECT id, name, incident_type, status, started_at, description,
                geometry, properties, uploaded_by, created_at
         FROM incidents
         WHERE incident_type IN (",
    );
    let mut params: Vec<DatabaseValue> = Vec::new();

    for (i, kind) in types.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        write!(sql, "${}", params.len() + 1).ok();
        params.push(DatabaseValue::String((*kind).to_string()));
    }
    sql.push_str(") AND status IN (");
    for (i, status) in statuses.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        write!(sql, "${}", params.len() + 1).ok();
        params.push(DatabaseValue::String((*status).to_string()));
    }
    sql.push_str(") ORDER BY id");

    let rows = db.query_raw_params(&sql, &params).await?;

    Ok(rows.iter().map(parse_incident).collect())
}

// ============================================================
// Unfiltered reads
// ============================================================

/// Lists every municipality.
///
/// # Errors
///
/// Returns [`DashboardError`] if the query fails.
pub async fn list_municipalities(db: &dyn Database) -> Result<Vec<MunicipalityRow>, DashboardError> {
    let rows = db
        .query_raw_params(
            "SELECT id, name, status, population_2021, geometry, properties
             FROM municipalities ORDER BY id",
            &[],
        )
        .await?;
    Ok(rows.iter().map(parse_municipality).collect())
}

/// Lists every park.
///
/// # Errors
///
/// Returns [`DashboardError`] if the query fails.
pub async fn list_parks(db: &dyn Database) -> Result<Vec<ParkRow>, DashboardError> {
    let rows = db
        .query_raw_params(
            "SELECT id, name, location, management, owner, park_class, url, geometry, properties
             FROM parks ORDER BY id",
            &[],
        )
        .await?;
    Ok(rows.iter().map(parse_park).collect())
}

/// Lists every incident.
///
/// # Errors
///
/// Returns [`DashboardError`] if the query fails.
pub async fn list_incidents(db: &dyn Database) -> Result<Vec<IncidentRow>, DashboardError> {
    let rows = db
        .query_raw_params(
            "SELECT id, name, incident_type, status, started_at, description,
                    geometry, properties, uploaded_by, created_at
             FROM incidents ORDER BY id",
            &[],
        )
        .await?;
    Ok(rows.iter().map(parse_incident).collect())
}

/// Counts all incidents.
///
/// # Errors
///
/// Returns [`DashboardError`] if the query fails.
pub async fn count_incidents(db: &dyn Database) -> Result<u64, DashboardError> {
    let rows = db
        .query_raw_params("SELECT COUNT(*) as cnt FROM incidents", &[])
        .await?;
    let count: i64 = rows.first().map_or(0, |r| r.to_value("cnt").unwrap_or(0));
    Ok(u64::try_from(count).unwrap_or(0))
}

// ============================================================
// Dashboard summary
// ============================================================

/// Computes the aggregate counts for the dashboard view over the
/// filtered entity sets.
///
/// # Errors
///
/// Returns [`DashboardError`] if any query fails.
pub async fn dashboard_summary(
    db: &dyn Database,
    filters: &MapFilters,
) -> Result<DashboardSummary, DashboardError> {
    let municipalities = filter_municipalities(db, &filters.municipalities).await?;
    let incidents = filter_incidents(db, &filters.incidents).await?;
    let parks = if filters.show_parks {
        list_parks(db).await?
    } else {
        Vec::new()
    };

    let count_type = |kind: &str| {
        let count = incidents.iter().filter(|i| i.incident_type == kind).count();
        u64::try_from(count).unwrap_or(u64::MAX)
    };

    Ok(DashboardSummary {
        municipality_count: u64::try_from(municipalities.len()).unwrap_or(u64::MAX),
        total_population: municipalities.iter().map(|m| m.population_2021).sum(),
        wildfire_count: count_type("wildfire"),
        flood_count: count_type("flood"),
        park_count: u64::try_from(parks.len()).unwrap_or(u64::MAX),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use water_watch_dashboard_models::{NormalizedIncident, NormalizedMunicipality};

    use super::*;

    fn muni(name: &str, status: &str, population: i64) -> NormalizedMunicipality {
        NormalizedMunicipality {
            name: name.to_string(),
            status: status.to_string(),
            population_2021: population,
            geometry: json!({}),
            properties: Map::new(),
        }
    }

    fn incident(name: &str, kind: &str, status: &str) -> NormalizedIncident {
        NormalizedIncident {
            name: name.to_string(),
            incident_type: kind.to_string(),
            status: status.to_string(),
            started_at: None,
            description: String::new(),
            geometry: json!({}),
            properties: Map::new(),
        }
    }

    async fn seeded_db() -> Box<dyn Database> {
        let db = water_watch_database::open_db(None).await.unwrap();

        for m in [
            muni("Winnipeg", "city", 749_607),
            muni("Niverville", "town", 5947),
            muni("Stanley", "rm", 11_131),
            muni("St. Andrews", "rural municipality", 12_428),
        ] {
            insert_municipality(db.as_ref(), &m).await.unwrap();
        }

        for i in [
            incident("assiniboine flood", "flood", "confirmed"),
            incident("whiteshell fire", "wildfire", "suspected"),
            incident("duff's ditch neglect", "govt inaction/sabotage", "suspected"),
        ] {
            insert_incident(db.as_ref(), &i, None).await.unwrap();
        }

        db
    }

    fn all_statuses(pop_min: i64, pop_max: i64) -> MunicipalityFilter {
        MunicipalityFilter {
            include_city: true,
            include_town: true,
            include_rm: true,
            pop_min,
            pop_max,
        }
    }

    #[tokio::test]
    async fn inverted_population_range_matches_nothing() {
        let db = seeded_db().await;
        let rows = filter_municipalities(db.as_ref(), &all_statuses(1000, 10))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn population_range_is_inclusive() {
        let db = seeded_db().await;
        let rows = filter_municipalities(db.as_ref(), &all_statuses(5947, 5947))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Niverville");
    }

    #[tokio::test]
    async fn disabling_rm_also_excludes_the_long_form() {
        let db = seeded_db().await;
        let filter = MunicipalityFilter {
            include_rm: false,
            ..all_statuses(0, 1_000_000)
        };
        let rows = filter_municipalities(db.as_ref(), &filter).await.unwrap();
        let names: Vec<&str> = rows.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Winnipeg", "Niverville"]);
    }

    #[tokio::test]
    async fn all_incident_toggles_off_matches_nothing() {
        let db = seeded_db().await;
        let filter = IncidentFilter {
            show_wildfires: false,
            show_floods: false,
            show_confirmed: false,
            show_suspected: false,
        };
        let rows = filter_incidents(db.as_ref(), &filter).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn disabling_all_statuses_matches_nothing_even_with_types_on() {
        let db = seeded_db().await;
        let filter = IncidentFilter {
            show_wildfires: true,
            show_floods: true,
            show_confirmed: false,
            show_suspected: false,
        };
        let rows = filter_incidents(db.as_ref(), &filter).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn incident_filter_is_a_conjunction() {
        let db = seeded_db().await;
        let filter = IncidentFilter {
            show_wildfires: false,
            show_floods: true,
            show_confirmed: true,
            show_suspected: true,
        };
        let rows = filter_incidents(db.as_ref(), &filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "assiniboine flood");
    }

    #[tokio::test]
    async fn untoggled_incident_types_never_leak_through() {
        let db = seeded_db().await;
        // Both toggles on still excludes the free-text third type
        let filter = IncidentFilter {
            show_wildfires: true,
            show_floods: true,
            show_confirmed: true,
            show_suspected: true,
        };
        let rows = filter_incidents(db.as_ref(), &filter).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|i| i.incident_type != "govt inaction/sabotage"));
    }

    #[tokio::test]
    async fn summary_counts_follow_the_filters() {
        let db = seeded_db().await;
        let filters = MapFilters {
            municipalities: all_statuses(0, 1_000_000),
            incidents: IncidentFilter {
                show_wildfires: true,
                show_floods: true,
                show_confirmed: true,
                show_suspected: true,
            },
            show_parks: false,
        };

        let summary = dashboard_summary(db.as_ref(), &filters).await.unwrap();
        assert_eq!(summary.municipality_count, 4);
        assert_eq!(summary.total_population, 749_607 + 5947 + 11_131 + 12_428);
        assert_eq!(summary.wildfire_count, 1);
        assert_eq!(summary.flood_count, 1);
        assert_eq!(summary.park_count, 0);
    }

    #[tokio::test]
    async fn upload_record_round_trips() {
        let db = water_watch_database::open_db(None).await.unwrap();

        let id = insert_uploaded_file(db.as_ref(), "data/uploads/x.geojson", None)
            .await
            .unwrap();
        assert!(id > 0);

        mark_upload_processed(db.as_ref(), id, 3).await.unwrap();

        let row = get_uploaded_file(db.as_ref(), id).await.unwrap().unwrap();
        assert!(row.processed);
        assert_eq!(row.incidents_added, 3);
        assert_eq!(row.file_path, "data/uploads/x.geojson");
    }
}
