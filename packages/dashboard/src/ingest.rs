//! Ingestion pipeline for `GeoJSON` feature collections.
//!
//! Two entry paths with different strictness:
//!
//! - The user-upload path ([`ingest_feature_collection`]) requires a
//!   well-formed `FeatureCollection` and applies the content-level
//!   duplicate policy: an incident whose (name, type) pair already
//!   exists is counted and skipped, never merged.
//! - The bulk-load path ([`load_municipalities`] and friends) reads a
//!   looser geometry-bearing structure at startup and inserts every
//!   feature it finds. A missing source file is a warning, not an
//!   error.

use std::path::Path;

use serde_json::Value;
use switchy_database::Database;
use water_watch_dashboard_models::IngestReport;

use crate::{DashboardError, normalize, queries};

/// Runs the upload-path pipeline over a parsed `GeoJSON` document.
///
/// The document must be a `FeatureCollection` with a `features` key.
/// Each feature is normalized (lower-cased name/type, best-effort start
/// date) and inserted unless an incident with the same (name, type)
/// already exists.
///
/// The duplicate check is read-then-write with no transactional
/// isolation; concurrent uploads of the same feature can both pass it.
///
/// # Errors
///
/// Returns [`DashboardError::InvalidFormat`] for a non-FeatureCollection
/// document (zero records ingested), or a database error if an insert
/// fails.
pub async fn ingest_feature_collection(
    db: &dyn Database,
    data: &Value,
    uploaded_by: Option<i64>,
) -> Result<IngestReport, DashboardError> {
    if data.get("type").and_then(Value::as_str) != Some("FeatureCollection")
        || data.get("features").is_none()
    {
        return Err(DashboardError::InvalidFormat);
    }

    let features = data
        .get("features")
        .and_then(Value::as_array)
        .ok_or(DashboardError::InvalidFormat)?;

    let mut report = IngestReport::default();

    for feature in features {
        let incident = normalize::incident_from_upload(feature);

        if queries::incident_exists(db, &incident.name, &incident.incident_type).await? {
            report.duplicates += 1;
            continue;
        }

        queries::insert_incident(db, &incident, uploaded_by).await?;
        report.added += 1;
    }

    log::info!(
        "Ingested feature collection: {} added, {} duplicates",
        report.added,
        report.duplicates
    );

    Ok(report)
}

/// Reads a bulk-load `GeoJSON` file, returning its features.
///
/// Returns `None` (after logging a warning) when the file doesn't
/// exist. The structure is looser than the upload path: an absent
/// `features` key simply yields zero features.
fn read_features(path: &Path) -> Result<Option<Vec<Value>>, DashboardError> {
    if !path.exists() {
        log::warn!("File not found: {}", path.display());
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    let data: Value = serde_json::from_str(&raw)?;

    Ok(Some(
        data.get("features")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    ))
}

/// Bulk-loads municipalities from a `GeoJSON` file.
///
/// # Errors
///
/// Returns [`DashboardError`] if the file is unreadable, not JSON, or
/// an insert fails. A missing file loads zero records.
pub async fn load_municipalities(db: &dyn Database, path: &Path) -> Result<u64, DashboardError> {
    let Some(features) = read_features(path)? else {
        return Ok(0);
    };

    let mut count = 0u64;
    for feature in &features {
        let muni = normalize::municipality_from_feature(feature);
        queries::insert_municipality(db, &muni).await?;
        count += 1;
    }

    log::info!("Loaded {count} municipalities from {}", path.display());
    Ok(count)
}

/// Bulk-loads parks from a `GeoJSON` file.
///
/// # Errors
///
/// Returns [`DashboardError`] if the file is unreadable, not JSON, or
/// an insert fails. A missing file loads zero records.
pub async fn load_parks(db: &dyn Database, path: &Path) -> Result<u64, DashboardError> {
    let Some(features) = read_features(path)? else {
        return Ok(0);
    };

    let mut count = 0u64;
    for feature in &features {
        let park = normalize::park_from_feature(feature);
        queries::insert_park(db, &park).await?;
        count += 1;
    }

    log::info!("Loaded {count} parks from {}", path.display());
    Ok(count)
}

/// Bulk-loads incidents from a `GeoJSON` file.
///
/// # Errors
///
/// Returns [`DashboardError`] if the file is unreadable, not JSON, or
/// an insert fails. A missing file loads zero records.
pub async fn load_incidents(db: &dyn Database, path: &Path) -> Result<u64, DashboardError> {
    let Some(features) = read_features(path)? else {
        return Ok(0);
    };

    let mut count = 0u64;
    for feature in &features {
        let incident = normalize::incident_from_feature(feature);
        queries::insert_incident(db, &incident, None).await?;
        count += 1;
    }

    log::info!("Loaded {count} incidents from {}", path.display());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn collection(features: Vec<Value>) -> Value {
        json!({"type": "FeatureCollection", "features": features})
    }

    fn feature(name: &str, kind: &str) -> Value {
        json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [-97.0, 50.0]},
            "properties": {"name": name, "type": kind}
        })
    }

    #[tokio::test]
    async fn rejects_non_feature_collection() {
        let db = water_watch_database::open_db(None).await.unwrap();

        for bad in [
            json!({"type": "Feature"}),
            json!({"type": "FeatureCollection"}),
            json!({"features": []}),
            json!([1, 2, 3]),
        ] {
            let result = ingest_feature_collection(db.as_ref(), &bad, None).await;
            assert!(
                matches!(result, Err(DashboardError::InvalidFormat)),
                "expected format error for {bad}"
            );
        }

        assert_eq!(queries::count_incidents(db.as_ref()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reingest_counts_everything_as_duplicate() {
        let db = water_watch_database::open_db(None).await.unwrap();
        let data = collection(vec![
            feature("Red River Flood", "flood"),
            feature("Whiteshell Fire", "wildfire"),
        ]);

        let first = ingest_feature_collection(db.as_ref(), &data, None)
            .await
            .unwrap();
        assert_eq!(first.added, 2);
        assert_eq!(first.duplicates, 0);

        let second = ingest_feature_collection(db.as_ref(), &data, None)
            .await
            .unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.duplicates, 2);

        assert_eq!(queries::count_incidents(db.as_ref()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_check_is_insensitive_to_source_casing() {
        let db = water_watch_database::open_db(None).await.unwrap();

        let first = collection(vec![feature("Red River Flood", "Flood")]);
        let second = collection(vec![feature("  red river flood ", "flood")]);

        ingest_feature_collection(db.as_ref(), &first, None)
            .await
            .unwrap();
        let report = ingest_feature_collection(db.as_ref(), &second, None)
            .await
            .unwrap();

        assert_eq!(report.added, 0);
        assert_eq!(report.duplicates, 1);
    }

    #[tokio::test]
    async fn bad_start_date_does_not_abort_the_record() {
        let db = water_watch_database::open_db(None).await.unwrap();
        let data = collection(vec![json!({
            "geometry": {},
            "properties": {"name": "x", "type": "flood", "started_at": "soonish"}
        })]);

        let report = ingest_feature_collection(db.as_ref(), &data, None)
            .await
            .unwrap();
        assert_eq!(report.added, 1);

        let incidents = queries::list_incidents(db.as_ref()).await.unwrap();
        assert!(incidents[0].started_at.is_none());
    }

    #[tokio::test]
    async fn upload_attribution_is_stored() {
        let db = water_watch_database::open_db(None).await.unwrap();
        db.exec_raw("INSERT INTO users (username) VALUES ('reporter')")
            .await
            .unwrap();

        let data = collection(vec![feature("Souris Flood", "flood")]);
        ingest_feature_collection(db.as_ref(), &data, Some(1))
            .await
            .unwrap();

        let incidents = queries::list_incidents(db.as_ref()).await.unwrap();
        assert_eq!(incidents[0].uploaded_by, Some(1));
    }

    #[tokio::test]
    async fn missing_bulk_file_loads_zero_records() {
        let db = water_watch_database::open_db(None).await.unwrap();
        let count = load_municipalities(db.as_ref(), Path::new("/nonexistent/file.geojson"))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn bulk_load_reads_loose_structures() {
        let db = water_watch_database::open_db(None).await.unwrap();

        let dir = std::env::temp_dir().join("water_watch_ingest_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("munis.geojson");
        // No top-level "type": the bulk path doesn't enforce one
        std::fs::write(
            &path,
            serde_json::to_string(&json!({
                "features": [{
                    "geometry": {"type": "Point", "coordinates": [0.0, 0.0]},
                    "properties": {"MUNI_NAME": "Brandon", "MUNI_STATU": "city"}
                }]
            }))
            .unwrap(),
        )
        .unwrap();

        let count = load_municipalities(db.as_ref(), &path).await.unwrap();
        assert_eq!(count, 1);

        let munis = queries::list_municipalities(db.as_ref()).await.unwrap();
        assert_eq!(munis[0].name, "Brandon");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
