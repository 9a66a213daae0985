//! Normalizes raw `GeoJSON` features into entity records.
//!
//! Each source dataset names its property keys differently (the
//! municipal boundary export uses `MUNI_NAME`/`MUNI_STATU`, the parks
//! export uses `NAME_E`/`LOC_E`/..., user uploads use plain `name`/
//! `type`). These transforms map whatever is present onto the canonical
//! fields. Bad input coerces to a default, it never errors.
//!
//! All transforms are pure: they produce unsaved records and carry the
//! full source properties mapping through verbatim.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use water_watch_dashboard_models::{NormalizedIncident, NormalizedMunicipality, NormalizedPark};

/// Extracts the geometry object from a feature.
///
/// Missing or explicitly-`null` geometry becomes the empty object so
/// that every stored record carries a geometry value.
#[must_use]
pub fn geometry_of(feature: &Value) -> Value {
    match feature.get("geometry") {
        Some(geom) if !geom.is_null() => geom.clone(),
        _ => Value::Object(Map::new()),
    }
}

/// Extracts the properties mapping from a feature.
///
/// Missing or non-object properties become the empty mapping, never
/// null.
#[must_use]
pub fn properties_of(feature: &Value) -> Map<String, Value> {
    feature
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Returns the first non-empty string value among `keys`, else `""`.
fn first_prop(props: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| {
            props
                .get(*key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or("")
        .to_string()
}

/// Returns the string value at `key`, else `""`.
fn prop_str(props: &Map<String, Value>, key: &str) -> String {
    props
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

/// Returns the string value at `key`, or `default` when the key is
/// absent. A present-but-empty value stays empty.
fn prop_str_or(props: &Map<String, Value>, key: &str, default: &str) -> String {
    props.get(key).map_or_else(
        || default.to_string(),
        |v| v.as_str().unwrap_or("").to_string(),
    )
}

/// Coerces a raw population value to a non-negative integer.
///
/// Accepts JSON numbers or numeric strings; anything else (missing,
/// null, non-numeric text) coerces to 0.
fn coerce_population(value: Option<&Value>) -> i64 {
    let population = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    };
    population.max(0)
}

/// Normalizes a municipal-boundary feature.
///
/// Name and status prefer the boundary export's keys (`MUNI_NAME`,
/// `MUNI_STATU`) and fall back to the plain `name`/`status` keys.
#[must_use]
pub fn municipality_from_feature(feature: &Value) -> NormalizedMunicipality {
    let props = properties_of(feature);

    NormalizedMunicipality {
        name: first_prop(&props, &["MUNI_NAME", "name"]),
        status: first_prop(&props, &["MUNI_STATU", "status"]),
        population_2021: coerce_population(props.get("population_2021")),
        geometry: geometry_of(feature),
        properties: props,
    }
}

/// Normalizes a parks-export feature. All six fields default to empty.
#[must_use]
pub fn park_from_feature(feature: &Value) -> NormalizedPark {
    let props = properties_of(feature);

    NormalizedPark {
        name: prop_str(&props, "NAME_E"),
        location: prop_str(&props, "LOC_E"),
        management: prop_str(&props, "MGMT_E"),
        owner: prop_str(&props, "OWNER_E"),
        park_class: prop_str(&props, "PRK_CLSS"),
        url: prop_str(&props, "URL"),
        geometry: geometry_of(feature),
        properties: props,
    }
}

/// Normalizes an incident feature from the bulk-load path.
///
/// Values pass through as-is; absent type/status take the fixed
/// defaults. No case folding and no date parsing on this path.
#[must_use]
pub fn incident_from_feature(feature: &Value) -> NormalizedIncident {
    let props = properties_of(feature);

    NormalizedIncident {
        name: prop_str(&props, "name"),
        incident_type: prop_str_or(&props, "type", "wildfire"),
        status: prop_str_or(&props, "status", "suspected"),
        started_at: None,
        description: prop_str(&props, "description"),
        geometry: geometry_of(feature),
        properties: props,
    }
}

/// Normalizes an incident feature from the user-upload path.
///
/// Name and type are trimmed and lower-cased so the duplicate check is
/// insensitive to source casing; status defaults to `suspected`. The
/// start date is best-effort: the `T`-delimited date portion of an
/// ISO-8601-like string, silently left unset when it doesn't parse.
#[must_use]
pub fn incident_from_upload(feature: &Value) -> NormalizedIncident {
    let props = properties_of(feature);

    let started_at = props
        .get("started_at")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .and_then(parse_start_date);

    NormalizedIncident {
        name: prop_str(&props, "name").trim().to_lowercase(),
        incident_type: prop_str(&props, "type").trim().to_lowercase(),
        status: prop_str_or(&props, "status", "suspected"),
        started_at,
        description: prop_str(&props, "description"),
        geometry: geometry_of(feature),
        properties: props,
    }
}

/// Parses the date portion of an ISO-8601-like timestamp
/// (`2025-08-21T10:00:00Z` → 2025-08-21).
fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split('T').next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn municipality_prefers_boundary_export_keys() {
        let feature = json!({
            "geometry": {"type": "Point", "coordinates": [-97.14, 49.89]},
            "properties": {
                "MUNI_NAME": "Winnipeg",
                "name": "ignored",
                "MUNI_STATU": "city",
                "population_2021": 749607
            }
        });

        let muni = municipality_from_feature(&feature);
        assert_eq!(muni.name, "Winnipeg");
        assert_eq!(muni.status, "city");
        assert_eq!(muni.population_2021, 749_607);
    }

    #[test]
    fn municipality_falls_back_past_empty_export_keys() {
        let feature = json!({
            "geometry": {},
            "properties": {"MUNI_NAME": "", "name": "Brandon", "status": "city"}
        });

        let muni = municipality_from_feature(&feature);
        assert_eq!(muni.name, "Brandon");
        assert_eq!(muni.status, "city");
    }

    #[test]
    fn population_coerces_strings_and_garbage() {
        let coerce = |v: Value| {
            municipality_from_feature(&json!({
                "geometry": {},
                "properties": {"population_2021": v}
            }))
            .population_2021
        };

        assert_eq!(coerce(json!("1234")), 1234);
        assert_eq!(coerce(json!(56.9)), 56);
        assert_eq!(coerce(json!("not a number")), 0);
        assert_eq!(coerce(json!(null)), 0);
        assert_eq!(coerce(json!(-5)), 0);
    }

    #[test]
    fn missing_population_is_zero() {
        let muni = municipality_from_feature(&json!({"geometry": {}, "properties": {}}));
        assert_eq!(muni.population_2021, 0);
    }

    #[test]
    fn park_fields_default_to_empty() {
        let feature = json!({
            "geometry": {"type": "Polygon", "coordinates": []},
            "properties": {"NAME_E": "Birds Hill", "PRK_CLSS": "Provincial"}
        });

        let park = park_from_feature(&feature);
        assert_eq!(park.name, "Birds Hill");
        assert_eq!(park.park_class, "Provincial");
        assert_eq!(park.location, "");
        assert_eq!(park.management, "");
        assert_eq!(park.owner, "");
        assert_eq!(park.url, "");
    }

    #[test]
    fn bulk_incident_takes_fixed_defaults() {
        let incident = incident_from_feature(&json!({
            "geometry": {},
            "properties": {"name": "Shoal Lake"}
        }));

        assert_eq!(incident.incident_type, "wildfire");
        assert_eq!(incident.status, "suspected");
        assert_eq!(incident.description, "");
        assert!(incident.started_at.is_none());
    }

    #[test]
    fn bulk_incident_does_not_fold_case() {
        let incident = incident_from_feature(&json!({
            "geometry": {},
            "properties": {"name": "Shoal Lake", "type": "Flood", "status": "Confirmed"}
        }));

        assert_eq!(incident.incident_type, "Flood");
        assert_eq!(incident.status, "Confirmed");
    }

    #[test]
    fn upload_incident_trims_and_lowercases_name_and_type() {
        let incident = incident_from_upload(&json!({
            "geometry": {},
            "properties": {"name": "  Red River Flood ", "type": "FLOOD"}
        }));

        assert_eq!(incident.name, "red river flood");
        assert_eq!(incident.incident_type, "flood");
        assert_eq!(incident.status, "suspected");
    }

    #[test]
    fn upload_incident_parses_timestamp_date_portion() {
        let incident = incident_from_upload(&json!({
            "geometry": {},
            "properties": {"name": "x", "type": "flood", "started_at": "2025-08-21T10:00:00Z"}
        }));

        assert_eq!(
            incident.started_at,
            Some(NaiveDate::from_ymd_opt(2025, 8, 21).unwrap())
        );
    }

    #[test]
    fn upload_incident_leaves_bad_dates_unset() {
        for bad in ["yesterday", "2025/08/21", "", "T10:00:00"] {
            let incident = incident_from_upload(&json!({
                "geometry": {},
                "properties": {"name": "x", "type": "flood", "started_at": bad}
            }));
            assert!(incident.started_at.is_none(), "expected unset for {bad:?}");
        }
    }

    #[test]
    fn null_geometry_becomes_empty_object() {
        let incident = incident_from_upload(&json!({
            "geometry": null,
            "properties": {"name": "x", "type": "flood"}
        }));

        assert_eq!(incident.geometry, json!({}));
    }

    #[test]
    fn non_object_properties_become_empty_mapping() {
        let muni = municipality_from_feature(&json!({"geometry": {}, "properties": null}));
        assert!(muni.properties.is_empty());
    }
}
