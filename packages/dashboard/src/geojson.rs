//! Serializes entity rows back into `GeoJSON` features.
//!
//! Feature properties start with the canonical fields and are then
//! overlaid with the record's stored open-properties mapping. The
//! overlay runs last, so a stored property wins on key collision; this
//! ordering is load-bearing for clients that round-trip source
//! datasets.

use serde_json::{Map, Value, json};
use water_watch_dashboard_models::{IncidentRow, MunicipalityRow, ParkRow};

fn overlay(mut canonical: Map<String, Value>, stored: &Map<String, Value>) -> Map<String, Value> {
    for (key, value) in stored {
        canonical.insert(key.clone(), value.clone());
    }
    canonical
}

fn feature(geometry: &Value, properties: Map<String, Value>) -> Value {
    json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": Value::Object(properties),
    })
}

/// Serializes a municipality as a `GeoJSON` feature.
#[must_use]
pub fn municipality_feature(muni: &MunicipalityRow) -> Value {
    let mut canonical = Map::new();
    canonical.insert("name".to_string(), json!(muni.name));
    canonical.insert("status".to_string(), json!(muni.status));
    canonical.insert("population_2021".to_string(), json!(muni.population_2021));

    feature(&muni.geometry, overlay(canonical, &muni.properties))
}

/// Serializes an incident as a `GeoJSON` feature.
#[must_use]
pub fn incident_feature(incident: &IncidentRow) -> Value {
    let mut canonical = Map::new();
    canonical.insert("id".to_string(), json!(incident.id));
    canonical.insert("name".to_string(), json!(incident.name));
    canonical.insert("type".to_string(), json!(incident.incident_type));
    canonical.insert("status".to_string(), json!(incident.status));
    canonical.insert(
        "started_at".to_string(),
        incident
            .started_at
            .map_or(Value::Null, |d| json!(d.to_string())),
    );
    canonical.insert("description".to_string(), json!(incident.description));

    feature(&incident.geometry, overlay(canonical, &incident.properties))
}

/// Serializes a park as a `GeoJSON` feature, using the parks export's
/// property keys.
#[must_use]
pub fn park_feature(park: &ParkRow) -> Value {
    let mut canonical = Map::new();
    canonical.insert("NAME_E".to_string(), json!(park.name));
    canonical.insert("LOC_E".to_string(), json!(park.location));
    canonical.insert("MGMT_E".to_string(), json!(park.management));
    canonical.insert("OWNER_E".to_string(), json!(park.owner));
    canonical.insert("PRK_CLSS".to_string(), json!(park.park_class));
    canonical.insert("URL".to_string(), json!(park.url));

    feature(&park.geometry, overlay(canonical, &park.properties))
}

/// Wraps features in a `FeatureCollection`.
#[must_use]
pub fn feature_collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// The empty `FeatureCollection`, used for unrequested categories.
#[must_use]
pub fn empty_collection() -> Value {
    feature_collection(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn muni(properties: Map<String, Value>) -> MunicipalityRow {
        MunicipalityRow {
            id: 1,
            name: "Winnipeg".to_string(),
            status: "city".to_string(),
            population_2021: 749_607,
            geometry: json!({"type": "Point", "coordinates": [-97.14, 49.89]}),
            properties,
        }
    }

    #[test]
    fn canonical_fields_are_emitted() {
        let feature = municipality_feature(&muni(Map::new()));
        let props = &feature["properties"];

        assert_eq!(props["name"], "Winnipeg");
        assert_eq!(props["status"], "city");
        assert_eq!(props["population_2021"], 749_607);
        assert_eq!(feature["geometry"]["type"], "Point");
    }

    #[test]
    fn stored_properties_win_on_collision() {
        let mut stored = Map::new();
        stored.insert("status".to_string(), json!("x"));
        stored.insert("extra".to_string(), json!(42));

        let feature = municipality_feature(&muni(stored));
        let props = &feature["properties"];

        assert_eq!(props["status"], "x");
        assert_eq!(props["extra"], 42);
        assert_eq!(props["name"], "Winnipeg");
    }

    #[test]
    fn incident_feature_serializes_optional_date() {
        let mut incident = IncidentRow {
            id: 7,
            name: "red river flood".to_string(),
            incident_type: "flood".to_string(),
            status: "confirmed".to_string(),
            started_at: chrono::NaiveDate::from_ymd_opt(2025, 8, 21),
            description: String::new(),
            geometry: json!({}),
            properties: Map::new(),
            uploaded_by: None,
            created_at: String::new(),
        };

        let feature = incident_feature(&incident);
        assert_eq!(feature["properties"]["started_at"], "2025-08-21");
        assert_eq!(feature["properties"]["type"], "flood");

        incident.started_at = None;
        let feature = incident_feature(&incident);
        assert_eq!(feature["properties"]["started_at"], Value::Null);
    }

    #[test]
    fn park_feature_uses_export_keys() {
        let park = ParkRow {
            id: 3,
            name: "Birds Hill".to_string(),
            location: "NE of Winnipeg".to_string(),
            management: "Province".to_string(),
            owner: "Crown".to_string(),
            park_class: "Provincial".to_string(),
            url: String::new(),
            geometry: json!({}),
            properties: Map::new(),
        };

        let feature = park_feature(&park);
        let props = &feature["properties"];
        assert_eq!(props["NAME_E"], "Birds Hill");
        assert_eq!(props["PRK_CLSS"], "Provincial");
        assert_eq!(props["URL"], "");
    }

    #[test]
    fn empty_collection_has_no_features() {
        let fc = empty_collection();
        assert_eq!(fc["type"], "FeatureCollection");
        assert_eq!(fc["features"].as_array().unwrap().len(), 0);
    }
}
