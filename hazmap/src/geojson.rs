//! GeoJSON response assembly.
//!
//! Layer features become GeoJSON features whose properties are the feature id
//! plus the typed attribute record. Nothing else is added unless a caller
//! passes it explicitly, so values used only for computation (sort
//! distances, metric geometry) never leak into responses.
//!
//! # Example
//!
//! ```ignore
//! use hazmap::geojson::{collection, layer_feature_with};
//! use serde_json::json;
//!
//! let features = exposed
//!     .iter()
//!     .map(|s| layer_feature_with(s, json!({"exposure_score": 2})))
//!     .collect();
//! let fc = collection(features);
//! ```

use geo::Geometry;
use geojson::{Feature as GeoJsonFeature, FeatureCollection, JsonObject, Value as GeoJsonValue};
use serde_json::Value;

use crate::layer::{Feature, Layer};
use crate::records::Record;
use crate::zone::HazardZone;

/// Convert a lon/lat geometry into a GeoJSON geometry.
pub fn geometry(geometry: &Geometry<f64>) -> geojson::Geometry {
    geojson::Geometry::new(GeoJsonValue::from(geometry))
}

/// Build a feature from an optional geometry and properties.
pub fn feature(geometry: Option<geojson::Geometry>, properties: JsonObject) -> GeoJsonFeature {
    GeoJsonFeature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Turn a JSON object value into a property map. Non-objects yield an empty map.
pub fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

/// `fid` plus every attribute of the record.
pub fn record_properties<A: Record>(fid: i64, attributes: &A) -> JsonObject {
    let mut properties = serde_json::to_value(attributes)
        .map(object)
        .unwrap_or_default();
    properties.insert("fid".to_string(), Value::from(fid));
    properties
}

/// A layer feature with its lon/lat geometry and attribute properties.
pub fn layer_feature<A: Record>(feature: &Feature<A>) -> GeoJsonFeature {
    self::feature(
        Some(geometry(&feature.geometry.0)),
        record_properties(feature.fid, &feature.attributes),
    )
}

/// A layer feature with extra properties merged over its attributes.
pub fn layer_feature_with<A: Record>(feature: &Feature<A>, extra: Value) -> GeoJsonFeature {
    let mut properties = record_properties(feature.fid, &feature.attributes);
    properties.extend(object(extra));
    self::feature(Some(geometry(&feature.geometry.0)), properties)
}

/// A hazard zone polygon with the given properties.
pub fn zone_feature(zone: &HazardZone, properties: Value) -> GeoJsonFeature {
    let geometry = Geometry::MultiPolygon(zone.geographic.0.clone());
    feature(Some(self::geometry(&geometry)), object(properties))
}

/// Wrap features in a FeatureCollection.
pub fn collection(features: Vec<GeoJsonFeature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Every feature of a layer as a FeatureCollection.
pub fn layer_collection<A: Record>(layer: &Layer<A>) -> FeatureCollection {
    collection(layer.iter().map(layer_feature).collect())
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{Geographic, Projector};
    use crate::records::{Road, Settlement};
    use crate::zone::buffer_single;
    use geo::point;
    use serde_json::json;

    fn thimi() -> Feature<Settlement> {
        let projector = Projector::utm45n().unwrap();
        Feature::new(
            &projector,
            12,
            point!(x: 85.38, y: 27.68).into(),
            Settlement {
                vdc_name: Some("Thimi".to_string()),
                dist_name: Some("Bhaktapur".to_string()),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_layer_feature_properties() {
        let f = layer_feature(&thimi());
        let props = f.properties.unwrap();
        assert_eq!(props["fid"], 12);
        assert_eq!(props["vdc_name"], "Thimi");
        assert_eq!(props["dist_name"], "Bhaktapur");
        assert_eq!(props.len(), 3);

        let geometry = f.geometry.unwrap();
        assert_eq!(geometry.value, GeoJsonValue::Point(vec![85.38, 27.68]));
    }

    #[test]
    fn test_layer_feature_with_extra() {
        let f = layer_feature_with(&thimi(), json!({"exposure_score": 2}));
        let props = f.properties.unwrap();
        assert_eq!(props["exposure_score"], 2);
        assert_eq!(props["fid"], 12);
    }

    #[test]
    fn test_record_properties_keep_renamed_fields() {
        let road = Road {
            road_type: Some("Feeder".to_string()),
            ..Road::default()
        };
        let props = record_properties(3, &road);
        assert_eq!(props["type"], "Feeder");
        assert!(props["road_code"].is_null());
    }

    #[test]
    fn test_zone_feature() {
        let projector = Projector::utm45n().unwrap();
        let zone = buffer_single(
            &projector,
            &Geographic(point!(x: 85.3, y: 27.7).into()),
            1_000.0,
        )
        .unwrap();
        let f = zone_feature(&zone, json!({"buffer_distance_m": 1000.0}));
        assert!(matches!(
            f.geometry.unwrap().value,
            GeoJsonValue::MultiPolygon(_)
        ));
        assert_eq!(f.properties.unwrap()["buffer_distance_m"], 1000.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.34567, 2), 12.35);
        assert_eq!(round_to(0.000049, 4), 0.0);
        assert_eq!(round_to(3.0, 0), 3.0);
    }
}
