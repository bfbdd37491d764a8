//! Point lookups and admin-unit listing.

use std::str::FromStr;

use geojson::Feature as GeoJsonFeature;
use serde::Serialize;

use crate::error::{HazardError, Result};
use crate::exposure::nearest_feature;
use crate::geojson::layer_feature;
use crate::layer::Layer;
use crate::params::AdminUnitType;
use crate::records::Record;
use crate::store::SpatialStore;

/// Layers that support a closest-feature query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosestLayer {
    Road,
    Settlement,
    River,
    LocalUnit,
    District,
}

impl FromStr for ClosestLayer {
    type Err = HazardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "road" | "roads" => Ok(ClosestLayer::Road),
            "settlement" | "settlements" => Ok(ClosestLayer::Settlement),
            "river" | "rivers" => Ok(ClosestLayer::River),
            "local_unit" | "local_units" => Ok(ClosestLayer::LocalUnit),
            "district" | "districts" => Ok(ClosestLayer::District),
            other => Err(HazardError::validation(format!(
                "Invalid layer '{other}'. Must be one of road, settlement, river, local_unit, district."
            ))),
        }
    }
}

/// Nearest feature to a query point.
///
/// `feature` is always present in the body, `null` when the layer is empty.
#[derive(Debug, Clone, Serialize)]
pub struct ClosestFeature {
    pub feature: Option<GeoJsonFeature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Find the feature of `layer` closest to (`lon`, `lat`).
///
/// Roads report only the feature; every other layer also reports the
/// distance in meters, or a message when nothing was found.
pub fn closest_feature(
    store: &SpatialStore,
    layer: ClosestLayer,
    lon: f64,
    lat: f64,
) -> Result<ClosestFeature> {
    let mut result = match layer {
        ClosestLayer::Road => closest_in(store, &store.roads, lon, lat)?,
        ClosestLayer::Settlement => closest_in(store, &store.settlements, lon, lat)?,
        ClosestLayer::River => closest_in(store, &store.rivers, lon, lat)?,
        ClosestLayer::LocalUnit => closest_in(store, &store.local_units, lon, lat)?,
        ClosestLayer::District => closest_in(store, &store.districts, lon, lat)?,
    };
    if layer == ClosestLayer::Road {
        result.distance_meters = None;
        result.message = None;
    }
    Ok(result)
}

fn closest_in<A: Record>(
    store: &SpatialStore,
    layer: &Layer<A>,
    lon: f64,
    lat: f64,
) -> Result<ClosestFeature> {
    let point = store.projector().point_to_metric(lon, lat)?;
    Ok(match nearest_feature(&point, layer) {
        Some(nearest) => ClosestFeature {
            feature: Some(layer_feature(nearest.feature)),
            distance_meters: Some(nearest.distance_m),
            message: None,
        },
        None => ClosestFeature {
            feature: None,
            distance_meters: None,
            message: Some(format!("No {} found nearby.", A::LABEL.to_lowercase())),
        },
    })
}

/// Id and name of an administrative unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminUnitName {
    pub fid: i64,
    pub name: Option<String>,
}

/// Every unit of the given level, sorted by name with unnamed units last.
pub fn list_admin_units(store: &SpatialStore, unit_type: AdminUnitType) -> Vec<AdminUnitName> {
    let mut units: Vec<AdminUnitName> = match unit_type {
        AdminUnitType::District => names(&store.districts),
        AdminUnitType::LocalUnit => names(&store.local_units),
    };
    units.sort_by(|a, b| match (&a.name, &b.name) {
        (Some(x), Some(y)) => x.cmp(y).then(a.fid.cmp(&b.fid)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.fid.cmp(&b.fid),
    });
    units
}

fn names<A: Record>(layer: &Layer<A>) -> Vec<AdminUnitName> {
    layer
        .iter()
        .map(|f| AdminUnitName {
            fid: f.fid,
            name: f.attributes.display_name().map(str::to_string),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::valley;
    use crate::projection::Projector;

    #[test]
    fn test_closest_settlement() {
        let store = valley();
        let result = closest_feature(&store, ClosestLayer::Settlement, 85.321, 27.706).unwrap();
        let props = result.feature.unwrap().properties.unwrap();
        assert_eq!(props["fid"], 2);
        assert_eq!(props["vdc_name"], "Baneshwor");
        let d = result.distance_meters.unwrap();
        assert!(d > 50.0 && d < 150.0, "distance {d}");
        assert!(result.message.is_none());
    }

    #[test]
    fn test_closest_road_has_no_distance() {
        let store = valley();
        let result = closest_feature(&store, ClosestLayer::Road, 85.31, 27.70).unwrap();
        assert!(result.feature.is_some());
        let body = serde_json::to_value(&result).unwrap();
        assert_eq!(body.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_closest_on_empty_layer() {
        let store = SpatialStore::in_memory(Projector::utm45n().unwrap());
        let result = closest_feature(&store, ClosestLayer::River, 85.3, 27.7).unwrap();
        assert!(result.feature.is_none());
        assert_eq!(result.message.as_deref(), Some("No river found nearby."));

        let body = serde_json::to_value(&result).unwrap();
        assert!(body["feature"].is_null());

        let road = closest_feature(&store, ClosestLayer::Road, 85.3, 27.7).unwrap();
        assert!(serde_json::to_value(&road).unwrap()["feature"].is_null());
    }

    #[test]
    fn test_closest_rejects_non_finite_point() {
        let store = valley();
        assert!(matches!(
            closest_feature(&store, ClosestLayer::District, f64::NAN, 27.7),
            Err(HazardError::Validation(_))
        ));
    }

    #[test]
    fn test_list_admin_units_sorted() {
        let store = valley();
        let units = list_admin_units(&store, AdminUnitType::LocalUnit);
        let names: Vec<_> = units.iter().map(|u| u.name.as_deref().unwrap()).collect();
        assert_eq!(names, vec!["Kathmandu Metropolitan", "Sliver"]);

        let districts = list_admin_units(&store, AdminUnitType::District);
        assert_eq!(
            districts,
            vec![AdminUnitName {
                fid: 27,
                name: Some("Kathmandu".to_string())
            }]
        );
    }

    #[test]
    fn test_closest_layer_from_str() {
        assert_eq!("Local_Units".parse::<ClosestLayer>().unwrap(), ClosestLayer::LocalUnit);
        assert!("lakes".parse::<ClosestLayer>().is_err());
    }
}
