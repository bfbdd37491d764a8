//! Straight-line accessibility and evacuation planning.
//!
//! Routes here are approximations: a two-point line from the settlement's
//! first vertex to the target, with distances measured in the metric
//! projection. No network routing is attempted.

use geo::{Centroid, Distance, Euclidean, Geometry, Point};
use geojson::{Feature as GeoJsonFeature, FeatureCollection};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::analysis::{straight_route, AdminUnit};
use crate::error::{HazardError, Result};
use crate::exposure::{features_intersecting, features_within_distance, nearest_to};
use crate::geojson::{collection, feature, geometry, layer_feature, layer_feature_with, object, round_to};
use crate::layer::{Feature, Layer};
use crate::params::{AdminUnitType, FacilityType, Infrastructure, QueryParams};
use crate::projection::Projected;
use crate::records::{Record, Settlement, Shelter};
use crate::store::SpatialStore;

/// Assumed travel speed, about 30 km/h.
pub const AVERAGE_SPEED_MPS: f64 = 8.33;

/// Shelters farther than this from the settlement are not offered.
pub const EVACUATION_RADIUS_M: f64 = 20_000.0;

/// Parameters of the facility accessibility query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessibilityParams {
    pub start_fid: i64,
    pub facility_type: FacilityType,
}

impl AccessibilityParams {
    pub fn from_query(query: &QueryParams) -> Result<Self> {
        Ok(Self {
            start_fid: query.required_fid("start_fid", "Starting settlement FID is required.")?,
            facility_type: query.parse_or("facility_type", FacilityType::DistrictHq)?,
        })
    }
}

/// Route to the chosen facility and the facility itself.
#[derive(Debug, Clone, Serialize)]
pub struct AccessibilityResult {
    pub routes: FeatureCollection,
    pub facilities: FeatureCollection,
}

/// A resolved routing target.
struct Facility {
    name: String,
    kind: String,
    capacity: Value,
    /// Lon/lat point the route ends at.
    point: Point<f64>,
    /// Geometry reported for the facility.
    geometry: Geometry<f64>,
    metric: Projected<Geometry<f64>>,
}

impl Facility {
    fn from_shelter(shelter: &Feature<Shelter>) -> Result<Self> {
        let point = shelter
            .first_point()
            .ok_or_else(|| HazardError::geometry(format!("shelter {} has no vertices", shelter.fid)))?;
        let a = &shelter.attributes;
        Ok(Self {
            name: a.name.clone().unwrap_or_else(|| "Unknown Facility".to_string()),
            kind: a.shelter_type.clone().unwrap_or_default(),
            capacity: a.capacity.map(Value::from).unwrap_or(Value::Null),
            point,
            geometry: shelter.geometry.0.clone(),
            metric: shelter.metric.clone(),
        })
    }
}

/// Route a settlement to the nearest facility of the requested type.
///
/// A district HQ is approximated by the centroid of the district containing
/// the settlement, falling back to the nearest `district_hq` shelter when no
/// district contains it.
///
/// # Errors
///
/// [`HazardError::NotFound`] when the settlement is unknown or no facility of
/// the type exists.
pub fn accessibility(store: &SpatialStore, params: &AccessibilityParams) -> Result<AccessibilityResult> {
    let settlement = store
        .settlements
        .get(params.start_fid)
        .ok_or_else(|| HazardError::NotFound("Starting settlement not found or has no geometry.".to_string()))?;
    let start = settlement
        .first_point()
        .ok_or_else(|| HazardError::geometry("starting settlement has no vertices"))?;

    let facility = match params.facility_type {
        FacilityType::DistrictHq => match district_hq(store, settlement)? {
            Some(hq) => Some(hq),
            None => nearest_shelter_of_type(store, settlement, FacilityType::DistrictHq)?,
        },
        other => nearest_shelter_of_type(store, settlement, other)?,
    };
    let facility = facility.ok_or_else(|| {
        HazardError::NotFound(format!(
            "No suitable {} found or could be approximated.",
            params.facility_type.as_str().replace('_', " ")
        ))
    })?;

    let distance_m = Euclidean.distance(&settlement.metric.0, &facility.metric.0);
    let travel_time_min = distance_m / AVERAGE_SPEED_MPS / 60.0;

    let route = feature(
        Some(geometry(&straight_route(start, facility.point))),
        object(json!({
            "from_settlement_fid": settlement.fid,
            "to_facility_name": facility.name,
            "to_facility_type": facility.kind,
            "distance_meters": round_to(distance_m, 2),
            "travel_time_min": round_to(travel_time_min, 2),
            "route_type": "straight_line_approximation",
        })),
    );
    let target = feature(
        Some(geometry(&facility.geometry)),
        object(json!({
            "name": facility.name,
            "type": facility.kind,
            "capacity": facility.capacity,
        })),
    );

    tracing::debug!(
        settlement = settlement.fid,
        facility = %facility.name,
        distance_m,
        "Accessibility route approximated"
    );

    Ok(AccessibilityResult {
        routes: collection(vec![route]),
        facilities: collection(vec![target]),
    })
}

fn district_hq(store: &SpatialStore, settlement: &Feature<Settlement>) -> Result<Option<Facility>> {
    let Some(district) = features_intersecting(&settlement.metric, &store.districts)
        .into_iter()
        .next()
    else {
        return Ok(None);
    };
    let Some(centroid) = district.metric.0.centroid() else {
        return Ok(None);
    };
    let point = store.projector().to_geographic(&Projected(centroid))?.0;
    let name = district.attributes.display_name().unwrap_or("Unnamed");
    Ok(Some(Facility {
        name: format!("{name} District HQ"),
        kind: "District Headquarters".to_string(),
        capacity: Value::from("N/A"),
        point,
        geometry: Geometry::Point(point),
        metric: Projected(Geometry::Point(centroid)),
    }))
}

fn nearest_shelter_of_type(
    store: &SpatialStore,
    settlement: &Feature<Settlement>,
    facility_type: FacilityType,
) -> Result<Option<Facility>> {
    store
        .shelters
        .iter()
        .filter(|s| s.attributes.shelter_type.as_deref() == Some(facility_type.as_str()))
        .map(|s| (s, Euclidean.distance(&settlement.metric.0, &s.metric.0)))
        .fold(None, |best: Option<(&Feature<_>, f64)>, (s, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((s, d)),
        })
        .map(|(s, _)| Facility::from_shelter(s))
        .transpose()
}

/// Parameters of evacuation planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvacuationParams {
    pub affected_settlement_fid: i64,
    pub population_estimate: i64,
}

impl EvacuationParams {
    pub fn from_query(query: &QueryParams) -> Result<Self> {
        let population_estimate = query.i64_or("population_estimate", 1_000)?;
        if population_estimate < 0 {
            return Err(HazardError::validation("population_estimate must not be negative."));
        }
        Ok(Self {
            affected_settlement_fid: query.required_fid(
                "affected_settlement_fid",
                "Affected settlement FID is required.",
            )?,
            population_estimate,
        })
    }
}

/// Whether nearby shelters can take the estimated population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityAssessment {
    pub estimated_population: i64,
    pub total_nearby_shelter_capacity: i64,
    pub capacity_sufficient: bool,
}

/// Shelters near a settlement, routes to them, and a capacity check.
#[derive(Debug, Clone, Serialize)]
pub struct EvacuationPlan {
    pub affected_settlement: GeoJsonFeature,
    pub evacuation_routes: FeatureCollection,
    pub available_shelters: FeatureCollection,
    pub capacity_assessment: CapacityAssessment,
}

/// Shelters within [`EVACUATION_RADIUS_M`] of the settlement, nearest first.
/// Shelters without a capacity count as zero toward the total.
pub fn evacuation_planning(store: &SpatialStore, params: &EvacuationParams) -> Result<EvacuationPlan> {
    let settlement = store
        .settlements
        .get(params.affected_settlement_fid)
        .ok_or_else(|| HazardError::NotFound("Affected settlement not found or has no geometry.".to_string()))?;
    let start = settlement
        .first_point()
        .ok_or_else(|| HazardError::geometry("affected settlement has no vertices"))?;

    let mut nearby = features_within_distance(&settlement.metric, &store.shelters, EVACUATION_RADIUS_M);
    nearby.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));

    let mut total_capacity = 0;
    let mut routes = Vec::with_capacity(nearby.len());
    let mut shelters = Vec::with_capacity(nearby.len());
    for near in &nearby {
        let shelter = near.feature;
        let capacity = shelter.attributes.capacity;
        total_capacity += capacity.unwrap_or(0);
        shelters.push(layer_feature(shelter));

        let Some(end) = shelter.first_point() else {
            continue;
        };
        routes.push(feature(
            Some(geometry(&straight_route(start, end))),
            object(json!({
                "from_settlement_fid": settlement.fid,
                "to_shelter_name": shelter.attributes.name,
                "to_shelter_fid": shelter.fid,
                "distance_meters": round_to(near.distance_m, 2),
                "shelter_capacity": capacity,
            })),
        ));
    }

    Ok(EvacuationPlan {
        affected_settlement: layer_feature(settlement),
        evacuation_routes: collection(routes),
        available_shelters: collection(shelters),
        capacity_assessment: CapacityAssessment {
            estimated_population: params.population_estimate,
            total_nearby_shelter_capacity: total_capacity,
            capacity_sufficient: total_capacity >= params.population_estimate,
        },
    })
}

/// Body of an infrastructure-accessibility request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfrastructureAccessRequest {
    pub infrastructure: Option<Infrastructure>,
    pub admin_unit_type: Option<AdminUnitType>,
    pub admin_unit_fid: Option<i64>,
}

/// Every settlement in an administrative unit with its distance to the
/// nearest road or river, as `distance_to_<layer>_m`.
pub fn infrastructure_accessibility(
    store: &SpatialStore,
    request: &InfrastructureAccessRequest,
) -> Result<FeatureCollection> {
    let (Some(infrastructure), Some(fid)) = (request.infrastructure, request.admin_unit_fid) else {
        return Err(HazardError::validation("Invalid parameters."));
    };
    let unit_type = request.admin_unit_type.unwrap_or(AdminUnitType::LocalUnit);
    let unit = AdminUnit::resolve(store, unit_type, fid)?;

    let settlements = features_intersecting(unit.metric, &store.settlements);
    let key = format!("distance_to_{}_m", infrastructure.layer_name());
    let features = match infrastructure {
        Infrastructure::Roads => with_nearest_distance(&settlements, &store.roads, &key),
        Infrastructure::Rivers => with_nearest_distance(&settlements, &store.rivers, &key),
    };
    Ok(collection(features))
}

fn with_nearest_distance<A: Record>(
    settlements: &[&Feature<Settlement>],
    infrastructure: &Layer<A>,
    key: &str,
) -> Vec<GeoJsonFeature> {
    settlements
        .iter()
        .filter_map(|s| {
            let nearest = nearest_to(&s.metric, infrastructure)?;
            let mut extra = serde_json::Map::new();
            extra.insert(key.to_string(), Value::from(round_to(nearest.distance_m, 2)));
            Some(layer_feature_with(s, Value::Object(extra)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::{settlement, valley};
    use crate::projection::Projector;
    use crate::store::default_shelters;

    #[test]
    fn test_district_hq_is_district_centroid() {
        let store = valley();
        let params = AccessibilityParams {
            start_fid: 3,
            facility_type: FacilityType::DistrictHq,
        };
        let result = accessibility(&store, &params).unwrap();
        let route = result.routes.features[0].properties.as_ref().unwrap();
        assert_eq!(route["to_facility_name"], "Kathmandu District HQ");
        assert_eq!(route["to_facility_type"], "District Headquarters");
        assert_eq!(route["route_type"], "straight_line_approximation");

        let facility = result.facilities.features[0].properties.as_ref().unwrap();
        assert_eq!(facility["capacity"], "N/A");

        // Centroid of the district square is near (85.30, 27.70).
        let d = route["distance_meters"].as_f64().unwrap();
        assert!(d > 10_000.0 && d < 11_500.0, "distance {d}");
        let minutes = route["travel_time_min"].as_f64().unwrap();
        assert!((minutes - round_to(d / AVERAGE_SPEED_MPS / 60.0, 2)).abs() < 0.011);
    }

    #[test]
    fn test_district_hq_falls_back_to_shelter() {
        let p = Projector::utm45n().unwrap();
        let mut store = valley();
        store.districts = Layer::empty("districts");
        store.shelters = default_shelters(&p).unwrap();
        store.settlements = Layer::new("settlements", vec![settlement(&p, 9, "Makwanpur", 85.05, 27.42)]);

        let params = AccessibilityParams {
            start_fid: 9,
            facility_type: FacilityType::DistrictHq,
        };
        let result = accessibility(&store, &params).unwrap();
        let route = result.routes.features[0].properties.as_ref().unwrap();
        assert_eq!(route["to_facility_name"], "Hetauda District HQ");
        assert_eq!(route["to_facility_type"], "district_hq");
        assert_eq!(result.facilities.features[0].properties.as_ref().unwrap()["capacity"], 100);
    }

    #[test]
    fn test_nearest_shelter_of_type() {
        let store = valley();
        let params = AccessibilityParams {
            start_fid: 1,
            facility_type: FacilityType::School,
        };
        let result = accessibility(&store, &params).unwrap();
        let route = result.routes.features[0].properties.as_ref().unwrap();
        assert_eq!(route["to_facility_name"], "Naxal School");
        assert_eq!(route["from_settlement_fid"], 1);
    }

    #[test]
    fn test_no_facility_of_type() {
        let store = valley();
        let params = AccessibilityParams {
            start_fid: 1,
            facility_type: FacilityType::PoliceStation,
        };
        let err = accessibility(&store, &params).unwrap_err();
        assert!(matches!(err, HazardError::NotFound(_)));
        assert_eq!(
            err.to_string(),
            "No suitable police station found or could be approximated."
        );
    }

    #[test]
    fn test_unknown_start_settlement() {
        let store = valley();
        let params = AccessibilityParams {
            start_fid: 404,
            facility_type: FacilityType::Hospital,
        };
        assert!(matches!(
            accessibility(&store, &params),
            Err(HazardError::NotFound(_))
        ));
    }

    #[test]
    fn test_start_fid_required() {
        let err = AccessibilityParams::from_query(&QueryParams::default()).unwrap_err();
        assert_eq!(err.to_string(), "Starting settlement FID is required.");
    }

    #[test]
    fn test_evacuation_orders_shelters_by_distance() {
        let store = valley();
        let params = EvacuationParams {
            affected_settlement_fid: 1,
            population_estimate: 600,
        };
        let plan = evacuation_planning(&store, &params).unwrap();

        let names: Vec<_> = plan
            .evacuation_routes
            .features
            .iter()
            .map(|f| f.property("to_shelter_name").unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Kathmandu Hospital", "Naxal School"]);
        assert_eq!(plan.available_shelters.features.len(), 2);
        assert_eq!(
            plan.capacity_assessment,
            CapacityAssessment {
                estimated_population: 600,
                total_nearby_shelter_capacity: 700,
                capacity_sufficient: true,
            }
        );
    }

    #[test]
    fn test_evacuation_capacity_insufficient() {
        let store = valley();
        let params = EvacuationParams {
            affected_settlement_fid: 1,
            population_estimate: 701,
        };
        let plan = evacuation_planning(&store, &params).unwrap();
        assert!(!plan.capacity_assessment.capacity_sufficient);
    }

    #[test]
    fn test_evacuation_outside_radius() {
        let p = Projector::utm45n().unwrap();
        let mut store = valley();
        store.settlements = Layer::new("settlements", vec![settlement(&p, 5, "Jumla", 82.18, 29.27)]);
        let params = EvacuationParams {
            affected_settlement_fid: 5,
            population_estimate: 10,
        };
        let plan = evacuation_planning(&store, &params).unwrap();
        assert!(plan.evacuation_routes.features.is_empty());
        assert_eq!(plan.capacity_assessment.total_nearby_shelter_capacity, 0);
        assert!(!plan.capacity_assessment.capacity_sufficient);
    }

    #[test]
    fn test_infrastructure_accessibility() {
        let store = valley();
        let request = InfrastructureAccessRequest {
            infrastructure: Some(Infrastructure::Rivers),
            admin_unit_type: Some(AdminUnitType::LocalUnit),
            admin_unit_fid: Some(100),
        };
        let fc = infrastructure_accessibility(&store, &request).unwrap();
        // Teku and Baneshwor lie inside the unit.
        assert_eq!(fc.features.len(), 2);
        let d = fc.features[0]
            .property("distance_to_rivers_m")
            .and_then(|v| v.as_f64())
            .unwrap();
        assert!(d > 200.0 && d < 250.0, "distance {d}");
    }

    #[test]
    fn test_infrastructure_accessibility_invalid() {
        let store = valley();
        let err = infrastructure_accessibility(&store, &InfrastructureAccessRequest::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameters.");

        let request = InfrastructureAccessRequest {
            infrastructure: Some(Infrastructure::Roads),
            admin_unit_type: Some(AdminUnitType::District),
            admin_unit_fid: Some(1),
        };
        assert!(matches!(
            infrastructure_accessibility(&store, &request),
            Err(HazardError::NotFound(_))
        ));
    }
}
