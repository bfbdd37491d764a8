//! Administrative-unit profiles.

use chrono::NaiveDate;
use geo::{Area, Distance, Euclidean, Geometry};
use geojson::Geometry as GeoJsonGeometry;
use serde::{Deserialize, Serialize, Serializer};

use crate::analysis::{date_threshold, AdminUnit, REFERENCE_POINT};
use crate::error::{HazardError, Result};
use crate::exposure::{density_per_sq_km, features_intersecting, polygonal, sum_intersecting_length};
use crate::geojson::{geometry, round_to};
use crate::layer::Feature;
use crate::params::{AdminUnitType, QueryParams};
use crate::projection::Projected;
use crate::records::FireDetection;
use crate::store::SpatialStore;

/// Radius of the earthquake exposure proxy around the reference point.
const EARTHQUAKE_PROXY_RADIUS_M: f64 = 20_000.0;
/// Radius of the air-quality exposure proxy around the reference point.
const AQI_PROXY_RADIUS_M: f64 = 10_000.0;
/// Look-back window for historical fire incidents.
const FIRE_HISTORY_DAYS: i64 = 365;

/// Parameters of vulnerability profiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VulnerabilityParams {
    pub unit_type: AdminUnitType,
    pub fids: Vec<i64>,
    pub today: NaiveDate,
}

impl VulnerabilityParams {
    pub fn from_query(query: &QueryParams, today: NaiveDate) -> Result<Self> {
        if query.raw("fids").is_none() {
            return Err(HazardError::validation(
                "FIDs of administrative units are required.",
            ));
        }
        let fids = query.fid_list("fids")?;
        let unit_type = match query.raw("unit_type") {
            None => AdminUnitType::LocalUnit,
            Some(raw) => raw.parse().map_err(|_| {
                HazardError::validation("Invalid unit_type. Must be 'local_unit' or 'district'.")
            })?,
        };
        Ok(Self {
            unit_type,
            fids,
            today,
        })
    }
}

/// Comparative indicators for one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VulnerabilityProfile {
    pub fid: i64,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub unit_type: &'static str,
    pub area_sq_km: f64,
    pub settlement_count: usize,
    pub settlement_density_per_sqkm: f64,
    pub road_length_km: f64,
    pub road_density_km_per_sqkm: f64,
    /// Mean distance from the unit's settlements to every river, `None`
    /// when there is nothing to average.
    #[serde(serialize_with = "number_or_na")]
    pub avg_dist_to_river_m: Option<f64>,
    pub historical_fire_incidents_last_year: usize,
    pub has_earthquake_exposure_proxy: bool,
    pub has_aqi_exposure_proxy: bool,
}

fn number_or_na<S: Serializer>(value: &Option<f64>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_str("N/A"),
    }
}

/// A profile, or the reason one unit could not be profiled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProfileEntry {
    Profile(VulnerabilityProfile),
    Failed { fid: i64, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VulnerabilityProfiles {
    pub profiles: Vec<ProfileEntry>,
}

/// Profile every requested unit in order. A unit that fails does not fail
/// the batch; its entry carries the error instead.
pub fn vulnerability_profiling(
    store: &SpatialStore,
    params: &VulnerabilityParams,
) -> Result<VulnerabilityProfiles> {
    let fire_threshold = date_threshold(params.today, FIRE_HISTORY_DAYS)?;
    let profiles = params
        .fids
        .iter()
        .map(|&fid| match profile_unit(store, params.unit_type, fid, fire_threshold) {
            Ok(profile) => ProfileEntry::Profile(profile),
            Err(HazardError::NotFound(_)) => ProfileEntry::Failed {
                fid,
                error: format!("Unit with FID {fid} not found or has no geometry."),
            },
            Err(e) => {
                tracing::warn!(fid, error = %e, "Unit profile failed");
                ProfileEntry::Failed {
                    fid,
                    error: e.to_string(),
                }
            }
        })
        .collect();
    Ok(VulnerabilityProfiles { profiles })
}

fn profile_unit(
    store: &SpatialStore,
    unit_type: AdminUnitType,
    fid: i64,
    fire_threshold: i64,
) -> Result<VulnerabilityProfile> {
    let unit = AdminUnit::resolve(store, unit_type, fid)?;
    let region = polygonal(unit.metric);
    let area_sq_m = unit.metric.0.unsigned_area();

    let settlements = features_intersecting(unit.metric, &store.settlements);
    let road_length_m = region
        .as_ref()
        .map(|r| sum_intersecting_length(&store.roads, r))
        .unwrap_or(0.0);

    let mut total = 0.0;
    let mut pairs = 0usize;
    for s in &settlements {
        for river in store.rivers.iter() {
            total += Euclidean.distance(&s.metric.0, &river.metric.0);
            pairs += 1;
        }
    }
    let avg_dist_to_river_m = (pairs > 0).then(|| round_to(total / pairs as f64, 2));

    let fires = fires_in(store, unit.metric)
        .filter(|f| matches!(f.attributes.acq_date, Some(d) if d >= fire_threshold))
        .count();

    let (lon, lat) = REFERENCE_POINT;
    let reference = store.projector().point_to_metric(lon, lat)?;
    let near_reference = |radius: f64| {
        settlements
            .iter()
            .any(|s| Euclidean.distance(&s.metric.0, &Geometry::Point(reference.0)) <= radius)
    };

    Ok(VulnerabilityProfile {
        fid: unit.fid,
        name: unit.name.map(str::to_string),
        unit_type: unit_type.as_str(),
        area_sq_km: round_to(area_sq_m / 1_000_000.0, 2),
        settlement_count: settlements.len(),
        settlement_density_per_sqkm: round_to(
            density_per_sq_km(settlements.len() as f64, area_sq_m),
            4,
        ),
        road_length_km: round_to(road_length_m / 1_000.0, 2),
        road_density_km_per_sqkm: round_to(
            density_per_sq_km(road_length_m / 1_000.0, area_sq_m),
            4,
        ),
        avg_dist_to_river_m,
        historical_fire_incidents_last_year: fires,
        has_earthquake_exposure_proxy: near_reference(EARTHQUAKE_PROXY_RADIUS_M),
        has_aqi_exposure_proxy: near_reference(AQI_PROXY_RADIUS_M),
    })
}

fn fires_in<'a>(
    store: &'a SpatialStore,
    boundary: &Projected<Geometry<f64>>,
) -> impl Iterator<Item = &'a Feature<FireDetection>> {
    features_intersecting(boundary, &store.fire1)
        .into_iter()
        .chain(features_intersecting(boundary, &store.fire2))
}

/// Body of a risk-profile request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskProfileRequest {
    pub unit_type: Option<AdminUnitType>,
    pub unit_fid: Option<i64>,
}

/// Hazard-relevant totals inside one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskProfileSummary {
    pub settlements_count: usize,
    pub road_length_km: f64,
    pub river_length_km: f64,
    pub fire_incidents: usize,
}

/// A unit's totals and its boundary geometry.
#[derive(Debug, Clone, Serialize)]
pub struct RiskProfile {
    pub profile: RiskProfileSummary,
    pub geojson: GeoJsonGeometry,
}

/// Settlement count, clipped road and river length, and every recorded fire
/// inside a unit. `unit_type` defaults to local units.
pub fn risk_profile(store: &SpatialStore, request: &RiskProfileRequest) -> Result<RiskProfile> {
    let fid = request
        .unit_fid
        .ok_or_else(|| HazardError::validation("unit_fid is required."))?;
    let unit_type = request.unit_type.unwrap_or(AdminUnitType::LocalUnit);
    let unit = AdminUnit::resolve(store, unit_type, fid)?;

    let (road_length_m, river_length_m) = match polygonal(unit.metric) {
        Some(region) => (
            sum_intersecting_length(&store.roads, &region),
            sum_intersecting_length(&store.rivers, &region),
        ),
        None => (0.0, 0.0),
    };

    Ok(RiskProfile {
        profile: RiskProfileSummary {
            settlements_count: features_intersecting(unit.metric, &store.settlements).len(),
            road_length_km: round_to(road_length_m / 1_000.0, 2),
            river_length_km: round_to(river_length_m / 1_000.0, 2),
            fire_incidents: fires_in(store, unit.metric).count(),
        },
        geojson: geometry(&unit.geometry.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::valley;

    fn oct_19() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn profile_of(entry: &ProfileEntry) -> &VulnerabilityProfile {
        match entry {
            ProfileEntry::Profile(p) => p,
            ProfileEntry::Failed { fid, error } => panic!("unit {fid} failed: {error}"),
        }
    }

    #[test]
    fn test_local_unit_profile() {
        let store = valley();
        let params = VulnerabilityParams {
            unit_type: AdminUnitType::LocalUnit,
            fids: vec![100],
            today: oct_19(),
        };
        let result = vulnerability_profiling(&store, &params).unwrap();
        let p = profile_of(&result.profiles[0]);

        assert_eq!(p.name.as_deref(), Some("Kathmandu Metropolitan"));
        assert_eq!(p.unit_type, "local_unit");
        // 0.06 x 0.04 degrees at 27.7 N is about 5.9 km x 4.4 km.
        assert!(p.area_sq_km > 24.0 && p.area_sq_km < 28.0, "area {}", p.area_sq_km);
        assert_eq!(p.settlement_count, 2);
        // The road crosses the whole unit north to south.
        assert!((p.road_length_km - 4.43).abs() < 0.05, "road {}", p.road_length_km);
        assert!(p.road_density_km_per_sqkm > 0.0);
        let avg = p.avg_dist_to_river_m.unwrap();
        assert!(avg > 380.0 && avg < 450.0, "avg {avg}");
        // fire1 has one recent detection in the unit; fire2 is outside it.
        assert_eq!(p.historical_fire_incidents_last_year, 1);
        assert!(p.has_earthquake_exposure_proxy);
        assert!(p.has_aqi_exposure_proxy);
    }

    #[test]
    fn test_zero_area_unit_has_zero_density() {
        let store = valley();
        let params = VulnerabilityParams {
            unit_type: AdminUnitType::LocalUnit,
            fids: vec![101],
            today: oct_19(),
        };
        let result = vulnerability_profiling(&store, &params).unwrap();
        let p = profile_of(&result.profiles[0]);
        assert_eq!(p.area_sq_km, 0.0);
        assert_eq!(p.settlement_density_per_sqkm, 0.0);
        assert_eq!(p.road_density_km_per_sqkm, 0.0);
        assert_eq!(p.avg_dist_to_river_m, None);
        assert!(!p.has_earthquake_exposure_proxy);

        let body = serde_json::to_value(&result).unwrap();
        assert_eq!(body["profiles"][0]["avg_dist_to_river_m"], "N/A");
    }

    #[test]
    fn test_missing_unit_reported_inline() {
        let store = valley();
        let params = VulnerabilityParams {
            unit_type: AdminUnitType::District,
            fids: vec![27, 5],
            today: oct_19(),
        };
        let result = vulnerability_profiling(&store, &params).unwrap();
        assert_eq!(result.profiles.len(), 2);
        assert_eq!(profile_of(&result.profiles[0]).unit_type, "district");
        assert_eq!(
            result.profiles[1],
            ProfileEntry::Failed {
                fid: 5,
                error: "Unit with FID 5 not found or has no geometry.".to_string(),
            }
        );

        let body = serde_json::to_value(&result).unwrap();
        assert_eq!(body["profiles"][1]["fid"], 5);
        assert!(body["profiles"][1]["error"].is_string());
    }

    #[test]
    fn test_params_from_query() {
        let missing = QueryParams::default();
        let err = VulnerabilityParams::from_query(&missing, oct_19()).unwrap_err();
        assert_eq!(err.to_string(), "FIDs of administrative units are required.");

        let bad_type: QueryParams = [("fids", "1"), ("unit_type", "province")].into_iter().collect();
        let err = VulnerabilityParams::from_query(&bad_type, oct_19()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid unit_type. Must be 'local_unit' or 'district'."
        );

        let ok: QueryParams = [("fids", "3, 1,2"), ("unit_type", "district")].into_iter().collect();
        let params = VulnerabilityParams::from_query(&ok, oct_19()).unwrap();
        assert_eq!(params.fids, vec![3, 1, 2]);
        assert_eq!(params.unit_type, AdminUnitType::District);
    }

    #[test]
    fn test_risk_profile() {
        let store = valley();
        let request = RiskProfileRequest {
            unit_type: Some(AdminUnitType::LocalUnit),
            unit_fid: Some(100),
        };
        let result = risk_profile(&store, &request).unwrap();
        assert_eq!(result.profile.settlements_count, 2);
        // The river is clipped to the unit's 0.06 degree width.
        assert!((result.profile.river_length_km - 5.92).abs() < 0.1);
        assert_eq!(result.profile.fire_incidents, 1);
        assert!(matches!(
            result.geojson.value,
            geojson::Value::Polygon(_)
        ));
    }

    #[test]
    fn test_risk_profile_requires_fid() {
        let store = valley();
        assert!(matches!(
            risk_profile(&store, &RiskProfileRequest::default()),
            Err(HazardError::Validation(_))
        ));
        let request = RiskProfileRequest {
            unit_type: Some(AdminUnitType::District),
            unit_fid: Some(9),
        };
        assert!(matches!(
            risk_profile(&store, &request),
            Err(HazardError::NotFound(_))
        ));
    }
}
