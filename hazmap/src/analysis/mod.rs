//! Endpoint-level analyses.
//!
//! Each analysis is a thin composition of [`crate::zone`] and
//! [`crate::exposure`] over a [`SpatialStore`], returning a typed result that
//! serializes to the response body. Parameters come in as plain structs so
//! the same functions back the HTTP service and the CLI.

mod access;
mod earthquake;
mod flood;
mod lookup;
mod morphology;
mod multi_hazard;
mod profile;
mod wildfire;

pub use access::{
    accessibility, evacuation_planning, infrastructure_accessibility, AccessibilityParams,
    AccessibilityResult, CapacityAssessment, EvacuationParams, EvacuationPlan,
    InfrastructureAccessRequest, AVERAGE_SPEED_MPS, EVACUATION_RADIUS_M,
};
pub use earthquake::{
    earthquake_impact, earthquake_intensity, EarthquakeImpact, EarthquakeImpactRequest,
    EarthquakeIntensity, EarthquakeIntensityParams, ZoneSummary,
};
pub use flood::{
    flash_flood_warning, flood_exposure, FlashFloodParams, FlashFloodWarning, FloodExposure,
    FloodExposureParams,
};
pub use lookup::{closest_feature, list_admin_units, AdminUnitName, ClosestFeature, ClosestLayer};
pub use morphology::{river_morphology, MorphologyParams, MorphologyResult};
pub use multi_hazard::{
    aqi_vulnerability, multi_hazard_exposure, AqiStation, AqiVulnerabilityRequest,
    MultiHazardRequest,
};
pub use profile::{
    risk_profile, vulnerability_profiling, ProfileEntry, RiskProfile, RiskProfileRequest,
    RiskProfileSummary, VulnerabilityParams, VulnerabilityProfile, VulnerabilityProfiles,
};
pub use wildfire::{road_disruption_impact, wildfire_hotspots, RoadDisruptionParams, WildfireParams};

use chrono::{Datelike, Days, NaiveDate};
use geo::{Geometry, LineString, Point};

use crate::error::{HazardError, Result};
use crate::params::AdminUnitType;
use crate::projection::{Geographic, Projected};
use crate::records::Record;
use crate::store::SpatialStore;

/// Fixed reference point (lon, lat) used by the earthquake and air-quality
/// proxies.
pub const REFERENCE_POINT: (f64, f64) = (85.3, 27.7);

/// An administrative boundary resolved from either boundary layer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AdminUnit<'a> {
    pub fid: i64,
    pub name: Option<&'a str>,
    pub geometry: &'a Geographic<Geometry<f64>>,
    pub metric: &'a Projected<Geometry<f64>>,
}

impl<'a> AdminUnit<'a> {
    pub(crate) fn resolve(
        store: &'a SpatialStore,
        unit_type: AdminUnitType,
        fid: i64,
    ) -> Result<Self> {
        match unit_type {
            AdminUnitType::District => {
                let f = store.districts.require(fid)?;
                Ok(Self {
                    fid,
                    name: f.attributes.display_name(),
                    geometry: &f.geometry,
                    metric: &f.metric,
                })
            }
            AdminUnitType::LocalUnit => {
                let f = store.local_units.require(fid)?;
                Ok(Self {
                    fid,
                    name: f.attributes.display_name(),
                    geometry: &f.geometry,
                    metric: &f.metric,
                })
            }
        }
    }
}

/// A date as a `YYYYMMDD` integer, the form fire detections store.
pub fn compact_date(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

/// `YYYYMMDD` of the day `days` before `today`.
pub(crate) fn date_threshold(today: NaiveDate, days: i64) -> Result<i64> {
    let days = u64::try_from(days)
        .map_err(|_| HazardError::validation("days_ago must not be negative."))?;
    today
        .checked_sub_days(Days::new(days))
        .map(compact_date)
        .ok_or_else(|| HazardError::validation("days_ago is out of range."))
}

/// Straight two-point line between lon/lat points.
pub(crate) fn straight_route(from: Point<f64>, to: Point<f64>) -> Geometry<f64> {
    Geometry::LineString(LineString::from(vec![from.0, to.0]))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_date() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(compact_date(d), 20260307);
    }

    #[test]
    fn test_date_threshold() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        assert_eq!(date_threshold(today, 7).unwrap(), 20251227);
        assert_eq!(date_threshold(today, 0).unwrap(), 20260103);
        assert!(matches!(
            date_threshold(today, -1),
            Err(HazardError::Validation(_))
        ));
    }
}
