//! Settlement exposure scoring across hazards and air-quality stations.

use geo::point;
use geojson::FeatureCollection;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{HazardError, Result};
use crate::exposure::{any_within_distance, features_within, ExposureSet};
use crate::geojson::{collection, layer_feature, layer_feature_with};
use crate::params::{non_negative, positive, Hazard};
use crate::projection::Geographic;
use crate::store::SpatialStore;
use crate::zone::buffer_single;

fn default_buffer_m() -> f64 {
    500.0
}

/// Body of a multi-hazard exposure request.
#[derive(Debug, Clone, Deserialize)]
pub struct MultiHazardRequest {
    #[serde(default = "default_buffer_m")]
    pub buffer_m: f64,
    #[serde(default)]
    pub hazards: Vec<Hazard>,
}

impl Default for MultiHazardRequest {
    fn default() -> Self {
        Self {
            buffer_m: default_buffer_m(),
            hazards: Vec::new(),
        }
    }
}

/// Score each settlement one point per selected hazard with a source within
/// `buffer_m`: any river for floods, any detection in either fire layer for
/// fires. Settlements scoring zero are left out.
pub fn multi_hazard_exposure(
    store: &SpatialStore,
    request: &MultiHazardRequest,
) -> Result<FeatureCollection> {
    let buffer_m = non_negative("buffer_m", request.buffer_m)?;
    let flood = request.hazards.contains(&Hazard::Flood);
    let fire = request.hazards.contains(&Hazard::Fire);

    let features = store
        .settlements
        .iter()
        .filter_map(|s| {
            let mut score = 0u32;
            if flood && any_within_distance(&s.metric, &store.rivers, buffer_m) {
                score += 1;
            }
            if fire
                && (any_within_distance(&s.metric, &store.fire1, buffer_m)
                    || any_within_distance(&s.metric, &store.fire2, buffer_m))
            {
                score += 1;
            }
            (score > 0).then(|| layer_feature_with(s, json!({"exposure_score": score})))
        })
        .collect();
    Ok(collection(features))
}

/// One air-quality station reading.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AqiStation {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Reported index. Feeds send numbers, digit strings, or placeholders
    /// such as `"-"`.
    pub aqi: Value,
}

impl AqiStation {
    /// The index as an integer, if the reading is a plain non-negative number.
    pub fn aqi_value(&self) -> Option<i64> {
        match &self.aqi {
            Value::Number(n) => n.as_u64().and_then(|v| i64::try_from(v).ok()),
            Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                s.parse().ok()
            }
            _ => None,
        }
    }
}

fn default_aqi_threshold() -> i64 {
    101
}

fn default_radius_km() -> f64 {
    10.0
}

/// Body of an air-quality vulnerability request. Station readings are
/// relayed by the caller from the monitoring feed.
#[derive(Debug, Clone, Deserialize)]
pub struct AqiVulnerabilityRequest {
    #[serde(default = "default_aqi_threshold")]
    pub aqi_threshold: i64,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    pub stations: Option<Vec<AqiStation>>,
}

/// Settlements within `radius_km` of any station at or above the threshold,
/// each listed once.
///
/// # Errors
///
/// [`HazardError::Validation`] without a station list or with a non-positive
/// radius; [`HazardError::Upstream`] when a qualifying station has unusable
/// coordinates.
pub fn aqi_vulnerability(
    store: &SpatialStore,
    request: &AqiVulnerabilityRequest,
) -> Result<FeatureCollection> {
    let stations = request
        .stations
        .as_deref()
        .ok_or_else(|| HazardError::validation("stations are required."))?;
    let radius_m = positive("radius_km", request.radius_km)? * 1_000.0;

    let mut affected = ExposureSet::new();
    for (i, station) in stations.iter().enumerate() {
        if !matches!(station.aqi_value(), Some(aqi) if aqi >= request.aqi_threshold) {
            continue;
        }
        let (Some(lon), Some(lat)) = (station.lon, station.lat) else {
            return Err(HazardError::Upstream(format!(
                "AQI station {i} has no coordinates"
            )));
        };
        if !lon.is_finite() || !lat.is_finite() {
            return Err(HazardError::Upstream(format!(
                "AQI station {i} has invalid coordinates"
            )));
        }
        let zone = buffer_single(
            store.projector(),
            &Geographic(point!(x: lon, y: lat).into()),
            radius_m,
        )?;
        affected.extend(features_within(&zone.metric, &store.settlements));
    }

    tracing::debug!(
        stations = stations.len(),
        affected = affected.len(),
        "AQI exposure evaluated"
    );
    Ok(collection(affected.into_vec().into_iter().map(layer_feature).collect()))
}
