//! Earthquake intensity zones and impact summaries.

use std::collections::BTreeMap;

use geo::{point, Point};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::analysis::REFERENCE_POINT;
use crate::error::{HazardError, Result};
use crate::exposure::{features_within, ExposureSet};
use crate::geojson::{collection, layer_feature, zone_feature};
use crate::params::QueryParams;
use crate::projection::Geographic;
use crate::store::SpatialStore;
use crate::zone::tiered_buffers;

/// Intensity level and its radius per unit of magnitude, in meters.
const INTENSITY_TIERS: [(u8, f64); 5] = [
    (8, 5_000.0),
    (7, 10_000.0),
    (6, 20_000.0),
    (5, 40_000.0),
    (4, 80_000.0),
];

/// Smallest magnitude the hypothetical event is simulated at.
const SIMULATED_MAGNITUDE_FLOOR: f64 = 5.5;

/// Parameters of the intensity simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarthquakeIntensityParams {
    pub min_magnitude: f64,
    /// Look-back window for recorded events. Accepted and validated, but the
    /// simulation always uses the fixed reference epicentre.
    pub days_ago: i64,
}

impl Default for EarthquakeIntensityParams {
    fn default() -> Self {
        Self {
            min_magnitude: 4.0,
            days_ago: 7,
        }
    }
}

impl EarthquakeIntensityParams {
    pub fn from_query(query: &QueryParams) -> Result<Self> {
        let defaults = Self::default();
        let days_ago = query.i64_or("days_ago", defaults.days_ago)?;
        if days_ago < 0 {
            return Err(HazardError::validation("days_ago must not be negative."));
        }
        Ok(Self {
            min_magnitude: query.f64_or("min_magnitude", defaults.min_magnitude)?,
            days_ago,
        })
    }

    /// Magnitude the event is simulated at.
    pub fn simulated_magnitude(&self) -> f64 {
        self.min_magnitude.max(SIMULATED_MAGNITUDE_FLOOR)
    }
}

/// Concentric intensity zones and the settlements inside them.
#[derive(Debug, Clone, Serialize)]
pub struct EarthquakeIntensity {
    pub intensity_zones: FeatureCollection,
    pub exposed_settlements: FeatureCollection,
}

/// Simulate an event at the reference epicentre and list exposed settlements.
///
/// Zones run from the outermost (lowest intensity) inward; a settlement is
/// reported once, for the first zone that reaches it.
pub fn earthquake_intensity(
    store: &SpatialStore,
    params: &EarthquakeIntensityParams,
) -> Result<EarthquakeIntensity> {
    let magnitude = params.simulated_magnitude();
    let (lon, lat) = REFERENCE_POINT;
    let center = Geographic(point!(x: lon, y: lat));
    let zones = tiered_buffers(store.projector(), &center, magnitude, &INTENSITY_TIERS)?;

    let mut exposed = ExposureSet::new();
    let mut zone_features = Vec::with_capacity(zones.len());
    for (level, zone) in &zones {
        zone_features.push(zone_feature(
            zone,
            json!({"intensity_level": level, "buffer_distance_m": zone.distance_m}),
        ));
        exposed.extend(features_within(&zone.metric, &store.settlements));
    }

    tracing::debug!(magnitude, exposed = exposed.len(), "Earthquake intensity simulated");

    Ok(EarthquakeIntensity {
        intensity_zones: collection(zone_features),
        exposed_settlements: collection(exposed.into_vec().into_iter().map(layer_feature).collect()),
    })
}

/// Body of an earthquake-impact request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EarthquakeImpactRequest {
    /// Epicentre as `[lon, lat]`.
    pub coords: Option<Vec<f64>>,
    /// Event magnitude.
    pub mag: Option<f64>,
}

impl EarthquakeImpactRequest {
    fn epicentre_and_magnitude(&self) -> Result<(Point<f64>, f64)> {
        let missing = || HazardError::validation("Coordinates and magnitude are required.");
        let coords = self.coords.as_deref().ok_or_else(missing)?;
        let (lon, lat) = match coords {
            [lon, lat, ..] if lon.is_finite() && lat.is_finite() => (*lon, *lat),
            _ => return Err(missing()),
        };
        let mag = self.mag.filter(|m| m.is_finite() && *m != 0.0).ok_or_else(missing)?;
        Ok((point!(x: lon, y: lat), mag))
    }
}

/// Counts for one risk zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSummary {
    pub settlements_affected: usize,
    pub districts_affected: Vec<String>,
}

/// Per-zone summary plus the zone polygons.
#[derive(Debug, Clone, Serialize)]
pub struct EarthquakeImpact {
    pub summary: BTreeMap<String, ZoneSummary>,
    pub geojson: FeatureCollection,
}

/// Radii of the two risk zones for a magnitude, in meters.
pub fn impact_radii(magnitude: f64) -> [(&'static str, f64); 2] {
    let scale = 1.1f64.powf(magnitude - 5.0);
    [("High Risk", 15_000.0 * scale), ("Medium Risk", 40_000.0 * scale)]
}

/// Settlement counts and district names inside the High and Medium risk
/// zones around a caller-supplied epicentre.
pub fn earthquake_impact(
    store: &SpatialStore,
    request: &EarthquakeImpactRequest,
) -> Result<EarthquakeImpact> {
    let (epicentre, magnitude) = request.epicentre_and_magnitude()?;
    let tiers = impact_radii(magnitude);
    let zones = tiered_buffers(store.projector(), &Geographic(epicentre), 1.0, &tiers)?;

    let mut summary = BTreeMap::new();
    let mut features = Vec::with_capacity(zones.len());
    for (name, zone) in &zones {
        let settlements_affected = features_within(&zone.metric, &store.settlements).len();
        let mut districts_affected: Vec<String> = Vec::new();
        for district in features_within(&zone.metric, &store.districts) {
            if let Some(district_name) = district.attributes.district.as_deref() {
                if !districts_affected.iter().any(|d| d == district_name) {
                    districts_affected.push(district_name.to_string());
                }
            }
        }
        summary.insert(
            name.to_string(),
            ZoneSummary {
                settlements_affected,
                districts_affected,
            },
        );
        features.push(zone_feature(
            zone,
            json!({"risk_zone": name, "radius_m": zone.distance_m}),
        ));
    }

    Ok(EarthquakeImpact {
        summary,
        geojson: collection(features),
    })
}
