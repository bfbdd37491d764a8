//! River-buffer flood analyses.

use geojson::FeatureCollection;
use serde::Serialize;
use serde_json::json;

use crate::error::Result;
use crate::exposure::{features_within, overlap_percentage};
use crate::geojson::{collection, layer_feature, layer_feature_with, round_to, zone_feature};
use crate::params::{positive, QueryParams, RainfallIntensity, UnitType};
use crate::store::SpatialStore;
use crate::zone::{buffer_union, HazardZone};

/// Parameters of the flash-flood warning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlashFloodParams {
    pub rainfall_intensity: RainfallIntensity,
    /// Base buffer distance in meters, before the rainfall multiplier.
    pub buffer_distance_meters: f64,
}

impl Default for FlashFloodParams {
    fn default() -> Self {
        Self {
            rainfall_intensity: RainfallIntensity::Medium,
            buffer_distance_meters: 500.0,
        }
    }
}

impl FlashFloodParams {
    pub fn from_query(query: &QueryParams) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            rainfall_intensity: query.parse_or("rainfall_intensity", defaults.rainfall_intensity)?,
            buffer_distance_meters: query
                .f64_or("buffer_distance_meters", defaults.buffer_distance_meters)?,
        })
    }

    /// Buffer distance after applying the rainfall multiplier.
    pub fn effective_buffer_m(&self) -> f64 {
        self.buffer_distance_meters * self.rainfall_intensity.multiplier()
    }
}

/// Flash-flood risk zones and what they reach.
#[derive(Debug, Clone, Serialize)]
pub struct FlashFloodWarning {
    pub flood_risk_zones: FeatureCollection,
    pub affected_settlements: FeatureCollection,
    pub affected_roads: FeatureCollection,
    pub simulated_rainfall_intensity: String,
}

/// Buffer every river by the rainfall-scaled distance and report the
/// settlements and roads the dissolved zone touches.
///
/// # Errors
///
/// Returns a validation error when the base buffer distance is not positive.
pub fn flash_flood_warning(
    store: &SpatialStore,
    params: &FlashFloodParams,
) -> Result<FlashFloodWarning> {
    positive("Buffer distance", params.buffer_distance_meters)?;
    let distance = params.effective_buffer_m();
    let zone = river_zone(store, distance)?;

    let zones = if zone.is_empty() {
        Vec::new()
    } else {
        vec![zone_feature(
            &zone,
            json!({
                "type": "Flood Risk Zone",
                "buffer_m": distance,
                "rainfall_intensity": params.rainfall_intensity.to_string(),
            }),
        )]
    };
    let settlements = features_within(&zone.metric, &store.settlements)
        .into_iter()
        .map(layer_feature)
        .collect();
    let roads = features_within(&zone.metric, &store.roads)
        .into_iter()
        .map(layer_feature)
        .collect();

    tracing::debug!(
        buffer_m = distance,
        rainfall = %params.rainfall_intensity,
        "Flash flood zone built"
    );

    Ok(FlashFloodWarning {
        flood_risk_zones: collection(zones),
        affected_settlements: collection(settlements),
        affected_roads: collection(roads),
        simulated_rainfall_intensity: params.rainfall_intensity.to_string(),
    })
}

/// Parameters of the flood-exposure analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloodExposureParams {
    pub buffer_distance_meters: f64,
    pub unit_type: UnitType,
}

impl Default for FloodExposureParams {
    fn default() -> Self {
        Self {
            buffer_distance_meters: 250.0,
            unit_type: UnitType::Settlement,
        }
    }
}

impl FloodExposureParams {
    pub fn from_query(query: &QueryParams) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            buffer_distance_meters: query
                .positive_f64_or("buffer_distance_meters", defaults.buffer_distance_meters)?,
            unit_type: query.parse_or("unit_type", defaults.unit_type)?,
        })
    }
}

/// River buffers and the units inside them.
#[derive(Debug, Clone, Serialize)]
pub struct FloodExposure {
    pub flood_buffers: FeatureCollection,
    pub affected_features: FeatureCollection,
}

/// Settlements or local units touched by the dissolved river buffer. Local
/// units also report what share of their area is inside it.
pub fn flood_exposure(store: &SpatialStore, params: &FloodExposureParams) -> Result<FloodExposure> {
    let zone = river_zone(store, params.buffer_distance_meters)?;
    let buffers = if zone.is_empty() {
        Vec::new()
    } else {
        vec![zone_feature(
            &zone,
            json!({"type": "River Buffer", "buffer_m": params.buffer_distance_meters}),
        )]
    };

    let affected = match params.unit_type {
        UnitType::Settlement => features_within(&zone.metric, &store.settlements)
            .into_iter()
            .map(layer_feature)
            .collect(),
        UnitType::LocalUnit => features_within(&zone.metric, &store.local_units)
            .into_iter()
            .map(|unit| {
                let pct = overlap_percentage(&unit.metric, &zone.metric);
                layer_feature_with(unit, json!({"percentage_affected": round_to(pct, 2)}))
            })
            .collect(),
    };

    Ok(FloodExposure {
        flood_buffers: collection(buffers),
        affected_features: collection(affected),
    })
}

fn river_zone(store: &SpatialStore, distance_m: f64) -> Result<HazardZone> {
    buffer_union(
        store.projector(),
        store.rivers.iter().map(|r| &r.metric),
        distance_m,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::valley;
    use crate::error::HazardError;
    use crate::projection::Projector;

    fn fids(fc: &FeatureCollection) -> Vec<i64> {
        fc.features
            .iter()
            .map(|f| f.property("fid").and_then(|v| v.as_i64()).unwrap())
            .collect()
    }

    #[test]
    fn test_high_rainfall_scales_buffer() {
        let params = FlashFloodParams {
            rainfall_intensity: RainfallIntensity::High,
            buffer_distance_meters: 500.0,
        };
        assert_eq!(params.effective_buffer_m(), 750.0);

        let store = valley();
        let warning = flash_flood_warning(&store, &params).unwrap();
        assert_eq!(fids(&warning.affected_settlements), vec![1, 2]);
        assert_eq!(fids(&warning.affected_roads), vec![10]);
        assert_eq!(warning.simulated_rainfall_intensity, "high");

        let zone = &warning.flood_risk_zones.features[0];
        assert_eq!(zone.property("buffer_m").unwrap(), 750.0);
        assert_eq!(zone.property("type").unwrap(), "Flood Risk Zone");
    }

    #[test]
    fn test_medium_rainfall_excludes_far_settlement() {
        let store = valley();
        let warning = flash_flood_warning(&store, &FlashFloodParams::default()).unwrap();
        assert_eq!(fids(&warning.affected_settlements), vec![1]);
    }

    #[test]
    fn test_non_positive_buffer_rejected() {
        let store = valley();
        let params = FlashFloodParams {
            buffer_distance_meters: 0.0,
            ..FlashFloodParams::default()
        };
        assert!(matches!(
            flash_flood_warning(&store, &params),
            Err(HazardError::Validation(_))
        ));
    }

    #[test]
    fn test_flash_flood_without_rivers() {
        let store = SpatialStore::in_memory(Projector::utm45n().unwrap());
        let warning = flash_flood_warning(&store, &FlashFloodParams::default()).unwrap();
        assert!(warning.flood_risk_zones.features.is_empty());
        assert!(warning.affected_settlements.features.is_empty());
    }

    #[test]
    fn test_params_from_query() {
        let query: QueryParams = [("rainfall_intensity", "HIGH"), ("buffer_distance_meters", "200")]
            .into_iter()
            .collect();
        let params = FlashFloodParams::from_query(&query).unwrap();
        assert_eq!(params.rainfall_intensity, RainfallIntensity::High);
        assert_eq!(params.effective_buffer_m(), 300.0);

        let bad: QueryParams = [("rainfall_intensity", "torrential")].into_iter().collect();
        assert!(FlashFloodParams::from_query(&bad).is_err());
    }

    #[test]
    fn test_flood_exposure_local_unit_percentage() {
        let store = valley();
        let params = FloodExposureParams {
            buffer_distance_meters: 250.0,
            unit_type: UnitType::LocalUnit,
        };
        let exposure = flood_exposure(&store, &params).unwrap();
        assert_eq!(fids(&exposure.affected_features), vec![100]);

        let pct = exposure.affected_features.features[0]
            .property("percentage_affected")
            .and_then(|v| v.as_f64())
            .unwrap();
        // A 500 m wide band across a unit about 4.4 km tall.
        assert!(pct > 5.0 && pct < 20.0, "percentage {pct}");

        let buffer = &exposure.flood_buffers.features[0];
        assert_eq!(buffer.property("type").unwrap(), "River Buffer");
    }

    #[test]
    fn test_flood_exposure_settlements() {
        let store = valley();
        let exposure = flood_exposure(&store, &FloodExposureParams::default()).unwrap();
        assert_eq!(fids(&exposure.affected_features), vec![1]);
    }
}
