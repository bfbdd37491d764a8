//! Fire hotspots and road disruption.

use chrono::NaiveDate;
use geojson::FeatureCollection;
use serde_json::{json, Value};

use crate::analysis::date_threshold;
use crate::error::{HazardError, Result};
use crate::exposure::features_within;
use crate::geojson::{collection, feature, geometry, layer_feature_with, record_properties};
use crate::layer::Feature;
use crate::params::QueryParams;
use crate::records::FireDetection;
use crate::store::SpatialStore;
use crate::zone::buffer_projected;

/// Parameters of the hotspot query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WildfireParams {
    pub days_ago: i64,
    pub min_confidence: i64,
    /// Day the look-back window ends on.
    pub today: NaiveDate,
}

impl WildfireParams {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            days_ago: 7,
            min_confidence: 70,
            today,
        }
    }

    pub fn from_query(query: &QueryParams, today: NaiveDate) -> Result<Self> {
        let defaults = Self::new(today);
        Ok(Self {
            days_ago: query.i64_or("days_ago", defaults.days_ago)?,
            min_confidence: query.i64_or("min_confidence", defaults.min_confidence)?,
            today,
        })
    }
}

/// Fire detections from both layers acquired within the window and at or
/// above the confidence floor. Detections missing either value never match.
pub fn wildfire_hotspots(store: &SpatialStore, params: &WildfireParams) -> Result<FeatureCollection> {
    let threshold = date_threshold(params.today, params.days_ago)?;
    let features = store
        .fires()
        .filter(|f| {
            let a = &f.attributes;
            matches!(a.acq_date, Some(d) if d >= threshold)
                && matches!(a.confidence, Some(c) if c >= params.min_confidence)
        })
        .map(fire_feature)
        .collect::<Vec<_>>();

    tracing::debug!(threshold, hotspots = features.len(), "Wildfire hotspots selected");
    Ok(collection(features))
}

fn fire_feature(fire: &Feature<FireDetection>) -> geojson::Feature {
    let mut properties = record_properties(fire.fid, &fire.attributes);
    if let Some(date) = fire.attributes.acq_date {
        properties.insert("acq_date".to_string(), Value::from(iso_date(date)));
    }
    feature(Some(geometry(&fire.geometry.0)), properties)
}

/// `YYYYMMDD` as `YYYY-MM-DD`; anything else is passed through as digits.
fn iso_date(compact: i64) -> String {
    let digits = compact.to_string();
    if digits.len() == 8 {
        format!("{}-{}-{}", &digits[..4], &digits[4..6], &digits[6..])
    } else {
        digits
    }
}

/// Parameters of the road-disruption analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadDisruptionParams {
    pub road_fid: i64,
    pub impact_radius_meters: f64,
}

impl RoadDisruptionParams {
    pub fn from_query(query: &QueryParams) -> Result<Self> {
        Ok(Self {
            road_fid: query.required_i64("road_fid")?,
            impact_radius_meters: query.positive_f64_or("impact_radius_meters", 5_000.0)?,
        })
    }
}

/// The disrupted road followed by every settlement within the impact radius.
pub fn road_disruption_impact(
    store: &SpatialStore,
    params: &RoadDisruptionParams,
) -> Result<FeatureCollection> {
    let road = store
        .roads
        .get(params.road_fid)
        .ok_or_else(|| HazardError::not_found("Road", params.road_fid))?;
    let zone = buffer_projected(store.projector(), &road.metric, params.impact_radius_meters)?;

    let mut features = vec![layer_feature_with(road, json!({"analysis_type": "disrupted_road"}))];
    features.extend(
        features_within(&zone.metric, &store.settlements)
            .into_iter()
            .map(|s| layer_feature_with(s, json!({"analysis_type": "affected_settlement"}))),
    );
    Ok(collection(features))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::{fire, valley};
    use crate::layer::Layer;
    use crate::projection::Projector;

    fn oct_19() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_hotspots_window_and_confidence() {
        let p = Projector::utm45n().unwrap();
        let mut store = valley();
        store.fire1 = Layer::new(
            "fire1",
            vec![
                fire(&p, 1, 85.31, 27.70, 20261015, 80),
                fire(&p, 2, 85.32, 27.70, 20261001, 90),
                fire(&p, 3, 85.33, 27.70, 20261018, 50),
            ],
        );
        store.fire2 = Layer::new("fire2", vec![fire(&p, 7, 85.34, 27.70, 20261012, 70)]);

        let fc = wildfire_hotspots(&store, &WildfireParams::new(oct_19())).unwrap();
        let fids: Vec<i64> = fc
            .features
            .iter()
            .map(|f| f.property("fid").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(fids, vec![1, 7]);
        assert_eq!(fc.features[0].property("acq_date").unwrap(), "2026-10-15");
    }

    #[test]
    fn test_hotspots_skip_missing_values() {
        let p = Projector::utm45n().unwrap();
        let mut store = valley();
        let mut undated = fire(&p, 4, 85.3, 27.7, 20261018, 99);
        undated.attributes.acq_date = None;
        store.fire1 = Layer::new("fire1", vec![undated]);
        store.fire2 = Layer::empty("fire2");

        let fc = wildfire_hotspots(&store, &WildfireParams::new(oct_19())).unwrap();
        assert!(fc.features.is_empty());
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(iso_date(20240105), "2024-01-05");
        assert_eq!(iso_date(2024), "2024");
    }

    #[test]
    fn test_road_disruption() {
        let store = valley();
        let params = RoadDisruptionParams {
            road_fid: 10,
            impact_radius_meters: 1_000.0,
        };
        let fc = road_disruption_impact(&store, &params).unwrap();
        let kinds: Vec<_> = fc
            .features
            .iter()
            .map(|f| f.property("analysis_type").unwrap().as_str().unwrap())
            .collect();
        // Teku sits on the road; Baneshwor is about 2 km east of it.
        assert_eq!(kinds, vec!["disrupted_road", "affected_settlement"]);
        assert_eq!(fc.features[1].property("vdc_name").unwrap(), "Teku");
    }

    #[test]
    fn test_road_disruption_unknown_road() {
        let store = valley();
        let params = RoadDisruptionParams {
            road_fid: 999,
            impact_radius_meters: 1_000.0,
        };
        assert!(matches!(
            road_disruption_impact(&store, &params),
            Err(HazardError::NotFound(_))
        ));
    }

    #[test]
    fn test_road_fid_required() {
        let query = QueryParams::default();
        let err = RoadDisruptionParams::from_query(&query).unwrap_err();
        assert_eq!(err.to_string(), "road_fid parameter is required.");
    }
}
