//! River morphology: steepness, confluences and sinuosity.

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Distance, Euclidean, Geometry, Line, Point};
use geojson::FeatureCollection;
use serde::Serialize;
use serde_json::json;

use crate::classify::{classify_sinuosity, classify_steepness};
use crate::error::{HazardError, Result};
use crate::exposure::{features_within, line_length, ExposureSet};
use crate::geojson::{collection, feature, geometry, object, round_to};
use crate::layer::Feature;
use crate::params::{MorphologyAnalysis, QueryParams};
use crate::projection::Projected;
use crate::records::River;
use crate::store::SpatialStore;
use crate::zone::buffer_projected;

/// Search radius around a river's endpoints for joining rivers.
const CONFLUENCE_SEARCH_M: f64 = 10.0;

/// Channel length per meter of simulated elevation drop.
const SIMULATED_RUN_PER_DROP_M: f64 = 1_000.0;

/// Parameters of a morphology query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MorphologyParams {
    pub river_fid: i64,
    pub analysis_type: MorphologyAnalysis,
}

impl MorphologyParams {
    pub fn from_query(query: &QueryParams) -> Result<Self> {
        Ok(Self {
            river_fid: query.required_fid("river_fid", "River FID is required.")?,
            analysis_type: query.parse_or("analysis_type", MorphologyAnalysis::Steepness)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MorphologyResult {
    pub morphology_features: FeatureCollection,
}

/// Run one morphology measure over a river.
pub fn river_morphology(store: &SpatialStore, params: &MorphologyParams) -> Result<MorphologyResult> {
    let river = store.rivers.get(params.river_fid).ok_or_else(|| {
        HazardError::NotFound("Selected river not found or has no geometry.".to_string())
    })?;

    let features = match params.analysis_type {
        MorphologyAnalysis::Steepness => vec![steepness(river)],
        MorphologyAnalysis::Confluence => confluences(store, river)?,
        MorphologyAnalysis::Sinuosity => vec![sinuosity(river)?],
    };
    Ok(MorphologyResult {
        morphology_features: collection(features),
    })
}

/// Placeholder gradient: a fixed drop per meter, so every river with length
/// has the same ratio. There is no elevation data behind it.
fn steepness(river: &Feature<River>) -> geojson::Feature {
    let length_m = line_length(&river.metric);
    let ratio = steepness_ratio(length_m);
    feature(
        Some(geometry(&river.geometry.0)),
        object(json!({
            "analysis_type": "steepness",
            "river_fid": river.fid,
            "river_length_m": round_to(length_m, 2),
            "simulated_steepness_ratio": round_to(ratio, 4),
            "steepness_category": classify_steepness(ratio),
        })),
    )
}

/// Unrounded drop / length; 0 for a zero-length river.
fn steepness_ratio(length_m: f64) -> f64 {
    if length_m > 0.0 {
        (length_m / SIMULATED_RUN_PER_DROP_M) / length_m
    } else {
        0.0
    }
}

fn sinuosity(river: &Feature<River>) -> Result<geojson::Feature> {
    let length_m = line_length(&river.metric);
    let (start, end) = endpoints(&river.metric.0)
        .ok_or_else(|| HazardError::geometry(format!("river {} is not a line", river.fid)))?;
    let straight_m = Euclidean.distance(Point::from(start), Point::from(end));
    let ratio = if straight_m > 0.0 { length_m / straight_m } else { 1.0 };
    Ok(feature(
        Some(geometry(&river.geometry.0)),
        object(json!({
            "analysis_type": "sinuosity",
            "river_fid": river.fid,
            "river_length_m": round_to(length_m, 2),
            "straight_line_distance_m": round_to(straight_m, 2),
            "sinuosity_ratio": round_to(ratio, 2),
            "sinuosity_category": classify_sinuosity(ratio),
        })),
    ))
}

/// Points where the river crosses other rivers that come within
/// [`CONFLUENCE_SEARCH_M`] of its start or end.
fn confluences(store: &SpatialStore, river: &Feature<River>) -> Result<Vec<geojson::Feature>> {
    let (start, end) = endpoints(&river.metric.0)
        .ok_or_else(|| HazardError::geometry(format!("river {} is not a line", river.fid)))?;

    let mut joining = ExposureSet::new();
    for endpoint in [start, end] {
        let probe = Projected(Geometry::Point(Point::from(endpoint)));
        let zone = buffer_projected(store.projector(), &probe, CONFLUENCE_SEARCH_M)?;
        joining.extend(
            features_within(&zone.metric, &store.rivers)
                .into_iter()
                .filter(|other| other.fid != river.fid),
        );
    }

    let mut features = Vec::new();
    for other in joining.into_vec() {
        for point in crossings(&river.geometry.0, &other.geometry.0) {
            features.push(feature(
                Some(geometry(&Geometry::Point(point))),
                object(json!({
                    "analysis_type": "confluence",
                    "river_fid": river.fid,
                    "joining_river_fid": other.fid,
                    "description": "Confluence Point",
                })),
            ));
        }
    }
    Ok(features)
}

/// First vertex of the first part and last vertex of the last part.
fn endpoints(geometry: &Geometry<f64>) -> Option<(Coord<f64>, Coord<f64>)> {
    match geometry {
        Geometry::Line(l) => Some((l.start, l.end)),
        Geometry::LineString(ls) => Some((*ls.0.first()?, *ls.0.last()?)),
        Geometry::MultiLineString(mls) => {
            let first = mls.0.iter().find_map(|ls| ls.0.first())?;
            let last = mls.0.iter().rev().find_map(|ls| ls.0.last())?;
            Some((*first, *last))
        }
        _ => None,
    }
}

fn segments(geometry: &Geometry<f64>) -> Vec<Line<f64>> {
    match geometry {
        Geometry::Line(l) => vec![*l],
        Geometry::LineString(ls) => ls.lines().collect(),
        Geometry::MultiLineString(mls) => mls.0.iter().flat_map(|ls| ls.lines()).collect(),
        _ => Vec::new(),
    }
}

/// Single-point intersections between two linear geometries, without
/// repeats. Overlapping collinear stretches are not reported.
fn crossings(a: &Geometry<f64>, b: &Geometry<f64>) -> Vec<Point<f64>> {
    let b_segments = segments(b);
    let mut points: Vec<Point<f64>> = Vec::new();
    for sa in segments(a) {
        for sb in &b_segments {
            if let Some(LineIntersection::SinglePoint { intersection, .. }) =
                line_intersection(sa, *sb)
            {
                let p = Point::from(intersection);
                if !points.contains(&p) {
                    points.push(p);
                }
            }
        }
    }
    points
}
