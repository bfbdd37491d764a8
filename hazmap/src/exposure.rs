//! Exposure evaluation: which features a hazard region touches, and how much.
//!
//! Every function here takes metric geometry. Candidate features come from
//! the layer's R-tree and are then tested exactly.

use std::collections::HashSet;

use geo::{
    Area, BooleanOps, BoundingRect, Distance, Euclidean, Geometry, Intersects, Length,
    MultiLineString, MultiPolygon, Point, Rect,
};

use crate::layer::{Feature, Layer};
use crate::projection::Projected;
use crate::records::Record;

/// A feature together with its distance from a reference geometry.
#[derive(Debug)]
pub struct Nearest<'a, A> {
    pub feature: &'a Feature<A>,
    /// Distance in meters.
    pub distance_m: f64,
}

impl<A> Clone for Nearest<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for Nearest<'_, A> {}

/// Features of `layer` that intersect `region`, in layer order.
pub fn features_within<'a, A: Record>(
    region: &Projected<MultiPolygon<f64>>,
    layer: &'a Layer<A>,
) -> Vec<&'a Feature<A>> {
    let Some(bounds) = region.0.bounding_rect() else {
        return Vec::new();
    };
    layer
        .candidates(&bounds)
        .into_iter()
        .filter(|f| f.metric.0.intersects(&region.0))
        .collect()
}

/// Features of `layer` that intersect an arbitrary metric geometry.
pub fn features_intersecting<'a, A: Record>(
    geometry: &Projected<Geometry<f64>>,
    layer: &'a Layer<A>,
) -> Vec<&'a Feature<A>> {
    let Some(bounds) = geometry.0.bounding_rect() else {
        return Vec::new();
    };
    layer
        .candidates(&bounds)
        .into_iter()
        .filter(|f| f.metric.0.intersects(&geometry.0))
        .collect()
}

/// The polygonal part of a geometry as a region, if it has one.
pub fn polygonal(geometry: &Projected<Geometry<f64>>) -> Option<Projected<MultiPolygon<f64>>> {
    let region = match &geometry.0 {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p.clone()]),
        Geometry::MultiPolygon(mp) => mp.clone(),
        Geometry::Rect(r) => MultiPolygon::new(vec![r.to_polygon()]),
        Geometry::Triangle(t) => MultiPolygon::new(vec![t.to_polygon()]),
        _ => return None,
    };
    Some(Projected(region))
}

/// Features of `layer` within `distance_m` meters of `reference`, in layer order.
pub fn features_within_distance<'a, A: Record>(
    reference: &Projected<Geometry<f64>>,
    layer: &'a Layer<A>,
    distance_m: f64,
) -> Vec<Nearest<'a, A>> {
    let Some(bounds) = reference.0.bounding_rect() else {
        return Vec::new();
    };
    layer
        .candidates(&expand(&bounds, distance_m))
        .into_iter()
        .filter_map(|f| {
            let d = Euclidean.distance(&reference.0, &f.metric.0);
            (d <= distance_m).then_some(Nearest {
                feature: f,
                distance_m: d,
            })
        })
        .collect()
}

/// Whether any feature of `layer` lies within `distance_m` meters of `reference`.
pub fn any_within_distance<A: Record>(
    reference: &Projected<Geometry<f64>>,
    layer: &Layer<A>,
    distance_m: f64,
) -> bool {
    let Some(bounds) = reference.0.bounding_rect() else {
        return false;
    };
    layer
        .candidates(&expand(&bounds, distance_m))
        .into_iter()
        .any(|f| Euclidean.distance(&reference.0, &f.metric.0) <= distance_m)
}

fn expand(rect: &Rect<f64>, by: f64) -> Rect<f64> {
    Rect::new(
        geo::coord! { x: rect.min().x - by, y: rect.min().y - by },
        geo::coord! { x: rect.max().x + by, y: rect.max().y + by },
    )
}

/// Nearest feature to a metric point. `None` means the layer is empty.
pub fn nearest_feature<'a, A: Record>(
    point: &Projected<Point<f64>>,
    layer: &'a Layer<A>,
) -> Option<Nearest<'a, A>> {
    layer
        .nearest_to_point(point)
        .map(|(feature, distance_m)| Nearest {
            feature,
            distance_m,
        })
}

/// Nearest feature to any metric geometry.
///
/// Point-like references use the R-tree; other shapes fall back to a scan
/// with exact geometry-to-geometry distance. Ties keep the earlier feature.
pub fn nearest_to<'a, A: Record>(
    reference: &Projected<Geometry<f64>>,
    layer: &'a Layer<A>,
) -> Option<Nearest<'a, A>> {
    match &reference.0 {
        Geometry::Point(p) => return nearest_feature(&Projected(*p), layer),
        Geometry::MultiPoint(mp) if mp.0.len() == 1 => {
            return nearest_feature(&Projected(mp.0[0]), layer)
        }
        _ => {}
    }
    layer
        .iter()
        .map(|f| Nearest {
            feature: f,
            distance_m: Euclidean.distance(&reference.0, &f.metric.0),
        })
        .fold(None, |best: Option<Nearest<'a, A>>, candidate| match best {
            Some(b) if b.distance_m <= candidate.distance_m => Some(b),
            _ => Some(candidate),
        })
}

/// Share of `feature`'s area that lies inside `region`, as a percentage.
///
/// Zero-area and non-polygonal features report 0. The result is clamped to
/// `[0, 100]` to absorb floating-point noise from the overlay.
pub fn overlap_percentage(
    feature: &Projected<Geometry<f64>>,
    region: &Projected<MultiPolygon<f64>>,
) -> f64 {
    let area = feature.0.unsigned_area();
    if area.is_nan() || area <= 0.0 {
        return 0.0;
    }
    let overlap = match &feature.0 {
        Geometry::Polygon(p) => p.intersection(&region.0).unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.intersection(&region.0).unsigned_area(),
        Geometry::Rect(r) => r.to_polygon().intersection(&region.0).unsigned_area(),
        _ => 0.0,
    };
    (overlap / area * 100.0).clamp(0.0, 100.0)
}

/// Quantity per square kilometer for an area given in square meters.
///
/// A zero (or invalid) area yields 0 rather than a division error.
pub fn density_per_sq_km(quantity: f64, area_sq_m: f64) -> f64 {
    if area_sq_m.is_finite() && area_sq_m > 0.0 {
        quantity / area_sq_m * 1_000_000.0
    } else {
        0.0
    }
}

/// Total length in meters of the parts of `layer`'s lines inside `region`.
///
/// Only the clipped portion of each line counts, never its whole length.
pub fn sum_intersecting_length<A: Record>(
    layer: &Layer<A>,
    region: &Projected<MultiPolygon<f64>>,
) -> f64 {
    let Some(bounds) = region.0.bounding_rect() else {
        return 0.0;
    };
    layer
        .candidates(&bounds)
        .into_iter()
        .filter_map(|f| as_multi_line_string(&f.metric.0))
        .map(|lines| Euclidean.length(&region.0.clip(&lines, false)))
        .sum()
}

/// Full length in meters of a linear geometry; 0 for anything else.
pub fn line_length(geometry: &Projected<Geometry<f64>>) -> f64 {
    as_multi_line_string(&geometry.0)
        .map(|lines| Euclidean.length(&lines))
        .unwrap_or(0.0)
}

fn as_multi_line_string(geometry: &Geometry<f64>) -> Option<MultiLineString<f64>> {
    match geometry {
        Geometry::LineString(ls) => Some(MultiLineString::new(vec![ls.clone()])),
        Geometry::MultiLineString(mls) => Some(mls.clone()),
        Geometry::Line(l) => Some(MultiLineString::new(vec![(*l).into()])),
        _ => None,
    }
}

/// Collects features across several queries, keeping only the first
/// occurrence of each fid.
#[derive(Debug)]
pub struct ExposureSet<'a, A> {
    seen: HashSet<i64>,
    features: Vec<&'a Feature<A>>,
}

impl<A> Default for ExposureSet<'_, A> {
    fn default() -> Self {
        Self {
            seen: HashSet::new(),
            features: Vec::new(),
        }
    }
}

impl<'a, A> ExposureSet<'a, A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature; returns false if its fid was already present.
    pub fn insert(&mut self, feature: &'a Feature<A>) -> bool {
        if self.seen.insert(feature.fid) {
            self.features.push(feature);
            true
        } else {
            false
        }
    }

    /// Add every feature, first seen wins.
    pub fn extend(&mut self, features: impl IntoIterator<Item = &'a Feature<A>>) {
        for feature in features {
            self.insert(feature);
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features in first-seen order.
    pub fn into_vec(self) -> Vec<&'a Feature<A>> {
        self.features
    }
}
