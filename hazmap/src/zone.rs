//! Hazard zones: buffered exposure regions.
//!
//! Buffers are always computed in the metric projection so the distance is in
//! meters, then reprojected to lon/lat for output. A [`HazardZone`] keeps both
//! copies; exposure tests use the metric one.

use geo::{unary_union, Area, BoundingRect, Buffer, Geometry, MultiPolygon, Point, Rect};

use crate::error::{HazardError, Result};
use crate::projection::{Geographic, Projected, Projector};

/// A buffered region in both CRSs.
#[derive(Debug, Clone)]
pub struct HazardZone {
    /// Buffer distance in meters.
    pub distance_m: f64,
    /// Region in the metric projection.
    pub metric: Projected<MultiPolygon<f64>>,
    /// Region in lon/lat.
    pub geographic: Geographic<MultiPolygon<f64>>,
}

impl HazardZone {
    fn from_metric(projector: &Projector, region: MultiPolygon<f64>, distance_m: f64) -> Result<Self> {
        let metric = Projected(region);
        let geographic = projector.to_geographic(&metric)?;
        Ok(Self {
            distance_m,
            metric,
            geographic,
        })
    }

    /// Whether the region has no polygons.
    pub fn is_empty(&self) -> bool {
        self.metric.0 .0.is_empty()
    }

    /// Metric bounding rectangle, `None` for an empty zone.
    pub fn metric_bounds(&self) -> Option<Rect<f64>> {
        self.metric.0.bounding_rect()
    }

    /// Area in square meters.
    pub fn area_sq_m(&self) -> f64 {
        self.metric.0.unsigned_area()
    }
}

fn check_distance(distance_m: f64) -> Result<f64> {
    if distance_m.is_finite() && distance_m > 0.0 {
        Ok(distance_m)
    } else {
        Err(HazardError::validation(format!(
            "Buffer distance must be a positive number of meters, got {distance_m}"
        )))
    }
}

fn check_geometry(geometry: &Geometry<f64>) -> Result<()> {
    match geometry.bounding_rect() {
        Some(rect)
            if rect.min().x.is_finite()
                && rect.min().y.is_finite()
                && rect.max().x.is_finite()
                && rect.max().y.is_finite() =>
        {
            Ok(())
        }
        Some(_) => Err(HazardError::geometry("geometry has non-finite coordinates")),
        None => Err(HazardError::geometry("cannot buffer an empty geometry")),
    }
}

/// Buffer one lon/lat geometry by `distance_m` meters.
///
/// # Errors
///
/// Returns [`HazardError::Validation`] for a non-positive distance and
/// [`HazardError::Geometry`] for empty or non-finite input.
pub fn buffer_single(
    projector: &Projector,
    geometry: &Geographic<Geometry<f64>>,
    distance_m: f64,
) -> Result<HazardZone> {
    check_geometry(&geometry.0)?;
    let metric = projector.to_metric(geometry)?;
    buffer_projected(projector, &metric, distance_m)
}

/// Buffer a geometry that is already in the metric projection.
pub fn buffer_projected(
    projector: &Projector,
    geometry: &Projected<Geometry<f64>>,
    distance_m: f64,
) -> Result<HazardZone> {
    let distance_m = check_distance(distance_m)?;
    check_geometry(&geometry.0)?;
    HazardZone::from_metric(projector, geometry.0.buffer(distance_m), distance_m)
}

/// Buffer each metric geometry and dissolve the results into one region.
///
/// An empty input yields an empty zone rather than an error, so an empty
/// layer produces empty results downstream.
pub fn buffer_union<'a>(
    projector: &Projector,
    geometries: impl IntoIterator<Item = &'a Projected<Geometry<f64>>>,
    distance_m: f64,
) -> Result<HazardZone> {
    let distance_m = check_distance(distance_m)?;
    let buffers: Vec<MultiPolygon<f64>> = geometries
        .into_iter()
        .filter(|g| check_geometry(&g.0).is_ok())
        .map(|g| g.0.buffer(distance_m))
        .collect();
    let region = if buffers.is_empty() {
        MultiPolygon::new(Vec::new())
    } else {
        unary_union(&buffers)
    };
    HazardZone::from_metric(projector, region, distance_m)
}

/// Concentric buffers around a point, one per tier.
///
/// Each tier is a label and a factor; its radius is `factor * scale` meters.
/// The result is ordered from the largest radius to the smallest, with ties
/// kept in input order.
pub fn tiered_buffers<L: Clone>(
    projector: &Projector,
    center: &Geographic<Point<f64>>,
    scale: f64,
    tiers: &[(L, f64)],
) -> Result<Vec<(L, HazardZone)>> {
    let metric_center = projector.to_metric(center)?;
    let metric_center = Projected(Geometry::Point(metric_center.0));

    let mut ordered: Vec<&(L, f64)> = tiers.iter().collect();
    ordered.sort_by(|a, b| b.1.total_cmp(&a.1));

    ordered
        .into_iter()
        .map(|(label, factor)| {
            let zone = buffer_projected(projector, &metric_center, factor * scale)?;
            Ok((label.clone(), zone))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, Centroid, Contains, Distance, Euclidean};

    fn projector() -> Projector {
        Projector::utm45n().unwrap()
    }

    #[test]
    fn test_point_buffer_centroid() {
        let p = projector();
        let center = Geographic(Geometry::Point(point!(x: 85.3, y: 27.7)));
        let zone = buffer_single(&p, &center, 27_500.0).unwrap();

        let metric_center = p.point_to_metric(85.3, 27.7).unwrap();
        let centroid = zone.metric.0.centroid().unwrap();
        assert!(Euclidean.distance(&centroid, &metric_center.0) < 5.0);

        let geo_centroid = zone.geographic.0.centroid().unwrap();
        assert!((geo_centroid.x() - 85.3).abs() < 1e-3);
        assert!((geo_centroid.y() - 27.7).abs() < 1e-3);
    }

    #[test]
    fn test_buffer_monotonic() {
        let p = projector();
        let line = Geographic(Geometry::LineString(line_string![
            (x: 85.25, y: 27.70),
            (x: 85.35, y: 27.72),
        ]));
        let small = buffer_single(&p, &line, 250.0).unwrap();
        let large = buffer_single(&p, &line, 750.0).unwrap();
        assert!(large.area_sq_m() > small.area_sq_m());
        for polygon in &small.metric.0 {
            for c in polygon.exterior().coords() {
                assert!(large.metric.0.contains(&Point::from(*c)));
            }
        }
    }

    #[test]
    fn test_buffer_rejects_bad_input() {
        let p = projector();
        let center = Geographic(Geometry::Point(point!(x: 85.3, y: 27.7)));
        assert!(matches!(
            buffer_single(&p, &center, 0.0),
            Err(HazardError::Validation(_))
        ));
        assert!(matches!(
            buffer_single(&p, &center, f64::NAN),
            Err(HazardError::Validation(_))
        ));
        let empty = Geographic(Geometry::LineString(geo::LineString::new(vec![])));
        assert!(matches!(
            buffer_single(&p, &empty, 100.0),
            Err(HazardError::Geometry(_))
        ));
    }

    #[test]
    fn test_buffer_union_dissolves_overlaps() {
        let p = projector();
        let a = p
            .to_metric(&Geographic(Geometry::Point(point!(x: 85.300, y: 27.7))))
            .unwrap();
        let b = p
            .to_metric(&Geographic(Geometry::Point(point!(x: 85.305, y: 27.7))))
            .unwrap();
        let zone = buffer_union(&p, [&a, &b], 500.0).unwrap();
        assert_eq!(zone.metric.0 .0.len(), 1);

        let single = buffer_projected(&p, &a, 500.0).unwrap();
        assert!(zone.area_sq_m() > single.area_sq_m());
        assert!(zone.area_sq_m() < 2.0 * single.area_sq_m());
    }

    #[test]
    fn test_buffer_union_empty_input() {
        let p = projector();
        let zone = buffer_union(&p, std::iter::empty(), 500.0).unwrap();
        assert!(zone.is_empty());
        assert_eq!(zone.area_sq_m(), 0.0);
    }

    #[test]
    fn test_tiered_buffers_largest_first() {
        let p = projector();
        let center = Geographic(point!(x: 85.3, y: 27.7));
        let tiers = [("inner", 5_000.0), ("outer", 20_000.0), ("middle", 10_000.0)];
        let zones = tiered_buffers(&p, &center, 2.0, &tiers).unwrap();

        let labels: Vec<&str> = zones.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["outer", "middle", "inner"]);
        assert_eq!(zones[0].1.distance_m, 40_000.0);
        assert!(zones
            .windows(2)
            .all(|w| w[0].1.area_sq_m() > w[1].1.area_sq_m()));
    }
}
