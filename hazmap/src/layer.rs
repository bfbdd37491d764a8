//! In-memory GIS layers with an R-tree over metric envelopes.
//!
//! A [`Layer`] owns its features in both CRSs: the geographic geometry is
//! what gets returned to clients, the projected copy is what every distance,
//! area and intersection test runs against. Projection happens once, at load.

use std::collections::HashMap;
use std::path::Path;

use geo::{BoundingRect, Distance, Euclidean, Geometry, Point, Rect};
use geojson::{feature::Id, FeatureCollection, GeoJson};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::error::{HazardError, Result};
use crate::projection::{Geographic, Projected, Projector};
use crate::records::Record;

/// One feature of a layer.
#[derive(Debug, Clone)]
pub struct Feature<A> {
    /// Feature id, unique within its layer.
    pub fid: i64,
    /// Geometry in lon/lat.
    pub geometry: Geographic<Geometry<f64>>,
    /// Geometry in the metric projection.
    pub metric: Projected<Geometry<f64>>,
    /// Typed attributes.
    pub attributes: A,
}

impl<A> Feature<A> {
    /// Build a feature from lon/lat geometry, projecting it once.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::Geometry`] for empty geometry or non-finite
    /// coordinates, and [`HazardError::Projection`] if projection fails.
    pub fn new(
        projector: &Projector,
        fid: i64,
        geometry: Geometry<f64>,
        attributes: A,
    ) -> Result<Self> {
        let bounds = geometry
            .bounding_rect()
            .ok_or_else(|| HazardError::geometry(format!("feature {fid} has empty geometry")))?;
        if !(bounds.min().x.is_finite()
            && bounds.min().y.is_finite()
            && bounds.max().x.is_finite()
            && bounds.max().y.is_finite())
        {
            return Err(HazardError::geometry(format!(
                "feature {fid} has non-finite coordinates"
            )));
        }
        let geometry = Geographic(geometry);
        let metric = projector.to_metric(&geometry)?;
        Ok(Self {
            fid,
            geometry,
            metric,
            attributes,
        })
    }

    /// The feature's first vertex in lon/lat, used as its representative point.
    pub fn first_point(&self) -> Option<Point<f64>> {
        first_coord(&self.geometry.0).map(Point::from)
    }

    /// The feature's first vertex in the metric projection.
    pub fn first_metric_point(&self) -> Option<Projected<Point<f64>>> {
        first_coord(&self.metric.0).map(|c| Projected(Point::from(c)))
    }
}

fn first_coord(geometry: &Geometry<f64>) -> Option<geo::Coord<f64>> {
    use geo::CoordsIter;
    geometry.coords_iter().next()
}

/// R-tree entry. Holds a copy of the metric shape so nearest-neighbour
/// queries rank by exact distance rather than by envelope distance.
#[derive(Debug, Clone)]
struct IndexEntry {
    slot: usize,
    envelope: AABB<[f64; 2]>,
    shape: Geometry<f64>,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for IndexEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let d = Euclidean.distance(&Point::new(point[0], point[1]), &self.shape);
        d * d
    }
}

/// Convert a metric rectangle into an R-tree envelope.
pub fn envelope_of(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// A named, indexed collection of features with attributes `A`.
#[derive(Debug)]
pub struct Layer<A> {
    name: String,
    features: Vec<Feature<A>>,
    by_fid: HashMap<i64, usize>,
    index: RTree<IndexEntry>,
}

impl<A: Record> Layer<A> {
    /// Build a layer from features. Later duplicates of a fid are dropped.
    pub fn new(name: impl Into<String>, features: Vec<Feature<A>>) -> Self {
        let name = name.into();
        let mut by_fid = HashMap::with_capacity(features.len());
        let mut kept = Vec::with_capacity(features.len());
        for feature in features {
            if by_fid.contains_key(&feature.fid) {
                tracing::warn!(layer = %name, fid = feature.fid, "Duplicate fid, keeping first");
                continue;
            }
            by_fid.insert(feature.fid, kept.len());
            kept.push(feature);
        }

        let entries = kept
            .iter()
            .enumerate()
            .filter_map(|(slot, f)| {
                f.metric.0.bounding_rect().map(|rect| IndexEntry {
                    slot,
                    envelope: envelope_of(&rect),
                    shape: f.metric.0.clone(),
                })
            })
            .collect();

        Self {
            name,
            features: kept,
            by_fid,
            index: RTree::bulk_load(entries),
        }
    }

    /// An empty layer.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Build a layer from a GeoJSON FeatureCollection.
    ///
    /// Features without geometry, without a readable integer id, or whose
    /// properties don't fit `A` are skipped with a warning.
    pub fn from_feature_collection(
        name: impl Into<String>,
        collection: FeatureCollection,
        projector: &Projector,
    ) -> Self {
        let name = name.into();
        let mut features = Vec::with_capacity(collection.features.len());

        for (position, feature) in collection.features.into_iter().enumerate() {
            let Some(fid) = feature_id(&feature) else {
                tracing::warn!(layer = %name, position, "Feature has no integer fid, skipping");
                continue;
            };
            let Some(geometry) = feature.geometry else {
                tracing::warn!(layer = %name, fid, "Feature has no geometry, skipping");
                continue;
            };
            let geometry = match Geometry::<f64>::try_from(geometry.value) {
                Ok(g) => g,
                Err(e) => {
                    tracing::warn!(layer = %name, fid, error = %e, "Unsupported geometry, skipping");
                    continue;
                }
            };
            let properties = feature.properties.unwrap_or_default();
            let attributes: A = match serde_json::from_value(serde_json::Value::Object(properties)) {
                Ok(a) => a,
                Err(e) => {
                    tracing::warn!(layer = %name, fid, error = %e, "Invalid attributes, skipping");
                    continue;
                }
            };
            match Feature::new(projector, fid, geometry, attributes) {
                Ok(f) => features.push(f),
                Err(e) => tracing::warn!(layer = %name, fid, error = %e, "Skipping feature"),
            }
        }

        Self::new(name, features)
    }

    /// Load a layer from a `.geojson` file.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::Io`] if the file can't be read and
    /// [`HazardError::InvalidLayer`] if it isn't a GeoJSON FeatureCollection.
    pub fn from_file<P: AsRef<Path>>(
        name: impl Into<String>,
        path: P,
        projector: &Projector,
    ) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| HazardError::InvalidLayer {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        match geojson {
            GeoJson::FeatureCollection(collection) => {
                Ok(Self::from_feature_collection(name, collection, projector))
            }
            _ => Err(HazardError::InvalidLayer {
                path: path.to_path_buf(),
                message: "expected a FeatureCollection".to_string(),
            }),
        }
    }

    /// Layer name, e.g. `"rivers"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the layer has no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// All features in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Feature<A>> {
        self.features.iter()
    }

    /// Feature with the given fid, if present.
    pub fn get(&self, fid: i64) -> Option<&Feature<A>> {
        self.by_fid.get(&fid).map(|&slot| &self.features[slot])
    }

    /// Feature with the given fid.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::NotFound`] if there is no such feature.
    pub fn require(&self, fid: i64) -> Result<&Feature<A>> {
        self.get(fid)
            .ok_or_else(|| HazardError::not_found(A::LABEL, fid))
    }

    /// Features whose metric envelope intersects `rect`, in load order.
    pub fn candidates(&self, rect: &Rect<f64>) -> Vec<&Feature<A>> {
        let mut slots: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&envelope_of(rect))
            .map(|entry| entry.slot)
            .collect();
        slots.sort_unstable();
        slots.into_iter().map(|slot| &self.features[slot]).collect()
    }

    /// Nearest feature to a metric point, with its distance in meters.
    pub fn nearest_to_point(&self, point: &Projected<Point<f64>>) -> Option<(&Feature<A>, f64)> {
        let query = [point.0.x(), point.0.y()];
        self.index
            .nearest_neighbor(&query)
            .map(|entry| (&self.features[entry.slot], entry.distance_2(&query).sqrt()))
    }

    /// Geographic extent of the layer.
    pub fn extent(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.0.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                    geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                )
            })
    }
}

/// Read a feature's integer id from its `fid` property or its GeoJSON id.
fn feature_id(feature: &geojson::Feature) -> Option<i64> {
    if let Some(value) = feature.property("fid") {
        if let Some(fid) = value.as_i64() {
            return Some(fid);
        }
        if let Some(fid) = value.as_f64().filter(|v| v.fract() == 0.0) {
            return Some(fid as i64);
        }
        if let Some(fid) = value.as_str().and_then(|s| s.trim().parse().ok()) {
            return Some(fid);
        }
    }
    match &feature.id {
        Some(Id::Number(n)) => n.as_i64(),
        Some(Id::String(s)) => s.parse().ok(),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Road, Settlement};
    use geo::{line_string, point};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn projector() -> Projector {
        Projector::utm45n().unwrap()
    }

    fn settlement(p: &Projector, fid: i64, lon: f64, lat: f64) -> Feature<Settlement> {
        Feature::new(p, fid, point!(x: lon, y: lat).into(), Settlement::default()).unwrap()
    }

    #[test]
    fn test_get_and_require() {
        let p = projector();
        let layer = Layer::new("settlements", vec![settlement(&p, 7, 85.3, 27.7)]);
        assert_eq!(layer.len(), 1);
        assert!(layer.get(7).is_some());
        assert!(matches!(
            layer.require(8),
            Err(HazardError::NotFound(msg)) if msg.contains("FID 8")
        ));
    }

    #[test]
    fn test_duplicate_fid_keeps_first() {
        let p = projector();
        let layer = Layer::new(
            "settlements",
            vec![settlement(&p, 1, 85.3, 27.7), settlement(&p, 1, 85.4, 27.8)],
        );
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.get(1).unwrap().geometry.0, point!(x: 85.3, y: 27.7).into());
    }

    #[test]
    fn test_nearest_uses_exact_distance() {
        let p = projector();
        // A long diagonal road whose envelope covers the query point, and a
        // short road whose geometry is actually closer.
        let long = Feature::new(
            &p,
            1,
            line_string![(x: 85.0, y: 27.5), (x: 85.6, y: 27.9)].into(),
            Road::default(),
        )
        .unwrap();
        let short = Feature::new(
            &p,
            2,
            line_string![(x: 85.20, y: 27.69), (x: 85.21, y: 27.69)].into(),
            Road::default(),
        )
        .unwrap();
        let layer = Layer::new("roads", vec![long, short]);
        let query = p.point_to_metric(85.21, 27.70).unwrap();
        let (nearest, distance) = layer.nearest_to_point(&query).unwrap();
        assert_eq!(nearest.fid, 2);
        assert!(distance > 1000.0 && distance < 1200.0, "distance {distance}");
    }

    #[test]
    fn test_nearest_on_empty_layer() {
        let p = projector();
        let layer: Layer<Settlement> = Layer::empty("settlements");
        let query = p.point_to_metric(85.3, 27.7).unwrap();
        assert!(layer.nearest_to_point(&query).is_none());
    }

    #[test]
    fn test_from_file_skips_bad_features() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "type": "FeatureCollection",
                "features": [
                    {{"type": "Feature", "properties": {{"fid": 1, "vdc_name": "Thimi"}},
                      "geometry": {{"type": "Point", "coordinates": [85.38, 27.68]}}}},
                    {{"type": "Feature", "properties": {{"fid": 2}}, "geometry": null}},
                    {{"type": "Feature", "id": 3, "properties": {{}},
                      "geometry": {{"type": "Point", "coordinates": [85.31, 27.71]}}}},
                    {{"type": "Feature", "properties": {{"vdc_name": "no id"}},
                      "geometry": {{"type": "Point", "coordinates": [85.0, 27.0]}}}}
                ]
            }}"#
        )
        .unwrap();

        let layer: Layer<Settlement> = Layer::from_file("settlements", file.path(), &projector()).unwrap();
        assert_eq!(layer.len(), 2);
        assert_eq!(
            layer.get(1).unwrap().attributes.vdc_name.as_deref(),
            Some("Thimi")
        );
        assert!(layer.get(2).is_none());
        assert!(layer.get(3).is_some());
    }

    #[test]
    fn test_from_file_rejects_non_collection() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"type": "Point", "coordinates": [85.0, 27.0]}}"#).unwrap();
        let result: Result<Layer<Settlement>> = Layer::from_file("settlements", file.path(), &projector());
        assert!(matches!(result, Err(HazardError::InvalidLayer { .. })));
    }

    #[test]
    fn test_candidates_in_load_order() {
        let p = projector();
        let layer = Layer::new(
            "settlements",
            vec![
                settlement(&p, 3, 85.30, 27.70),
                settlement(&p, 1, 85.31, 27.70),
                settlement(&p, 2, 86.50, 27.70),
            ],
        );
        let a = p.point_to_metric(85.29, 27.69).unwrap().0;
        let b = p.point_to_metric(85.32, 27.71).unwrap().0;
        let rect = Rect::new(a.0, b.0);
        let fids: Vec<i64> = layer.candidates(&rect).iter().map(|f| f.fid).collect();
        assert_eq!(fids, vec![3, 1]);
    }

    #[test]
    fn test_extent() {
        let p = projector();
        let layer = Layer::new(
            "settlements",
            vec![settlement(&p, 1, 85.0, 27.0), settlement(&p, 2, 86.0, 28.0)],
        );
        let extent = layer.extent().unwrap();
        assert_eq!(extent.min().x, 85.0);
        assert_eq!(extent.max().y, 28.0);
    }
}
