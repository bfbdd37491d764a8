//! The spatial data store: every layer, loaded once and shared read-only.
//!
//! # Example
//!
//! ```ignore
//! use hazmap::SpatialStoreBuilder;
//!
//! let store = SpatialStoreBuilder::new("/data/nepal").build()?;
//! println!("{} rivers", store.rivers.len());
//! ```

use std::path::{Path, PathBuf};

use geo::{point, Geometry};

use crate::error::{HazardError, Result};
use crate::layer::{Feature, Layer};
use crate::projection::{Projector, UTM_45N};
use crate::records::{
    Boundary, District, FireDetection, IndexSheet, LocalUnit, Province, Record, River, Road,
    Settlement, Shelter,
};

/// Every GIS layer the analyses run over.
#[derive(Debug)]
pub struct SpatialStore {
    data_dir: PathBuf,
    projector: Projector,
    pub local_units: Layer<LocalUnit>,
    pub districts: Layer<District>,
    pub provinces: Layer<Province>,
    pub boundary: Layer<Boundary>,
    pub index_sheet: Layer<IndexSheet>,
    pub rivers: Layer<River>,
    pub roads: Layer<Road>,
    pub settlements: Layer<Settlement>,
    pub fire1: Layer<FireDetection>,
    pub fire2: Layer<FireDetection>,
    pub shelters: Layer<Shelter>,
}

/// Name and feature count of one layer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub feature_count: usize,
}

/// Layer names, in the order [`SpatialStore::summaries`] reports them.
pub const LAYER_NAMES: [&str; 11] = [
    "local_units",
    "districts",
    "provinces",
    "boundary",
    "index_sheet",
    "rivers",
    "roads",
    "settlements",
    "fire1",
    "fire2",
    "shelters",
];

impl SpatialStore {
    /// Create a new builder for a data directory.
    pub fn builder<P: AsRef<Path>>(data_dir: P) -> SpatialStoreBuilder {
        SpatialStoreBuilder::new(data_dir)
    }

    /// A store with every layer empty, for assembling layers in code.
    pub fn in_memory(projector: Projector) -> Self {
        Self {
            data_dir: PathBuf::new(),
            projector,
            local_units: Layer::empty("local_units"),
            districts: Layer::empty("districts"),
            provinces: Layer::empty("provinces"),
            boundary: Layer::empty("boundary"),
            index_sheet: Layer::empty("index_sheet"),
            rivers: Layer::empty("rivers"),
            roads: Layer::empty("roads"),
            settlements: Layer::empty("settlements"),
            fire1: Layer::empty("fire1"),
            fire2: Layer::empty("fire2"),
            shelters: Layer::empty("shelters"),
        }
    }

    /// The projector between lon/lat and the metric CRS.
    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Directory the layers were loaded from.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Both fire detection layers, fire1 first.
    pub fn fires(&self) -> impl Iterator<Item = &Feature<FireDetection>> {
        self.fire1.iter().chain(self.fire2.iter())
    }

    /// Feature counts for every layer.
    pub fn summaries(&self) -> Vec<LayerSummary> {
        let counts = [
            self.local_units.len(),
            self.districts.len(),
            self.provinces.len(),
            self.boundary.len(),
            self.index_sheet.len(),
            self.rivers.len(),
            self.roads.len(),
            self.settlements.len(),
            self.fire1.len(),
            self.fire2.len(),
            self.shelters.len(),
        ];
        LAYER_NAMES
            .iter()
            .zip(counts)
            .map(|(name, feature_count)| LayerSummary {
                name: name.to_string(),
                feature_count,
            })
            .collect()
    }

    /// Render a whole layer as a GeoJSON FeatureCollection.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::Validation`] for an unknown layer name.
    pub fn layer_collection(&self, name: &str) -> Result<geojson::FeatureCollection> {
        use crate::geojson::layer_collection as fc;
        Ok(match name {
            "local_units" => fc(&self.local_units),
            "districts" => fc(&self.districts),
            "provinces" => fc(&self.provinces),
            "boundary" => fc(&self.boundary),
            "index_sheet" => fc(&self.index_sheet),
            "rivers" => fc(&self.rivers),
            "roads" => fc(&self.roads),
            "settlements" => fc(&self.settlements),
            "fire1" => fc(&self.fire1),
            "fire2" => fc(&self.fire2),
            "shelters" => fc(&self.shelters),
            other => {
                return Err(HazardError::validation(format!(
                    "Unknown layer '{other}'. Expected one of: {}",
                    LAYER_NAMES.join(", ")
                )))
            }
        })
    }
}

/// Builder for [`SpatialStore`].
#[derive(Debug, Clone)]
pub struct SpatialStoreBuilder {
    data_dir: PathBuf,
    metric_proj: String,
}

impl SpatialStoreBuilder {
    /// Create a builder reading layers from `data_dir`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            metric_proj: UTM_45N.to_string(),
        }
    }

    /// Create a builder from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `HAZMAP_DATA_DIR` | Directory of `<layer>.geojson` files | Required |
    /// | `HAZMAP_METRIC_PROJ` | PROJ.4 string of the metric CRS | UTM zone 45N |
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::Validation`] if `HAZMAP_DATA_DIR` is not set.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("HAZMAP_DATA_DIR").map_err(|_| {
            HazardError::validation("HAZMAP_DATA_DIR environment variable not set")
        })?;
        Ok(Self::new(data_dir).metric_proj_from(|key| std::env::var(key).ok()))
    }

    /// Like [`from_env`](Self::from_env), but reads layers from `default_dir`
    /// when `HAZMAP_DATA_DIR` is unset. `HAZMAP_METRIC_PROJ` is applied either way.
    pub fn from_env_or<P: AsRef<Path>>(default_dir: P) -> Self {
        Self::from_lookup(default_dir, |key| std::env::var(key).ok())
    }

    fn from_lookup<P: AsRef<Path>>(default_dir: P, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let builder = match lookup("HAZMAP_DATA_DIR") {
            Some(dir) if !dir.trim().is_empty() => Self::new(dir),
            _ => {
                tracing::warn!(
                    data_dir = %default_dir.as_ref().display(),
                    "HAZMAP_DATA_DIR not set, using default data directory"
                );
                Self::new(default_dir)
            }
        };
        builder.metric_proj_from(lookup)
    }

    fn metric_proj_from(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup("HAZMAP_METRIC_PROJ") {
            Some(proj) if !proj.trim().is_empty() => self.metric_proj(proj),
            _ => self,
        }
    }

    /// Set the data directory.
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the PROJ.4 definition of the metric CRS.
    pub fn metric_proj(mut self, definition: impl Into<String>) -> Self {
        self.metric_proj = definition.into();
        self
    }

    /// Load every layer.
    ///
    /// Missing layer files load as empty layers. A missing `shelters.geojson`
    /// is replaced by the default shelter set.
    ///
    /// # Errors
    ///
    /// Fails if the data directory doesn't exist, the projection is invalid,
    /// or a present layer file can't be parsed.
    pub fn build(self) -> Result<SpatialStore> {
        if !self.data_dir.is_dir() {
            return Err(HazardError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("data directory {} does not exist", self.data_dir.display()),
            )));
        }
        let projector = Projector::new(&self.metric_proj)?;
        let dir = &self.data_dir;

        let shelters = if dir.join("shelters.geojson").is_file() {
            load(dir, "shelters", &projector)?
        } else {
            tracing::info!("No shelters layer found, using default shelters");
            default_shelters(&projector)?
        };

        let store = SpatialStore {
            local_units: load(dir, "local_units", &projector)?,
            districts: load(dir, "districts", &projector)?,
            provinces: load(dir, "provinces", &projector)?,
            boundary: load(dir, "boundary", &projector)?,
            index_sheet: load(dir, "index_sheet", &projector)?,
            rivers: load(dir, "rivers", &projector)?,
            roads: load(dir, "roads", &projector)?,
            settlements: load(dir, "settlements", &projector)?,
            fire1: load(dir, "fire1", &projector)?,
            fire2: load(dir, "fire2", &projector)?,
            shelters,
            data_dir: self.data_dir.clone(),
            projector,
        };

        for summary in store.summaries() {
            tracing::info!(layer = %summary.name, features = summary.feature_count, "Layer loaded");
        }
        Ok(store)
    }
}

fn load<A: Record>(dir: &Path, name: &str, projector: &Projector) -> Result<Layer<A>> {
    let path = dir.join(format!("{name}.geojson"));
    if !path.is_file() {
        tracing::warn!(layer = name, path = %path.display(), "Layer file missing, using empty layer");
        return Ok(Layer::empty(name));
    }
    Layer::from_file(name, &path, projector)
}

/// The five shelters seeded when no shelter layer is provided.
pub fn default_shelters(projector: &Projector) -> Result<Layer<Shelter>> {
    let seeds = [
        ("Kathmandu Hospital", 500, "hospital", 85.3197, 27.7000),
        ("Pokhara Community Hall", 300, "community_hall", 83.9856, 28.2096),
        ("Biratnagar School", 200, "school", 87.28, 26.45),
        ("Hetauda District HQ", 100, "district_hq", 85.03, 27.43),
        ("Chitwan Police Station", 50, "police_station", 84.49, 27.68),
    ];
    let features = seeds
        .into_iter()
        .enumerate()
        .map(|(i, (name, capacity, kind, lon, lat))| {
            Feature::new(
                projector,
                i as i64 + 1,
                Geometry::Point(point!(x: lon, y: lat)),
                Shelter {
                    name: Some(name.to_string()),
                    capacity: Some(capacity),
                    shelter_type: Some(kind.to_string()),
                },
            )
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Layer::new("shelters", features))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SETTLEMENTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"fid": 1, "vdc_name": "Bhaktapur"},
             "geometry": {"type": "Point", "coordinates": [85.43, 27.67]}}
        ]
    }"#;

    #[test]
    fn test_build_with_missing_layers() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("settlements.geojson"), SETTLEMENTS).unwrap();

        let store = SpatialStoreBuilder::new(dir.path()).build().unwrap();
        assert_eq!(store.settlements.len(), 1);
        assert!(store.rivers.is_empty());
        assert_eq!(store.shelters.len(), 5);
        assert_eq!(store.data_dir(), dir.path());
    }

    #[test]
    fn test_default_dir_keeps_metric_projection() {
        let proj = "+proj=utm +zone=44 +datum=WGS84 +units=m +no_defs";
        let builder = SpatialStoreBuilder::from_lookup(".", |key| {
            (key == "HAZMAP_METRIC_PROJ").then(|| proj.to_string())
        });
        assert_eq!(builder.data_dir, PathBuf::from("."));
        assert_eq!(builder.metric_proj, proj);
    }

    #[test]
    fn test_env_data_dir_without_projection() {
        let builder = SpatialStoreBuilder::from_lookup(".", |key| {
            (key == "HAZMAP_DATA_DIR").then(|| "/srv/layers".to_string())
        });
        assert_eq!(builder.data_dir, PathBuf::from("/srv/layers"));
        assert_eq!(builder.metric_proj, UTM_45N);
    }

    #[test]
    fn test_build_missing_dir() {
        let result = SpatialStoreBuilder::new("/nonexistent/hazmap/data").build();
        assert!(matches!(result, Err(HazardError::Io(_))));
    }

    #[test]
    fn test_build_invalid_layer_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("rivers.geojson"), "not json").unwrap();
        let result = SpatialStoreBuilder::new(dir.path()).build();
        assert!(matches!(result, Err(HazardError::InvalidLayer { .. })));
    }

    #[test]
    fn test_summaries_and_collections() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("settlements.geojson"), SETTLEMENTS).unwrap();
        let store = SpatialStoreBuilder::new(dir.path()).build().unwrap();

        let summaries = store.summaries();
        assert_eq!(summaries.len(), LAYER_NAMES.len());
        let settlements = summaries.iter().find(|s| s.name == "settlements").unwrap();
        assert_eq!(settlements.feature_count, 1);

        let fc = store.layer_collection("settlements").unwrap();
        assert_eq!(fc.features.len(), 1);
        assert!(matches!(
            store.layer_collection("volcanoes"),
            Err(HazardError::Validation(_))
        ));
    }

    #[test]
    fn test_default_shelter_types() {
        let projector = Projector::utm45n().unwrap();
        let shelters = default_shelters(&projector).unwrap();
        let hq: Vec<_> = shelters
            .iter()
            .filter(|s| s.attributes.shelter_type.as_deref() == Some("district_hq"))
            .collect();
        assert_eq!(hq.len(), 1);
        assert_eq!(hq[0].attributes.capacity, Some(100));
    }

    #[test]
    fn test_from_env_missing_data_dir() {
        // Save and clear the env var
        let original = std::env::var("HAZMAP_DATA_DIR").ok();
        std::env::remove_var("HAZMAP_DATA_DIR");

        let result = SpatialStoreBuilder::from_env();
        assert!(matches!(result, Err(HazardError::Validation(_))));

        if let Some(val) = original {
            std::env::set_var("HAZMAP_DATA_DIR", val);
        }
    }
}
