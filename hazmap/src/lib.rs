//! # hazmap - Hazard Exposure Analysis
//!
//! Spatial analyses for disaster-risk work over a fixed set of GIS layers:
//! rivers, roads, settlements, administrative boundaries, fire detections and
//! shelters. Layers are GeoJSON files loaded once into memory and indexed with
//! an R-tree.
//!
//! ## Features
//!
//! - **Metric geometry**: every buffer, distance, length and area is computed
//!   in a projected CRS (UTM 45N by default), never in degrees
//! - **Hazard zones**: single, dissolved and tiered buffers
//! - **Exposure**: intersection, proximity, nearest-feature and overlap tests
//! - **GeoJSON out**: results serialize straight into response bodies
//!
//! ## Quick Start
//!
//! ```ignore
//! use hazmap::analysis::{flash_flood_warning, FlashFloodParams};
//! use hazmap::params::RainfallIntensity;
//! use hazmap::SpatialStoreBuilder;
//!
//! let store = SpatialStoreBuilder::new("/data/nepal").build()?;
//! let warning = flash_flood_warning(
//!     &store,
//!     &FlashFloodParams {
//!         rainfall_intensity: RainfallIntensity::High,
//!         buffer_distance_meters: 500.0,
//!     },
//! )?;
//! println!("{} settlements at risk", warning.affected_settlements.features.len());
//! ```
//!
//! ## Layer Files
//!
//! The store reads `<layer>.geojson` from its data directory, one
//! FeatureCollection per layer, coordinates in WGS84 lon/lat. Each feature
//! needs an integer `fid` property or feature `id`. Missing files load as empty
//! layers.

pub mod analysis;
pub mod classify;
pub mod error;
pub mod exposure;
pub mod geojson;
pub mod layer;
pub mod params;
pub mod projection;
pub mod records;
pub mod store;
pub mod zone;

// Re-export main types at crate root for convenience
pub use error::{HazardError, Result};
pub use layer::{Feature, Layer};
pub use params::QueryParams;
pub use projection::{Geographic, Projected, Projector, UTM_45N};
pub use store::{LayerSummary, SpatialStore, SpatialStoreBuilder, LAYER_NAMES};
pub use zone::HazardZone;
