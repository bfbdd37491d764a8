//! Coordinate reference systems.
//!
//! Layers are stored in geographic lon/lat (EPSG:4326) but every distance,
//! area and length is measured in a metric projection. The default metric
//! CRS is UTM zone 45N on WGS84 (EPSG:32645), which covers Nepal.
//!
//! [`Geographic`] and [`Projected`] tag a geometry with the CRS it lives in,
//! so metric formulas cannot be handed degree coordinates by accident.

use geo::{Coord, MapCoords};
use proj4rs::{proj::Proj, transform::transform};

use crate::error::{HazardError, Result};

/// PROJ.4 string for WGS84 lon/lat.
pub const WGS84: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// PROJ.4 string for UTM zone 45N (EPSG:32645).
pub const UTM_45N: &str = "+proj=utm +zone=45 +datum=WGS84 +units=m +no_defs +type=crs";

/// A geometry in geographic lon/lat degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Geographic<G>(pub G);

/// A geometry in the metric projection (meters).
#[derive(Debug, Clone, PartialEq)]
pub struct Projected<G>(pub G);

impl<G> Geographic<G> {
    /// Borrow the inner geometry.
    pub fn inner(&self) -> &G {
        &self.0
    }
}

impl<G> Projected<G> {
    /// Borrow the inner geometry.
    pub fn inner(&self) -> &G {
        &self.0
    }
}

/// Converts geometries between geographic and metric coordinates.
pub struct Projector {
    geographic: Proj,
    metric: Proj,
    metric_definition: String,
}

impl std::fmt::Debug for Projector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projector")
            .field("metric", &self.metric_definition)
            .finish()
    }
}

impl Projector {
    /// Create a projector for WGS84 lon/lat and the given metric CRS.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::Projection`] if the PROJ.4 string is not understood.
    pub fn new(metric_definition: &str) -> Result<Self> {
        let geographic = Proj::from_proj_string(WGS84)
            .map_err(|e| HazardError::Projection(format!("{WGS84}: {e}")))?;
        let metric = Proj::from_proj_string(metric_definition)
            .map_err(|e| HazardError::Projection(format!("{metric_definition}: {e}")))?;
        Ok(Self {
            geographic,
            metric,
            metric_definition: metric_definition.to_string(),
        })
    }

    /// Projector for UTM zone 45N.
    pub fn utm45n() -> Result<Self> {
        Self::new(UTM_45N)
    }

    /// The PROJ.4 definition of the metric CRS.
    pub fn metric_definition(&self) -> &str {
        &self.metric_definition
    }

    /// Project one lon/lat coordinate to meters.
    pub fn coord_to_metric(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
        transform(&self.geographic, &self.metric, &mut point)
            .map_err(|e| HazardError::Projection(e.to_string()))?;
        Ok(Coord {
            x: point.0,
            y: point.1,
        })
    }

    /// Unproject one metric coordinate back to lon/lat degrees.
    pub fn coord_to_geographic(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = (coord.x, coord.y, 0.0);
        transform(&self.metric, &self.geographic, &mut point)
            .map_err(|e| HazardError::Projection(e.to_string()))?;
        Ok(Coord {
            x: point.0.to_degrees(),
            y: point.1.to_degrees(),
        })
    }

    /// Project a geographic geometry into the metric CRS.
    pub fn to_metric<G>(&self, geometry: &Geographic<G>) -> Result<Projected<G>>
    where
        G: MapCoords<f64, f64, Output = G>,
    {
        geometry
            .0
            .try_map_coords(|c| self.coord_to_metric(c))
            .map(Projected)
    }

    /// Unproject a metric geometry back to lon/lat.
    pub fn to_geographic<G>(&self, geometry: &Projected<G>) -> Result<Geographic<G>>
    where
        G: MapCoords<f64, f64, Output = G>,
    {
        geometry
            .0
            .try_map_coords(|c| self.coord_to_geographic(c))
            .map(Geographic)
    }

    /// Project a lon/lat point.
    pub fn point_to_metric(&self, lon: f64, lat: f64) -> Result<Projected<geo::Point<f64>>> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(HazardError::validation(format!(
                "Invalid coordinates: lat={lat}, lon={lon}"
            )));
        }
        let c = self.coord_to_metric(Coord { x: lon, y: lat })?;
        Ok(Projected(geo::Point::from(c)))
    }
}
