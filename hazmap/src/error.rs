//! Error types for the hazmap library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving parameters or running an analysis.
///
/// Each variant corresponds to one HTTP status in the service layer, so
/// handlers never need to inspect message text.
#[derive(Error, Debug)]
pub enum HazardError {
    /// A request parameter is missing, malformed, or out of range.
    #[error("{0}")]
    Validation(String),

    /// A referenced feature does not exist in its layer.
    #[error("{0}")]
    NotFound(String),

    /// A geometry operation received empty or degenerate input.
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// An upstream data source could not be used.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The layer store is unavailable (timeouts, exhausted permits).
    #[error("Store error: {0}")]
    Store(String),

    /// IO error when reading layer files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A layer file could not be parsed.
    #[error("Invalid layer file {path}: {message}")]
    InvalidLayer { path: PathBuf, message: String },

    /// A coordinate reference system could not be built or applied.
    #[error("Projection error: {0}")]
    Projection(String),
}

impl HazardError {
    /// Shorthand for a [`HazardError::Validation`] error.
    pub fn validation(message: impl Into<String>) -> Self {
        HazardError::Validation(message.into())
    }

    /// Shorthand for a [`HazardError::Geometry`] error.
    pub fn geometry(message: impl Into<String>) -> Self {
        HazardError::Geometry(message.into())
    }

    /// A [`HazardError::NotFound`] error for a feature id of a layer.
    pub fn not_found(layer: &str, fid: i64) -> Self {
        HazardError::NotFound(format!("{layer} with FID {fid} not found or has no geometry."))
    }
}

/// Result type alias using [`HazardError`].
pub type Result<T> = std::result::Result<T, HazardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HazardError::validation("buffer_distance_meters must be positive");
        assert_eq!(err.to_string(), "buffer_distance_meters must be positive");

        let err = HazardError::not_found("Road", 42);
        assert_eq!(
            err.to_string(),
            "Road with FID 42 not found or has no geometry."
        );

        let err = HazardError::InvalidLayer {
            path: PathBuf::from("rivers.geojson"),
            message: "not a FeatureCollection".to_string(),
        };
        assert!(err.to_string().contains("rivers.geojson"));
    }
}
