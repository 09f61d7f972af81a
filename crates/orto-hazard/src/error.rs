//! Error types for hazard detection.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while detecting or exporting hazards.
#[derive(Debug, Error)]
pub enum HazardError {
    /// Reading or decoding the source tile failed.
    #[error("Tile error: {0}")]
    Tile(#[from] orto_tiles::TileError),

    /// A hazard centroid could not be converted to geodetic coordinates.
    ///
    /// All hazard output of the tile is dropped.
    #[error("Failed to project hazards of {tile}: {source}")]
    Projection {
        /// Tile whose hazards were dropped.
        tile: PathBuf,
        /// Underlying projection error.
        #[source]
        source: orto_geo::GeoError,
    },

    /// Writing the analysis overlay failed.
    #[error("Failed to write overlay {path}: {source}")]
    Overlay {
        /// Overlay file path.
        path: PathBuf,
        /// Underlying encoder error.
        #[source]
        source: image::ImageError,
    },

    /// I/O error writing output files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Detector thresholds are inconsistent.
    #[error("Invalid detector configuration: {0}")]
    InvalidConfig(String),

    /// Clustering distance is not a positive finite number.
    #[error("Invalid clustering distance: {0}")]
    InvalidDistance(f64),
}
