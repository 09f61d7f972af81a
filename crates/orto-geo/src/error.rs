//! Error types for the geometry crate.

use thiserror::Error;

/// Errors that can occur when building regions or converting coordinates.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Region edges are not ordered (`north > south`, `east > west`).
    #[error("Invalid grid region: north={north} south={south} east={east} west={west}")]
    InvalidRegion {
        /// North edge in meters.
        north: i64,
        /// South edge in meters.
        south: i64,
        /// East edge in meters.
        east: i64,
        /// West edge in meters.
        west: i64,
    },

    /// Bounding box edges are not ordered.
    #[error("Invalid bounding box: north={north} south={south} east={east} west={west}")]
    InvalidBounds {
        /// North edge in degrees.
        north: f64,
        /// South edge in degrees.
        south: f64,
        /// East edge in degrees.
        east: f64,
        /// West edge in degrees.
        west: f64,
    },

    /// Projection produced a non-finite result.
    #[error("Coordinate ({north}, {east}) is outside the projection domain")]
    OutsideProjection {
        /// Northing in meters.
        north: f64,
        /// Easting in meters.
        east: f64,
    },
}
