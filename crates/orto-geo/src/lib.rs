//! # orto-geo
//!
//! Coordinate handling for orthophoto tiles and chart rasters.
//!
//! Three coordinate spaces are involved:
//! - **Geodetic** coordinates (latitude/longitude on GRS80, WGS84-compatible).
//! - **Grid** coordinates in SWEREF 99 TM (EPSG:3006), integer meters for tile
//!   addressing. `north` is the northing and `east` the easting.
//! - **Chart raster** space, a flat Mercator approximation used to lay out
//!   output chart pixels over a small geodetic bounding box.
//!
//! ## Example
//!
//! ```
//! use orto_geo::{GeodeticCoord, GridRegion, sweref99tm};
//!
//! let grid = sweref99tm::geodetic_to_grid(GeodeticCoord::new(59.33, 18.07));
//! let back = sweref99tm::grid_to_geodetic(grid)?;
//! assert!((back.lat - 59.33).abs() < 1e-8);
//!
//! let tile = GridRegion::new(
//!     grid.north.ceil() as i64,
//!     grid.north.floor() as i64 - 999,
//!     grid.east.ceil() as i64 + 999,
//!     grid.east.floor() as i64,
//! )?;
//! assert!(tile.contains(grid));
//! # Ok::<(), orto_geo::GeoError>(())
//! ```

mod bounds;
mod error;
mod region;
pub mod sweref99tm;

pub use bounds::{haversine_distance, GeoBounds, RasterFrame, METERS_PER_LATITUDE_DEGREE};
pub use error::GeoError;
pub use region::{GridRegion, BLOCK_SIZE_M};

use serde::{Deserialize, Serialize};

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// A latitude/longitude position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticCoord {
    /// Latitude in degrees (positive = north).
    pub lat: f64,
    /// Longitude in degrees (positive = east).
    pub lon: f64,
}

impl GeodeticCoord {
    /// Create a new geodetic coordinate.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A planar SWEREF 99 TM position in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCoord {
    /// Northing in meters.
    pub north: f64,
    /// Easting in meters.
    pub east: f64,
}

impl GridCoord {
    /// Create a new grid coordinate.
    pub const fn new(north: f64, east: f64) -> Self {
        Self { north, east }
    }
}
