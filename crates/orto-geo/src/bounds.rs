//! Geodetic bounding boxes and the chart raster frame.

use crate::{GeoError, GeodeticCoord, Result};
use serde::{Deserialize, Serialize};

/// Meters per degree of latitude used for chart layout.
pub const METERS_PER_LATITUDE_DEGREE: f64 = 111_330.0;

/// A geodetic bounding box in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// North edge (maximum latitude).
    pub north: f64,
    /// West edge (minimum longitude).
    pub west: f64,
    /// South edge (minimum latitude).
    pub south: f64,
    /// East edge (maximum longitude).
    pub east: f64,
}

impl GeoBounds {
    /// Create a bounding box, validating edge order.
    pub fn new(north: f64, west: f64, south: f64, east: f64) -> Result<Self> {
        if !(north > south && east > west) {
            return Err(GeoError::InvalidBounds {
                north,
                south,
                east,
                west,
            });
        }
        Ok(Self {
            north,
            west,
            south,
            east,
        })
    }

    /// Build a box from two arbitrary opposite corners.
    pub fn from_corners(a: GeodeticCoord, b: GeodeticCoord) -> Result<Self> {
        Self::new(a.lat.max(b.lat), a.lon.min(b.lon), a.lat.min(b.lat), a.lon.max(b.lon))
    }

    /// Expand the box outward so every edge is a multiple of the part size.
    pub fn aligned(&self, part_lat: f64, part_lon: f64) -> Result<Self> {
        Self::new(
            (self.north / part_lat).ceil() * part_lat,
            (self.west / part_lon).floor() * part_lon,
            (self.south / part_lat).floor() * part_lat,
            (self.east / part_lon).ceil() * part_lon,
        )
    }

    /// Split the box into `part_lat` × `part_lon` parts, rows north to south
    /// and within a row west to east.
    pub fn parts(&self, part_lat: f64, part_lon: f64) -> Vec<GeoBounds> {
        let rows = ((self.north - self.south) / part_lat - 1e-9).ceil().max(0.0) as usize;
        let cols = ((self.east - self.west) / part_lon - 1e-9).ceil().max(0.0) as usize;

        let mut parts = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            let north = self.north - row as f64 * part_lat;
            for col in 0..cols {
                let west = self.west + col as f64 * part_lon;
                parts.push(GeoBounds {
                    north,
                    west,
                    south: north - part_lat,
                    east: west + part_lon,
                });
            }
        }
        parts
    }

    /// North-west corner.
    pub fn north_west(&self) -> GeodeticCoord {
        GeodeticCoord::new(self.north, self.west)
    }

    /// South-east corner.
    pub fn south_east(&self) -> GeodeticCoord {
        GeodeticCoord::new(self.south, self.east)
    }
}

/// Layout of an output chart raster over a geodetic bounding box.
///
/// Uses a flat-earth approximation: latitude maps linearly to rows with a
/// fixed number of meters per degree, and longitude to columns scaled by
/// `cos(latitude)` evaluated at the south edge. This is only valid for the
/// small parts (a few kilometers) the charts are built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterFrame {
    bounds: GeoBounds,
    width: u32,
    height: u32,
}

impl RasterFrame {
    /// Compute the frame for a bounding box at the given resolution.
    pub fn new(bounds: GeoBounds, pixels_per_meter: f64) -> Self {
        let d_lat = bounds.north - bounds.south;
        let d_lon = bounds.east - bounds.west;

        let lat_length = d_lat * METERS_PER_LATITUDE_DEGREE;
        let lon_factor = bounds.south.to_radians().cos();
        let lon_length = d_lon * lon_factor * METERS_PER_LATITUDE_DEGREE;

        Self {
            bounds,
            width: (lon_length * pixels_per_meter).max(0.0) as u32,
            height: (lat_length * pixels_per_meter).max(0.0) as u32,
        }
    }

    /// The box this frame covers.
    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// True when the box is too narrow to produce a single pixel.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Degrees of latitude per pixel row.
    pub fn lat_per_pixel(&self) -> f64 {
        (self.bounds.north - self.bounds.south) / self.height as f64
    }

    /// Degrees of longitude per pixel column.
    pub fn lon_per_pixel(&self) -> f64 {
        (self.bounds.east - self.bounds.west) / self.width as f64
    }

    /// Geodetic position of the top-left corner of pixel `(x, y)`.
    pub fn pixel_to_geodetic(&self, x: u32, y: u32) -> GeodeticCoord {
        GeodeticCoord::new(
            self.bounds.north - self.lat_per_pixel() * y as f64,
            self.bounds.west + self.lon_per_pixel() * x as f64,
        )
    }

    /// The four corner coordinates in converter order:
    /// north-west, north-east, south-east, south-west.
    pub fn corners(&self) -> [GeodeticCoord; 4] {
        let b = self.bounds;
        [
            GeodeticCoord::new(b.north, b.west),
            GeodeticCoord::new(b.north, b.east),
            GeodeticCoord::new(b.south, b.east),
            GeodeticCoord::new(b.south, b.west),
        ]
    }
}

/// Calculate the distance between two points using the haversine formula.
///
/// Returns the distance in meters.
pub fn haversine_distance(a: GeodeticCoord, b: GeodeticCoord) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bounds_validation() {
        assert!(GeoBounds::new(60.0, 17.0, 61.0, 18.0).is_err());
        assert!(GeoBounds::new(61.0, 18.0, 60.0, 17.0).is_err());
        assert!(GeoBounds::new(61.0, 17.0, 60.0, 18.0).is_ok());
    }

    #[test]
    fn test_from_corners_orders_edges() {
        let b = GeoBounds::from_corners(
            GeodeticCoord::new(60.51, 17.79),
            GeodeticCoord::new(60.65, 17.57),
        )
        .expect("valid");
        assert_eq!(b.north, 60.65);
        assert_eq!(b.south, 60.51);
        assert_eq!(b.west, 17.57);
        assert_eq!(b.east, 17.79);
    }

    #[test]
    fn test_aligned_and_parts() {
        let b = GeoBounds::new(60.65, 17.57, 60.51, 17.79).expect("valid");
        let aligned = b.aligned(0.02, 0.04).expect("valid");

        assert_abs_diff_eq!(aligned.north, 60.66, epsilon = 1e-9);
        assert_abs_diff_eq!(aligned.south, 60.50, epsilon = 1e-9);
        assert_abs_diff_eq!(aligned.west, 17.56, epsilon = 1e-9);
        assert_abs_diff_eq!(aligned.east, 17.80, epsilon = 1e-9);

        let parts = aligned.parts(0.02, 0.04);
        assert_eq!(parts.len(), 8 * 6);
        assert_abs_diff_eq!(parts[0].north, 60.66, epsilon = 1e-9);
        assert_abs_diff_eq!(parts[0].west, 17.56, epsilon = 1e-9);
        assert_abs_diff_eq!(parts[1].west, 17.60, epsilon = 1e-9);
    }

    #[test]
    fn test_raster_frame_dimensions() {
        let b = GeoBounds::new(60.02, 17.0, 60.0, 17.04).expect("valid");
        let frame = RasterFrame::new(b, 1.0);

        // 0.02° latitude ≈ 2226.6 m
        assert_eq!(frame.height(), 2226);
        // 0.04° longitude at 60°N ≈ 0.04 * 0.5 * 111330 = 2226.6 m
        assert_eq!(frame.width(), 2226);

        let origin = frame.pixel_to_geodetic(0, 0);
        assert_eq!(origin, GeodeticCoord::new(60.02, 17.0));
    }

    #[test]
    fn test_raster_frame_too_narrow() {
        let b = GeoBounds::new(60.000_001, 17.0, 60.0, 17.04).expect("valid");
        assert!(RasterFrame::new(b, 0.5).is_empty());
    }

    #[test]
    fn test_haversine_distance() {
        // Stockholm to Uppsala is approximately 64 km
        let d = haversine_distance(
            GeodeticCoord::new(59.3293, 18.0686),
            GeodeticCoord::new(59.8586, 17.6389),
        );
        assert!((d - 64_000.0).abs() < 3_000.0, "d = {}", d);
    }
}
