//! SWEREF 99 TM (EPSG:3006) Gauss-Krüger projection.
//!
//! Transverse Mercator on the GRS80 ellipsoid with central meridian 15°E,
//! scale factor 0.9996 and false easting 500 000 m. The series expansions
//! follow the Lantmäteriet "Gauss Conformal Projection" formulas, which are
//! accurate to well below a millimeter inside Sweden.

use crate::{GeoError, GeodeticCoord, GridCoord, Result};

/// GRS80 semi-major axis in meters.
const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
/// GRS80 flattening.
const FLATTENING: f64 = 1.0 / 298.257_222_101;
/// Central meridian in degrees.
pub const CENTRAL_MERIDIAN: f64 = 15.0;
/// Scale factor on the central meridian.
const SCALE: f64 = 0.9996;
/// False northing in meters.
const FALSE_NORTHING: f64 = 0.0;
/// False easting in meters.
pub const FALSE_EASTING: f64 = 500_000.0;

/// Derived ellipsoid constants shared by both directions.
struct Constants {
    e2: f64,
    n: f64,
    a_roof: f64,
}

impl Constants {
    fn new() -> Self {
        let e2 = FLATTENING * (2.0 - FLATTENING);
        let n = FLATTENING / (2.0 - FLATTENING);
        let a_roof = SEMI_MAJOR_AXIS / (1.0 + n) * (1.0 + n * n / 4.0 + n.powi(4) / 64.0);
        Self { e2, n, a_roof }
    }
}

/// Convert a geodetic coordinate to SWEREF 99 TM grid meters.
pub fn geodetic_to_grid(coord: GeodeticCoord) -> GridCoord {
    let Constants { e2, n, a_roof } = Constants::new();

    let a = e2;
    let b = (5.0 * e2 * e2 - e2.powi(3)) / 6.0;
    let c = (104.0 * e2.powi(3) - 45.0 * e2.powi(4)) / 120.0;
    let d = (1237.0 * e2.powi(4)) / 1260.0;

    let beta1 = n / 2.0 - 2.0 * n * n / 3.0 + 5.0 * n.powi(3) / 16.0 + 41.0 * n.powi(4) / 180.0;
    let beta2 = 13.0 * n * n / 48.0 - 3.0 * n.powi(3) / 5.0 + 557.0 * n.powi(4) / 1440.0;
    let beta3 = 61.0 * n.powi(3) / 240.0 - 103.0 * n.powi(4) / 140.0;
    let beta4 = 49561.0 * n.powi(4) / 161_280.0;

    let phi = coord.lat.to_radians();
    let lambda = coord.lon.to_radians();
    let lambda_zero = CENTRAL_MERIDIAN.to_radians();

    let sin_phi = phi.sin();
    let sin2 = sin_phi * sin_phi;
    let phi_star =
        phi - sin_phi * phi.cos() * (a + b * sin2 + c * sin2 * sin2 + d * sin2 * sin2 * sin2);
    let delta_lambda = lambda - lambda_zero;
    let xi_prim = (phi_star.tan() / delta_lambda.cos()).atan();
    let eta_prim = (phi_star.cos() * delta_lambda.sin()).atanh();

    let north = SCALE
        * a_roof
        * (xi_prim
            + beta1 * (2.0 * xi_prim).sin() * (2.0 * eta_prim).cosh()
            + beta2 * (4.0 * xi_prim).sin() * (4.0 * eta_prim).cosh()
            + beta3 * (6.0 * xi_prim).sin() * (6.0 * eta_prim).cosh()
            + beta4 * (8.0 * xi_prim).sin() * (8.0 * eta_prim).cosh())
        + FALSE_NORTHING;
    let east = SCALE
        * a_roof
        * (eta_prim
            + beta1 * (2.0 * xi_prim).cos() * (2.0 * eta_prim).sinh()
            + beta2 * (4.0 * xi_prim).cos() * (4.0 * eta_prim).sinh()
            + beta3 * (6.0 * xi_prim).cos() * (6.0 * eta_prim).sinh()
            + beta4 * (8.0 * xi_prim).cos() * (8.0 * eta_prim).sinh())
        + FALSE_EASTING;

    GridCoord { north, east }
}

/// Convert a SWEREF 99 TM grid coordinate to a geodetic coordinate.
///
/// Returns [`GeoError::OutsideProjection`] if the input is non-finite or so
/// far from the central meridian that the series breaks down.
pub fn grid_to_geodetic(coord: GridCoord) -> Result<GeodeticCoord> {
    let Constants { e2, n, a_roof } = Constants::new();

    let delta1 = n / 2.0 - 2.0 * n * n / 3.0 + 37.0 * n.powi(3) / 96.0 - n.powi(4) / 360.0;
    let delta2 = n * n / 48.0 + n.powi(3) / 15.0 - 437.0 * n.powi(4) / 1440.0;
    let delta3 = 17.0 * n.powi(3) / 480.0 - 37.0 * n.powi(4) / 840.0;
    let delta4 = 4397.0 * n.powi(4) / 161_280.0;

    let a_star = e2 + e2 * e2 + e2.powi(3) + e2.powi(4);
    let b_star = -(7.0 * e2 * e2 + 17.0 * e2.powi(3) + 30.0 * e2.powi(4)) / 6.0;
    let c_star = (224.0 * e2.powi(3) + 889.0 * e2.powi(4)) / 120.0;
    let d_star = -(4279.0 * e2.powi(4)) / 1260.0;

    let lambda_zero = CENTRAL_MERIDIAN.to_radians();
    let xi = (coord.north - FALSE_NORTHING) / (SCALE * a_roof);
    let eta = (coord.east - FALSE_EASTING) / (SCALE * a_roof);

    let xi_prim = xi
        - delta1 * (2.0 * xi).sin() * (2.0 * eta).cosh()
        - delta2 * (4.0 * xi).sin() * (4.0 * eta).cosh()
        - delta3 * (6.0 * xi).sin() * (6.0 * eta).cosh()
        - delta4 * (8.0 * xi).sin() * (8.0 * eta).cosh();
    let eta_prim = eta
        - delta1 * (2.0 * xi).cos() * (2.0 * eta).sinh()
        - delta2 * (4.0 * xi).cos() * (4.0 * eta).sinh()
        - delta3 * (6.0 * xi).cos() * (6.0 * eta).sinh()
        - delta4 * (8.0 * xi).cos() * (8.0 * eta).sinh();

    let phi_star = (xi_prim.sin() / eta_prim.cosh()).asin();
    let delta_lambda = (eta_prim.sinh() / xi_prim.cos()).atan();
    let lambda = lambda_zero + delta_lambda;

    let sin_phi = phi_star.sin();
    let sin2 = sin_phi * sin_phi;
    let phi = phi_star
        + sin_phi
            * phi_star.cos()
            * (a_star + b_star * sin2 + c_star * sin2 * sin2 + d_star * sin2 * sin2 * sin2);

    let lat = phi.to_degrees();
    let lon = lambda.to_degrees();
    if !lat.is_finite() || !lon.is_finite() {
        return Err(GeoError::OutsideProjection {
            north: coord.north,
            east: coord.east,
        });
    }

    Ok(GeodeticCoord { lat, lon })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_central_meridian_maps_to_false_easting() {
        let grid = geodetic_to_grid(GeodeticCoord::new(62.0, CENTRAL_MERIDIAN));
        assert_abs_diff_eq!(grid.east, FALSE_EASTING, epsilon = 1e-6);
        // Roughly 6.87 million meters north of the equator at 62°N
        assert!(grid.north > 6_870_000.0 && grid.north < 6_880_000.0);
    }

    #[test]
    fn test_round_trip_stockholm() {
        let original = GeodeticCoord::new(59.329_323, 18.068_581);
        let grid = geodetic_to_grid(original);
        let back = grid_to_geodetic(grid).expect("inside projection");

        assert_abs_diff_eq!(back.lat, original.lat, epsilon = 1e-9);
        assert_abs_diff_eq!(back.lon, original.lon, epsilon = 1e-9);
    }

    #[test]
    fn test_round_trip_grid_first() {
        let grid = GridCoord::new(6_719_691.0, 643_645.0);
        let geo = grid_to_geodetic(grid).expect("inside projection");
        let back = geodetic_to_grid(geo);

        assert_abs_diff_eq!(back.north, grid.north, epsilon = 1e-4);
        assert_abs_diff_eq!(back.east, grid.east, epsilon = 1e-4);
    }

    #[test]
    fn test_east_of_meridian_has_larger_easting() {
        let west = geodetic_to_grid(GeodeticCoord::new(60.5, 17.5));
        let east = geodetic_to_grid(GeodeticCoord::new(60.5, 17.8));
        assert!(east.east > west.east);

        // About 16.4 km per 0.3° of longitude at 60.5°N
        let dx = east.east - west.east;
        assert!(dx > 16_000.0 && dx < 16_800.0, "dx = {}", dx);
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let result = grid_to_geodetic(GridCoord::new(f64::NAN, 500_000.0));
        assert!(matches!(result, Err(GeoError::OutsideProjection { .. })));
    }
}
