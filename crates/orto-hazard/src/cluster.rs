//! Merging of nearby hazard points.
//!
//! Points are bucketed into a uniform grid of `distance`-meter cells in
//! SWEREF 99 TM and every bucket collapses to one point. This is an
//! approximation: two points closer than `distance` that straddle a cell
//! boundary stay separate.

use crate::{HazardError, HazardPoint, Result};
use orto_geo::{GeodeticCoord, GridCoord};
use std::collections::BTreeMap;

/// Default merge distance in meters.
pub const DEFAULT_COMBINE_DISTANCE_M: f64 = 20.0;

/// Grid-bucket clusterer for hazard points.
#[derive(Debug, Clone, Copy)]
pub struct PointClusterer {
    distance: f64,
}

impl Default for PointClusterer {
    fn default() -> Self {
        Self {
            distance: DEFAULT_COMBINE_DISTANCE_M,
        }
    }
}

impl PointClusterer {
    /// Create a clusterer with a cell size in meters.
    pub fn new(distance: f64) -> Result<Self> {
        if !distance.is_finite() || distance <= 0.0 {
            return Err(HazardError::InvalidDistance(distance));
        }
        Ok(Self { distance })
    }

    /// Cell size in meters.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Bucket key of a grid position: `(floor(east / d), floor(north / d))`.
    pub fn cell_key(&self, grid: GridCoord) -> (i64, i64) {
        (
            (grid.east / self.distance).floor() as i64,
            (grid.north / self.distance).floor() as i64,
        )
    }

    /// Merge points sharing a cell.
    ///
    /// A merged point sits at the mean grid and geodetic position of its
    /// members and carries their maximum severity. Its pixel position is that
    /// of the first member with that severity. A cell with a single member
    /// returns that member unchanged. Output is ordered by cell key.
    pub fn combine(&self, points: &[HazardPoint]) -> Vec<HazardPoint> {
        let mut cells: BTreeMap<(i64, i64), Vec<&HazardPoint>> = BTreeMap::new();
        for point in points {
            cells.entry(self.cell_key(point.grid)).or_default().push(point);
        }

        let combined: Vec<HazardPoint> = cells.into_values().map(merge).collect();
        tracing::debug!(
            input = points.len(),
            output = combined.len(),
            distance = self.distance,
            "Combined hazard points"
        );
        combined
    }
}

fn merge(members: Vec<&HazardPoint>) -> HazardPoint {
    if let [single] = members.as_slice() {
        return **single;
    }

    let n = members.len() as f64;
    let mean = |f: fn(&HazardPoint) -> f64| members.iter().map(|p| f(p)).sum::<f64>() / n;

    let grid = GridCoord::new(mean(|p| p.grid.north), mean(|p| p.grid.east));
    let position = GeodeticCoord::new(mean(|p| p.position.lat), mean(|p| p.position.lon));

    let mut worst = members[0];
    for &p in &members[1..] {
        if p.severity > worst.severity {
            worst = p;
        }
    }

    HazardPoint {
        grid,
        position,
        ..*worst
    }
}

/// Merge points with the given cell size, see [`PointClusterer::combine`].
pub fn combine(points: &[HazardPoint], distance: f64) -> Result<Vec<HazardPoint>> {
    Ok(PointClusterer::new(distance)?.combine(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;
    use approx::assert_abs_diff_eq;
    use orto_geo::sweref99tm;

    fn point(north: f64, east: f64, severity: Severity) -> HazardPoint {
        let grid = GridCoord::new(north, east);
        HazardPoint {
            pixel_x: 0,
            pixel_y: 0,
            grid,
            position: sweref99tm::grid_to_geodetic(grid).unwrap(),
            severity,
        }
    }

    #[test]
    fn test_invalid_distance() {
        assert!(PointClusterer::new(0.0).is_err());
        assert!(PointClusterer::new(-5.0).is_err());
        assert!(PointClusterer::new(f64::NAN).is_err());
        assert!(combine(&[], f64::INFINITY).is_err());
    }

    #[test]
    fn test_cell_key_floors() {
        let c = PointClusterer::new(20.0).unwrap();
        assert_eq!(c.cell_key(GridCoord::new(6_700_019.9, 500_000.0)), (25_000, 335_000));
        assert_eq!(c.cell_key(GridCoord::new(6_700_020.0, 499_999.9)), (24_999, 335_001));
    }

    #[test]
    fn test_merge_within_cell() {
        let points = [
            point(6_700_002.0, 500_002.0, Severity::Low),
            point(6_700_010.0, 500_012.0, Severity::High),
            point(6_700_018.0, 500_004.0, Severity::Low),
        ];
        let combined = combine(&points, 20.0).unwrap();

        assert_eq!(combined.len(), 1);
        let merged = combined[0];
        assert_abs_diff_eq!(merged.grid.north, 6_700_010.0, epsilon = 1e-6);
        assert_abs_diff_eq!(merged.grid.east, 500_006.0, epsilon = 1e-6);
        assert_eq!(merged.severity, Severity::High);

        let lat = points.iter().map(|p| p.position.lat).sum::<f64>() / 3.0;
        assert_abs_diff_eq!(merged.position.lat, lat, epsilon = 1e-12);
    }

    #[test]
    fn test_cell_boundary_is_not_merged() {
        // 0.2 m apart, but on either side of a cell edge.
        let points = [
            point(6_700_010.0, 500_019.9, Severity::Low),
            point(6_700_010.0, 500_020.1, Severity::Low),
        ];
        assert_eq!(combine(&points, 20.0).unwrap().len(), 2);
    }

    #[test]
    fn test_one_point_per_cell_is_unchanged() {
        let mut points = Vec::new();
        for i in 0..6 {
            for j in 0..4 {
                let severity = if (i + j) % 3 == 0 { Severity::High } else { Severity::Low };
                points.push(point(
                    6_700_000.0 + j as f64 * 50.0 + 7.0,
                    500_000.0 + i as f64 * 50.0 + 3.0,
                    severity,
                ));
            }
        }

        for distance in [20.0, 25.0, 50.0] {
            let combined = combine(&points, distance).unwrap();
            assert_eq!(combined.len(), points.len());
            for p in &points {
                assert!(combined.contains(p), "{:?} missing at d={}", p, distance);
            }
        }
    }

    #[test]
    fn test_merged_severity_is_maximum() {
        let mut state = 0x9e37_79b9u32;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        };

        let points: Vec<_> = (0..300)
            .map(|_| {
                let severity = if next() % 4 == 0 { Severity::High } else { Severity::Low };
                point(
                    6_700_000.0 + (next() % 2000) as f64 / 10.0,
                    500_000.0 + (next() % 2000) as f64 / 10.0,
                    severity,
                )
            })
            .collect();

        let clusterer = PointClusterer::new(20.0).unwrap();
        let combined = clusterer.combine(&points);
        assert!(combined.len() <= 100);

        for merged in &combined {
            let key = clusterer.cell_key(merged.grid);
            let expected = points
                .iter()
                .filter(|p| clusterer.cell_key(p.grid) == key)
                .map(|p| p.severity)
                .max()
                .unwrap();
            assert_eq!(merged.severity, expected);
        }
    }
}
