//! Detected hazard points.

use crate::Severity;
use orto_geo::{GeodeticCoord, GridCoord};
use serde::{Deserialize, Serialize};

/// A hazard located in a source tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardPoint {
    /// Centroid column in the source tile.
    pub pixel_x: u32,
    /// Centroid row in the source tile.
    pub pixel_y: u32,
    /// Centroid in SWEREF 99 TM meters.
    pub grid: GridCoord,
    /// Centroid in latitude/longitude.
    pub position: GeodeticCoord,
    /// Worst severity in the component.
    pub severity: Severity,
}

/// A hazard component in tile pixel space, before it is georeferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelHazard {
    /// Centroid column.
    pub x: u32,
    /// Centroid row.
    pub y: u32,
    /// Component size in pixels.
    pub size: usize,
    /// Worst severity in the component.
    pub severity: Severity,
}
