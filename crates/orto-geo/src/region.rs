//! Grid-aligned rectangular regions in SWEREF 99 TM meters.

use crate::{sweref99tm, GeoBounds, GeoError, GeodeticCoord, GridCoord, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Edge length of a downloaded source tile in meters.
///
/// Regions are aligned to this block size so tiles fetched by different runs
/// have byte-identical names and can be reused.
pub const BLOCK_SIZE_M: i64 = 1000;

/// An integer-meter rectangle in the SWEREF 99 TM grid.
///
/// Containment is half-open so that a coordinate on an edge shared by two
/// neighbouring regions belongs to exactly one of them: a point is inside when
/// `north >= n > south` and `west <= e < east`. A point on a shared
/// horizontal edge therefore belongs to the region below it, and a point on a
/// shared vertical edge to the region to its right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRegion {
    north: i64,
    south: i64,
    east: i64,
    west: i64,
}

impl GridRegion {
    /// Create a region, validating that `north > south` and `east > west`.
    pub fn new(north: i64, south: i64, east: i64, west: i64) -> Result<Self> {
        if north <= south || east <= west {
            return Err(GeoError::InvalidRegion {
                north,
                south,
                east,
                west,
            });
        }
        Ok(Self {
            north,
            south,
            east,
            west,
        })
    }

    /// North edge in meters.
    pub fn north(&self) -> i64 {
        self.north
    }

    /// South edge in meters.
    pub fn south(&self) -> i64 {
        self.south
    }

    /// East edge in meters.
    pub fn east(&self) -> i64 {
        self.east
    }

    /// West edge in meters.
    pub fn west(&self) -> i64 {
        self.west
    }

    /// Height of the region in meters.
    pub fn height_m(&self) -> i64 {
        self.north - self.south
    }

    /// Width of the region in meters.
    pub fn width_m(&self) -> i64 {
        self.east - self.west
    }

    /// Half-open containment test (see the type documentation).
    pub fn contains(&self, coord: GridCoord) -> bool {
        self.north as f64 >= coord.north
            && (self.south as f64) < coord.north
            && self.west as f64 <= coord.east
            && (self.east as f64) > coord.east
    }

    /// True when the two regions share interior area. Regions that only touch
    /// along an edge do not intersect.
    pub fn intersects(&self, other: &GridRegion) -> bool {
        self.west < other.east
            && other.west < self.east
            && self.south < other.north
            && other.south < self.north
    }

    /// Smallest region enclosing the four projected corners of a geodetic box.
    ///
    /// The box is rotated and curved in the grid, so all four corners are
    /// projected and the extreme values rounded outward to whole meters.
    pub fn bounding(bounds: &GeoBounds) -> Result<Self> {
        let corners = [
            GeodeticCoord::new(bounds.north, bounds.west),
            GeodeticCoord::new(bounds.north, bounds.east),
            GeodeticCoord::new(bounds.south, bounds.west),
            GeodeticCoord::new(bounds.south, bounds.east),
        ]
        .map(sweref99tm::geodetic_to_grid);

        let north = corners.iter().map(|c| c.north).fold(f64::MIN, f64::max);
        let south = corners.iter().map(|c| c.north).fold(f64::MAX, f64::min);
        let east = corners.iter().map(|c| c.east).fold(f64::MIN, f64::max);
        let west = corners.iter().map(|c| c.east).fold(f64::MAX, f64::min);

        Self::new(
            north.ceil() as i64,
            south.floor() as i64,
            east.ceil() as i64,
            west.floor() as i64,
        )
    }

    /// Expand the region outward to multiples of `block` meters.
    pub fn aligned(&self, block: i64) -> Self {
        Self {
            north: div_ceil(self.north, block) * block,
            south: self.south.div_euclid(block) * block,
            east: div_ceil(self.east, block) * block,
            west: self.west.div_euclid(block) * block,
        }
    }

    /// Split an aligned region into `block`-sized sub-regions.
    ///
    /// Iterates columns west to east, and within each column rows north to
    /// south. Callers should align the region first; a partial block at the
    /// south or east edge is still emitted with a full block size.
    pub fn blocks(&self, block: i64) -> impl Iterator<Item = GridRegion> + '_ {
        let north = self.north;
        let south = self.south;
        (0..)
            .map(move |i| self.west + i * block)
            .take_while(move |west| *west < self.east)
            .flat_map(move |west| {
                (0..)
                    .map(move |j| north - j * block)
                    .take_while(move |n| *n > south)
                    .map(move |n| GridRegion {
                        north: n,
                        south: n - block,
                        east: west + block,
                        west,
                    })
            })
    }

    /// Map a grid coordinate inside this region to a pixel position of a
    /// raster of `width` × `height` pixels covering the region.
    ///
    /// The result is clamped into the raster so rounding at the far edges
    /// never produces an out-of-range index.
    pub fn pixel_at(&self, coord: GridCoord, width: u32, height: u32) -> (u32, u32) {
        let x_factor = width as f64 / self.width_m() as f64;
        let y_factor = height as f64 / self.height_m() as f64;

        let x = ((coord.east - self.west as f64) * x_factor) as i64;
        let y = ((self.north as f64 - coord.north) * y_factor) as i64;

        (
            x.clamp(0, width as i64 - 1) as u32,
            y.clamp(0, height as i64 - 1) as u32,
        )
    }
}

impl fmt::Display for GridRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N{} S{} E{} W{}",
            self.north, self.south, self.east, self.west
        )
    }
}

fn div_ceil(value: i64, block: i64) -> i64 {
    -((-value).div_euclid(block))
}
