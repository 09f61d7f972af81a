//! Per-tile classification raster.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Ordinal danger level of a hazard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Weak brightness anomaly.
    Low,
    /// Strong brightness anomaly or small emergent land.
    High,
}

impl Severity {
    /// Lowercase label, used for metrics and logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification tag of one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    /// Bright pixel, not yet checked for size.
    Land,
    /// Land component too large to be a rock.
    Landmass,
    /// Small bright blob in open water: bird or glare.
    Seagull,
    /// Strong submerged-object signal.
    DangerHigh,
    /// Weak submerged-object signal.
    DangerLow,
    /// Shallow area by hue, high confidence.
    DangerAreaHigh,
    /// Shallow area by hue, low confidence.
    DangerAreaLow,
}

impl Category {
    /// Severity of point hazards; `None` for every other category.
    pub const fn severity(&self) -> Option<Severity> {
        match self {
            Category::DangerHigh => Some(Severity::High),
            Category::DangerLow => Some(Severity::Low),
            _ => None,
        }
    }

    /// True for categories that produce hazard points.
    pub const fn is_hazard(&self) -> bool {
        self.severity().is_some()
    }

    /// True for both land categories.
    pub const fn is_land(&self) -> bool {
        matches!(self, Category::Land | Category::Landmass)
    }

    /// Lowercase label, used for metrics and logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::Land => "land",
            Category::Landmass => "landmass",
            Category::Seagull => "seagull",
            Category::DangerHigh => "danger_high",
            Category::DangerLow => "danger_low",
            Category::DangerAreaHigh => "danger_area_high",
            Category::DangerAreaLow => "danger_area_low",
        }
    }
}

/// A dense 2D buffer addressed by `(x, y)`, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster<T> {
    width: u32,
    height: u32,
    cells: Vec<T>,
}

/// Per-pixel classification of one tile; `None` means unclassified.
pub type ClassificationRaster = Raster<Option<Category>>;

impl<T: Clone> Raster<T> {
    /// Create a raster with every cell set to `value`.
    pub fn filled(width: u32, height: u32, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width as usize * height as usize],
        }
    }
}

impl<T: Clone + Default> Raster<T> {
    /// Create a raster with every cell set to `T::default()`.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, T::default())
    }
}

impl<T> Raster<T> {
    /// Width in cells.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if the raster has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row-major offset of `(x, y)`.
    #[inline]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// Iterate `((x, y), &cell)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = ((u32, u32), &T)> + '_ {
        let width = self.width as usize;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (((i % width) as u32, (i / width) as u32), cell))
    }
}

impl<T> Index<(u32, u32)> for Raster<T> {
    type Output = T;

    fn index(&self, (x, y): (u32, u32)) -> &T {
        &self.cells[self.offset(x, y)]
    }
}

impl<T> IndexMut<(u32, u32)> for Raster<T> {
    fn index_mut(&mut self, (x, y): (u32, u32)) -> &mut T {
        let offset = self.offset(x, y);
        &mut self.cells[offset]
    }
}
