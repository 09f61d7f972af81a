//! Single orthophoto tile representation.

use crate::{Color, TileError, TileIndex, Result};
use image::RgbaImage;
use orto_geo::{GridCoord, GridRegion};
use orto_metrics::{metric_defs, metrics};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Pixels per meter of the downloaded source tiles (0.25 m ground resolution).
pub const SOURCE_PIXELS_PER_METER: u32 = 4;

/// How strictly a decoded tile's dimensions are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeCheck {
    /// The image must be exactly [`SOURCE_PIXELS_PER_METER`] pixels per
    /// meter of its region (4000 × 4000 for a 1000 m block).
    #[default]
    FixedScale,
    /// Any size is accepted and scaled onto the region.
    Any,
}

/// A grid-aligned source tile: a region bound to an image file.
///
/// Pixel data is not held here. [`Tile::decode`] reads the file every time it
/// is called and has no side effects, so a tile can be decoded, freed and
/// decoded again any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    region: GridRegion,
    path: PathBuf,
}

impl Tile {
    /// Bind a region to a file path.
    pub fn new(region: GridRegion, path: impl Into<PathBuf>) -> Self {
        Self {
            region,
            path: path.into(),
        }
    }

    /// Create a tile whose region is parsed from the file name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| TileError::MalformedTileName(path.display().to_string()))?;
        let region = TileIndex::parse_file_name(name)?;
        Ok(Self::new(region, path))
    }

    /// Region covered by the tile.
    pub fn region(&self) -> GridRegion {
        self.region
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Expected `(width, height)` at the fixed source scale.
    pub fn expected_size(&self) -> (u32, u32) {
        (
            self.region.width_m() as u32 * SOURCE_PIXELS_PER_METER,
            self.region.height_m() as u32 * SOURCE_PIXELS_PER_METER,
        )
    }

    /// Decode the backing image into an RGBA buffer.
    pub fn decode(&self, check: SizeCheck) -> Result<RgbaImage> {
        tracing::debug!(tile = %self.path.display(), "Loading image");
        let start = Instant::now();

        let image = image::open(&self.path)
            .map_err(|source| TileError::Decode {
                path: self.path.clone(),
                source,
            })?
            .to_rgba8();

        if check == SizeCheck::FixedScale {
            let (expected_width, expected_height) = self.expected_size();
            if image.width() != expected_width || image.height() != expected_height {
                return Err(TileError::UnexpectedSize {
                    path: self.path.clone(),
                    width: image.width(),
                    height: image.height(),
                    expected_width,
                    expected_height,
                });
            }
        }

        metrics::counter!(metric_defs::TILES_DECODED.name).increment(1);
        metrics::histogram!(metric_defs::TILE_DECODE_TIME.name)
            .record(start.elapsed().as_micros() as f64);

        Ok(image)
    }

    /// Read the color at a grid coordinate from this tile's decoded buffer.
    ///
    /// The coordinate must lie inside the region. A fully transparent pixel
    /// means the source image was truncated and is reported as
    /// [`TileError::CorruptTile`].
    pub fn pixel(&self, buffer: &RgbaImage, coord: GridCoord) -> Result<Color> {
        let (x, y) = self.region.pixel_at(coord, buffer.width(), buffer.height());
        let pixel = *buffer.get_pixel(x, y);
        if pixel.0[3] == 0 {
            return Err(TileError::CorruptTile {
                path: self.path.clone(),
                x,
                y,
            });
        }
        Ok(pixel.into())
    }
}
