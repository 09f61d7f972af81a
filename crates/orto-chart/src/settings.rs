//! Chart request and renderer settings.

use crate::{ChartError, Result};
use orto_geo::GeoBounds;
use orto_tiles::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Color treatment applied to every sampled pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorFilter {
    /// Source colors, posterized above black.
    #[default]
    Natural,
    /// Red and green raised, blue lowered, to bring out shallow-water texture.
    Subsurface,
    /// [`ColorFilter::Subsurface`], with pixels whose boosted red stays below
    /// 50 painted black as safe water.
    Subsurface2,
}

/// How an output pixel is sampled from the source tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelMode {
    /// One lookup at the pixel's corner.
    Nearest,
    /// Root-mean-square of every source sample within half a pixel.
    #[default]
    Mean,
    /// The brightest source sample within half a pixel.
    Lightest,
}

macro_rules! named_enum {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $ty {
            /// All variants.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// Name as used in configuration files and chart folder names.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => stringify!($variant)),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ChartError;

            fn from_str(s: &str) -> Result<Self> {
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        ChartError::InvalidSettings(format!(
                            concat!("unknown ", stringify!($ty), " '{}'"),
                            s
                        ))
                    })
            }
        }
    };
}

named_enum!(ColorFilter { Natural, Subsurface, Subsurface2 });
named_enum!(PixelMode { Nearest, Mean, Lightest });

/// Resolution and color treatment of a chart, independent of its area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    /// Output pixels per meter.
    pub pixels_per_meter: f64,
    /// Color filter.
    pub filter: ColorFilter,
    /// Sampling mode.
    pub pixel_mode: PixelMode,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            pixels_per_meter: 1.0,
            filter: ColorFilter::Natural,
            pixel_mode: PixelMode::Mean,
        }
    }
}

impl ChartOptions {
    /// Check the resolution.
    pub fn validate(&self) -> Result<()> {
        if !self.pixels_per_meter.is_finite() || self.pixels_per_meter <= 0.0 {
            return Err(ChartError::InvalidSettings(format!(
                "pixels_per_meter must be positive, got {}",
                self.pixels_per_meter
            )));
        }
        Ok(())
    }

    /// Name of the folder that groups a job's charts: `<job>_<ppm>_<mode>_<filter>`.
    pub fn group_name(&self, job: &str) -> String {
        format!(
            "{}_{}_{}_{}",
            job, self.pixels_per_meter, self.pixel_mode, self.filter
        )
    }
}

/// One chart to render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    /// Geodetic area of the chart.
    pub bounds: GeoBounds,
    /// Resolution and color treatment.
    #[serde(flatten)]
    pub options: ChartOptions,
}

impl ChartRequest {
    /// Request a chart of `bounds` with default options.
    pub fn new(bounds: GeoBounds) -> Self {
        Self {
            bounds,
            options: ChartOptions::default(),
        }
    }

    /// Set the resolution.
    pub fn with_pixels_per_meter(mut self, pixels_per_meter: f64) -> Self {
        self.options.pixels_per_meter = pixels_per_meter;
        self
    }

    /// Set the color filter.
    pub fn with_filter(mut self, filter: ColorFilter) -> Self {
        self.options.filter = filter;
        self
    }

    /// Set the sampling mode.
    pub fn with_pixel_mode(mut self, pixel_mode: PixelMode) -> Self {
        self.options.pixel_mode = pixel_mode;
        self
    }
}

/// Renderer tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Edge length of one source tile in meters.
    pub tile_span_m: f64,
    /// Partition block edge, in source tiles. A block touches at most
    /// `(tiles_per_block + 1)²` tiles, which should fit the cache capacity.
    pub tiles_per_block: u32,
    /// Color written where no tile covers the pixel.
    pub no_data_color: Color,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            tile_span_m: orto_geo::BLOCK_SIZE_M as f64,
            tiles_per_block: 3,
            no_data_color: Color::new(0, 0, 0),
        }
    }
}

impl RenderSettings {
    /// Check that a partition block is at least one tile.
    pub fn validate(&self) -> Result<()> {
        if !self.tile_span_m.is_finite() || self.tile_span_m <= 0.0 {
            return Err(ChartError::InvalidSettings(format!(
                "tile_span_m must be positive, got {}",
                self.tile_span_m
            )));
        }
        if self.tiles_per_block == 0 {
            return Err(ChartError::InvalidSettings(
                "tiles_per_block must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of tiles a single partition block may touch.
    pub fn tiles_touched_per_block(&self) -> usize {
        let side = self.tiles_per_block as usize + 1;
        side * side
    }

    /// Partition block edge in output pixels.
    pub fn block_side_px(&self, pixels_per_meter: f64) -> u32 {
        (self.tile_span_m * self.tiles_per_block as f64 * pixels_per_meter)
            .round()
            .clamp(1.0, u32::MAX as f64) as u32
    }
}
