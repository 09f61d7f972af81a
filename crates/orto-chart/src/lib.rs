//! # orto-chart
//!
//! Resampling of orthophoto tiles into Mercator chart rasters.
//!
//! A [`ChartRenderer`] lays an output raster over a geodetic bounding box
//! ([`orto_geo::RasterFrame`]), samples the source tiles for each pixel with
//! one of the [`PixelMode`]s, applies a [`ColorFilter`] and returns a
//! [`ChartRaster`] together with its corner coordinates. A [`ChartConverter`]
//! such as [`ImgKap`] then turns the raster into a georeferenced chart file.
//!
//! ## Example
//!
//! ```no_run
//! use orto_chart::{chart_file_name, ChartConverter, ChartRenderer, ChartRequest, ImgKap, RenderSettings};
//! use orto_geo::GeoBounds;
//! use orto_tiles::{CacheConfig, TileCache, TileIndex};
//! use std::path::Path;
//!
//! let cache = TileCache::from_index(TileIndex::scan("tiles")?, CacheConfig::default());
//! let renderer = ChartRenderer::new(cache, RenderSettings::default())?;
//!
//! let request = ChartRequest::new(GeoBounds::new(60.66, 17.56, 60.64, 17.60)?);
//! let raster = renderer.render(&request)?;
//! raster.write_png("part.png")?;
//!
//! let kap = chart_file_name("Example_1_Mean_Natural", &raster.bounds());
//! ImgKap::default().convert(Path::new("part.png"), &raster.bounds(), Path::new(&kap))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod converter;
mod error;
mod filter;
mod render;
mod sample;
mod settings;

pub use converter::{chart_file_name, format_degrees, ChartConverter, ImgKap, IMGKAP_PROGRAM};
pub use error::ChartError;
pub use filter::posterize;
pub use render::{partition, BlockProgress, ChartRaster, ChartRenderer, PixelRect, MAX_CHART_PIXELS};
pub use sample::{Lightest, PixelSampler, RmsMean, AREA_STEP_M};
pub use settings::{ChartOptions, ChartRequest, ColorFilter, PixelMode, RenderSettings};

/// Result type for chart operations.
pub type Result<T> = std::result::Result<T, ChartError>;
