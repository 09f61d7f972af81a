//! Partitioned, row-parallel chart rendering.

use crate::sample::PixelSampler;
use crate::{ChartError, ChartOptions, ChartRequest, RenderSettings, Result};
use image::{ImageFormat, RgbImage};
use orto_geo::{GeoBounds, GeodeticCoord, RasterFrame};
use orto_metrics::{metric_defs, metrics};
use orto_tiles::TileCache;
use rayon::prelude::*;
use std::ops::ControlFlow;
use std::path::Path;
use std::time::Instant;

const BYTES_PER_PIXEL: usize = 3;

/// Largest chart raster the renderer allocates, in pixels (768 MiB of RGB).
pub const MAX_CHART_PIXELS: u64 = 1 << 28;

/// A rectangle of output pixels, `x0..x1` × `y0..y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// First column.
    pub x0: u32,
    /// First row.
    pub y0: u32,
    /// One past the last column.
    pub x1: u32,
    /// One past the last row.
    pub y1: u32,
}

impl PixelRect {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

/// Split a `width` × `height` raster into `side`-pixel blocks, row-major.
/// Blocks on the right and bottom edges are clipped.
pub fn partition(width: u32, height: u32, side: u32) -> Vec<PixelRect> {
    let side = side.max(1);
    let mut blocks = Vec::new();
    for y0 in (0..height).step_by(side as usize) {
        for x0 in (0..width).step_by(side as usize) {
            blocks.push(PixelRect {
                x0,
                y0,
                x1: x0.saturating_add(side).min(width),
                y1: y0.saturating_add(side).min(height),
            });
        }
    }
    blocks
}

/// Reported to the caller after each partition block.
#[derive(Debug, Clone, Copy)]
pub struct BlockProgress {
    /// Zero-based block number.
    pub index: usize,
    /// Number of blocks in the chart.
    pub total: usize,
    /// Output pixels of the block.
    pub rect: PixelRect,
}

/// A rendered chart raster and its geodetic frame.
#[derive(Debug, Clone)]
pub struct ChartRaster {
    image: RgbImage,
    frame: RasterFrame,
    missing_pixels: u64,
}

impl ChartRaster {
    /// The raster.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Take the raster.
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Layout of the raster over its bounding box.
    pub fn frame(&self) -> &RasterFrame {
        &self.frame
    }

    /// Geodetic area covered.
    pub fn bounds(&self) -> GeoBounds {
        self.frame.bounds()
    }

    /// Corners in converter order: north-west, north-east, south-east, south-west.
    pub fn corners(&self) -> [GeodeticCoord; 4] {
        self.frame.corners()
    }

    /// Pixels no source tile covered.
    pub fn missing_pixels(&self) -> u64 {
        self.missing_pixels
    }

    /// Encode the raster as PNG.
    pub fn write_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|source| ChartError::Image {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(png = %path.display(), "Wrote chart raster");
        Ok(())
    }
}

/// Resamples source tiles into Mercator chart rasters.
///
/// The output is rendered in square partition blocks. Rows of a block are
/// sampled in parallel, each row through its own [`orto_tiles::TileReader`].
/// When a block is done every decoded tile is freed, which keeps memory
/// bounded by the tiles one block touches.
///
/// # Example
///
/// ```no_run
/// use orto_chart::{ChartRenderer, ChartRequest, PixelMode, RenderSettings};
/// use orto_geo::GeoBounds;
/// use orto_tiles::{CacheConfig, TileCache, TileIndex};
///
/// let cache = TileCache::from_index(TileIndex::scan("tiles")?, CacheConfig::default());
/// let renderer = ChartRenderer::new(cache, RenderSettings::default())?;
///
/// let request = ChartRequest::new(GeoBounds::new(60.66, 17.56, 60.64, 17.60)?)
///     .with_pixel_mode(PixelMode::Lightest);
/// renderer.render(&request)?.write_png("chart.png")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct ChartRenderer {
    cache: TileCache,
    settings: RenderSettings,
}

impl ChartRenderer {
    /// Create a renderer over a tile cache.
    pub fn new(cache: TileCache, settings: RenderSettings) -> Result<Self> {
        settings.validate()?;
        if let Some(capacity) = cache.config().capacity {
            if capacity < settings.tiles_touched_per_block() {
                tracing::warn!(
                    capacity,
                    tiles_per_block = settings.tiles_per_block,
                    "Cache capacity is below the tiles one partition block touches, tiles will be decoded repeatedly"
                );
            }
        }
        Ok(Self { cache, settings })
    }

    /// The tile cache.
    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// Renderer settings.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Render a chart.
    pub fn render(&self, request: &ChartRequest) -> Result<ChartRaster> {
        self.render_with(request, |_| ControlFlow::Continue(()))
    }

    /// Render a chart, calling `on_block` after each partition block once the
    /// cache has been flushed. Returning [`ControlFlow::Break`] stops the
    /// render with [`ChartError::Cancelled`].
    pub fn render_with<F>(&self, request: &ChartRequest, mut on_block: F) -> Result<ChartRaster>
    where
        F: FnMut(&BlockProgress) -> ControlFlow<()>,
    {
        let options = request.options;
        options.validate()?;

        let frame = RasterFrame::new(request.bounds, options.pixels_per_meter);
        if frame.is_empty() {
            return Err(ChartError::EmptyChart {
                pixels_per_meter: options.pixels_per_meter,
            });
        }
        let pixels = u64::from(frame.width()) * u64::from(frame.height());
        if pixels > MAX_CHART_PIXELS {
            return Err(ChartError::InvalidSettings(format!(
                "{} x {} pixels at {} px/m exceeds the {} pixel chart limit, use a lower resolution or smaller parts",
                frame.width(),
                frame.height(),
                options.pixels_per_meter,
                MAX_CHART_PIXELS
            )));
        }

        let start = Instant::now();
        let (width, height) = (frame.width(), frame.height());
        let blocks = partition(width, height, self.settings.block_side_px(options.pixels_per_meter));
        tracing::info!(
            width,
            height,
            blocks = blocks.len(),
            filter = %options.filter,
            pixel_mode = %options.pixel_mode,
            "Building chart"
        );

        let mut image = RgbImage::new(width, height);
        let stride = width as usize * BYTES_PER_PIXEL;
        let mut missing_pixels = 0u64;

        {
            let pixels: &mut [u8] = &mut image;
            for (index, rect) in blocks.iter().enumerate() {
                let rows = &mut pixels[rect.y0 as usize * stride..rect.y1 as usize * stride];
                let result = rows
                    .par_chunks_mut(stride)
                    .enumerate()
                    .map(|(i, row)| self.render_row(&frame, &options, rect, rect.y0 + i as u32, row))
                    .try_reduce(|| 0, |a, b| Ok(a + b));

                self.cache.evict_all();
                missing_pixels += result?;

                let progress = BlockProgress {
                    index,
                    total: blocks.len(),
                    rect: *rect,
                };
                tracing::debug!(block = index + 1, total = blocks.len(), "Finished chart block");
                if on_block(&progress).is_break() {
                    tracing::info!(block = index + 1, total = blocks.len(), "Chart rendering cancelled");
                    return Err(ChartError::Cancelled);
                }
            }
        }

        let elapsed = start.elapsed();
        metrics::counter!(metric_defs::CHART_PIXELS_RENDERED.name).increment(width as u64 * height as u64);
        metrics::counter!(metric_defs::CHART_MISSING_PIXELS.name).increment(missing_pixels);
        metrics::histogram!(metric_defs::CHART_RENDER_TIME.name).record(elapsed.as_secs_f64() * 1000.0);

        if missing_pixels > 0 {
            tracing::warn!(missing_pixels, "Chart area is not fully covered by source tiles");
        }

        Ok(ChartRaster {
            image,
            frame,
            missing_pixels,
        })
    }

    /// Sample the block's columns of one output row. Returns the number of
    /// pixels without source coverage.
    fn render_row(
        &self,
        frame: &RasterFrame,
        options: &ChartOptions,
        rect: &PixelRect,
        y: u32,
        row: &mut [u8],
    ) -> Result<u64> {
        let mut sampler = PixelSampler::new(
            self.cache.reader(),
            options.pixel_mode,
            frame.lat_per_pixel() / 2.0,
            frame.lon_per_pixel() / 2.0,
        );

        let mut missing = 0;
        for x in rect.x0..rect.x1 {
            let color = match sampler.sample(frame.pixel_to_geodetic(x, y))? {
                Some(color) => options.filter.apply(color),
                None => {
                    missing += 1;
                    self.settings.no_data_color
                }
            };
            let offset = x as usize * BYTES_PER_PIXEL;
            row[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&color.to_array());
        }
        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orto_tiles::CacheConfig;

    #[test]
    fn test_partition_covers_raster_once() {
        let blocks = partition(10, 7, 4);
        assert_eq!(blocks.len(), 3 * 2);
        assert_eq!(blocks[0], PixelRect { x0: 0, y0: 0, x1: 4, y1: 4 });
        assert_eq!(blocks[2], PixelRect { x0: 8, y0: 0, x1: 10, y1: 4 });
        assert_eq!(blocks[5], PixelRect { x0: 8, y0: 4, x1: 10, y1: 7 });

        let mut hits = vec![0u8; 10 * 7];
        for block in &blocks {
            for y in block.y0..block.y1 {
                for x in block.x0..block.x1 {
                    hits[(y * 10 + x) as usize] += 1;
                }
            }
        }
        assert!(hits.iter().all(|&h| h == 1));
    }

    #[test]
    fn test_partition_single_block() {
        let blocks = partition(5, 5, 100);
        assert_eq!(blocks, vec![PixelRect { x0: 0, y0: 0, x1: 5, y1: 5 }]);
        assert_eq!(blocks[0].width(), 5);
        assert!(partition(0, 5, 3).is_empty());
    }

    #[test]
    fn test_empty_area_is_rejected() {
        let renderer = ChartRenderer::new(TileCache::new(CacheConfig::default()), RenderSettings::default()).unwrap();
        let request = ChartRequest::new(GeoBounds::new(60.000_001, 17.0, 60.0, 17.04).unwrap());
        assert!(matches!(renderer.render(&request), Err(ChartError::EmptyChart { .. })));
    }

    #[test]
    fn test_oversized_chart_is_rejected() {
        let renderer = ChartRenderer::new(TileCache::new(CacheConfig::default()), RenderSettings::default()).unwrap();
        // A default 0.02 x 0.04 degree part is about 2.2 km square.
        let request = ChartRequest::new(GeoBounds::new(60.02, 17.0, 60.0, 17.04).unwrap())
            .with_pixels_per_meter(1000.0);
        assert!(matches!(renderer.render(&request), Err(ChartError::InvalidSettings(_))));

        let huge = request.with_pixels_per_meter(1e12);
        assert!(matches!(renderer.render(&huge), Err(ChartError::InvalidSettings(_))));
    }

    #[test]
    fn test_without_tiles_everything_is_missing() {
        let settings = RenderSettings {
            no_data_color: orto_tiles::Color::new(1, 2, 3),
            ..Default::default()
        };
        let renderer = ChartRenderer::new(TileCache::new(CacheConfig::default()), settings).unwrap();
        let request = ChartRequest::new(GeoBounds::new(60.0001, 15.0, 60.0, 15.0002).unwrap());
        let raster = renderer.render(&request).unwrap();

        let (w, h) = raster.image().dimensions();
        assert!(w > 0 && h > 0);
        assert_eq!(raster.missing_pixels(), w as u64 * h as u64);
        assert!(raster.image().pixels().all(|p| p.0 == [1, 2, 3]));
    }
}
