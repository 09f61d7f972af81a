//! Per-tile hazard detection.
//!
//! Detection runs in four passes over one decoded tile:
//!
//! 1. **Classify** every pixel from its color and the average colors of a
//!    small and a large neighbourhood.
//! 2. **Clean up land**: small bright blobs are either transient artifacts
//!    (birds, glare) or emergent rocks, depending on what surrounds them.
//! 3. **Extract** connected hazard components and reduce each to a centroid.
//! 4. **Locate** the centroids in grid and geodetic coordinates.
//!
//! Tiles are independent, so a batch runs one tile per rayon worker.

use crate::overlay;
use crate::sample::AreaSampler;
use crate::{
    Category, ClassificationRaster, DetectorConfig, FloodFill, HazardError, HazardPoint,
    PixelHazard, Raster, Result,
};
use image::RgbaImage;
use orto_geo::{sweref99tm, GridCoord};
use orto_metrics::{metric_defs, metrics};
use orto_tiles::{Tile, TileError};
use rayon::prelude::*;
use std::path::PathBuf;

/// A tile whose detection failed.
#[derive(Debug)]
pub struct TileFailure {
    /// Source tile path.
    pub tile: PathBuf,
    /// Why the tile produced no hazards.
    pub error: HazardError,
}

/// Combined result of a detection batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Hazards from every successful tile, in tile order.
    pub points: Vec<HazardPoint>,
    /// Tiles that failed; their hazards are missing from `points`.
    pub failures: Vec<TileFailure>,
    /// Tiles that completed successfully.
    pub tiles_analyzed: usize,
    /// True if the batch stopped early on request.
    pub cancelled: bool,
}

/// Color-heuristic hazard detector.
#[derive(Debug, Clone)]
pub struct HazardDetector {
    config: DetectorConfig,
    write_overlay: bool,
}

impl HazardDetector {
    /// Create a detector, validating its thresholds.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            write_overlay: false,
        })
    }

    /// Also write a `<tile>_analyzed.png` overlay next to each source tile.
    pub fn with_overlay(mut self, enabled: bool) -> Self {
        self.write_overlay = enabled;
        self
    }

    /// Detector thresholds.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect hazards in one tile.
    ///
    /// A tile fails as a whole: if any centroid cannot be projected, none of
    /// the tile's hazards are returned.
    pub fn detect(&self, tile: &Tile) -> Result<Vec<HazardPoint>> {
        let image = tile.decode(self.config.size_check)?;
        ensure_opaque(tile, &image)?;

        let mut raster = self.classify(&image);
        let mut flood = FloodFill::new();
        self.clean_up_land(&mut raster, &mut flood);

        let snapshot = self.write_overlay.then(|| raster.clone());
        let hazards = self.extract(&mut raster, &mut flood);

        if let Some(snapshot) = snapshot {
            overlay::write_overlay(tile.path(), &image, &snapshot, &hazards)?;
        }

        let points = self.locate(tile, image.width(), image.height(), &hazards)?;
        tracing::debug!(tile = %tile.path().display(), points = points.len(), "Analyzed tile");
        Ok(points)
    }

    /// Classify every pixel of a decoded tile. The image is not modified.
    pub fn classify(&self, image: &RgbaImage) -> ClassificationRaster {
        let (width, height) = image.dimensions();
        let mut raster = Raster::new(width, height);
        if raster.is_empty() {
            return raster;
        }

        let sampler = AreaSampler::new(image);
        for y in 0..height {
            for x in 0..width {
                raster[(x, y)] = self.classify_pixel(&sampler, x, y);
            }
        }
        raster
    }

    fn classify_pixel(&self, sampler: &AreaSampler, x: u32, y: u32) -> Option<Category> {
        let c = &self.config;

        let pixel = sampler.mean(x, y, 0);
        if pixel == c.safe_marker {
            return None;
        }
        if pixel.brightness() >= c.land_brightness {
            return Some(Category::Land);
        }

        let small = sampler.mean(x, y, c.small_sample_radius);
        let hue = small.hue();

        let mut category = if hue < c.hue_danger_area_high_max {
            Some(Category::DangerAreaHigh)
        } else if hue < c.hue_danger_area_low_max {
            Some(Category::DangerAreaLow)
        } else {
            None
        };

        // A local brightness anomaly overrides the hue classification.
        if small.r > c.min_red_for_danger && hue < c.max_hue_for_danger {
            let surrounding = sampler.mean(x, y, c.large_sample_radius).brightness();
            if surrounding > 0.0 {
                let factor = small.brightness() / surrounding;
                if factor > c.brightness_factor_high {
                    category = Some(Category::DangerHigh);
                } else if factor > c.brightness_factor_low {
                    category = Some(Category::DangerLow);
                }
            }
        }

        category
    }

    /// Reclassify every `Land` component by size.
    ///
    /// Small components bordered only by unclassified water become
    /// `Seagull`; other small components become `DangerHigh`; the rest become
    /// `Landmass`. No `Land` cells remain afterwards.
    pub fn clean_up_land(&self, raster: &mut ClassificationRaster, flood: &mut FloodFill) {
        let is_land = |c: &Option<Category>| *c == Some(Category::Land);

        for y in 0..raster.height() {
            for x in 0..raster.width() {
                if !is_land(&raster[(x, y)]) {
                    continue;
                }

                let component = flood.fill(raster, (x, y), None, is_land);
                let surrounded_by_water = component.outside.iter().all(Option::is_none);

                let category = if component.size <= self.config.seagull_max_size
                    && surrounded_by_water
                {
                    Category::Seagull
                } else if component.size <= self.config.dangerous_land_max_size {
                    Category::DangerHigh
                } else {
                    Category::Landmass
                };

                for &cell in flood.members() {
                    raster[cell] = Some(category);
                }

                if category != Category::Landmass {
                    metrics::counter!(
                        metric_defs::HAZARD_LAND_RECLASSIFIED.name,
                        "category" => category.as_str()
                    )
                    .increment(1);
                }
            }
        }
    }

    /// Consume every hazard component and return one centroid per component
    /// that is large enough and does not touch land.
    ///
    /// Land counts both inside the component and on its border, so the dark
    /// rim along a shoreline is dropped rather than reported as a hazard.
    pub fn extract(
        &self,
        raster: &mut ClassificationRaster,
        flood: &mut FloodFill,
    ) -> Vec<PixelHazard> {
        let is_hazard = |c: &Option<Category>| c.is_some_and(|c| c.is_hazard());
        let mut hazards = Vec::new();

        for y in 0..raster.height() {
            for x in 0..raster.width() {
                if !is_hazard(&raster[(x, y)]) {
                    continue;
                }

                let component = flood.fill(raster, (x, y), None, is_hazard);

                if component.size < self.config.min_danger_size {
                    metrics::counter!(metric_defs::HAZARD_COMPONENTS_DISCARDED.name, "reason" => "small")
                        .increment(1);
                    continue;
                }

                let touches_land = component
                    .found
                    .iter()
                    .chain(&component.outside)
                    .any(|c| c.is_some_and(|c| c.is_land()));
                if touches_land {
                    metrics::counter!(metric_defs::HAZARD_COMPONENTS_DISCARDED.name, "reason" => "land")
                        .increment(1);
                    continue;
                }

                let Some(severity) = component
                    .found
                    .iter()
                    .filter_map(|c| c.and_then(|c| c.severity()))
                    .max()
                else {
                    continue;
                };

                hazards.push(PixelHazard {
                    x: component.centroid.0,
                    y: component.centroid.1,
                    size: component.size,
                    severity,
                });
            }
        }

        hazards
    }

    /// Convert pixel centroids to grid and geodetic coordinates.
    pub fn locate(
        &self,
        tile: &Tile,
        width: u32,
        height: u32,
        hazards: &[PixelHazard],
    ) -> Result<Vec<HazardPoint>> {
        let region = tile.region();
        let pixels_per_meter_x = width as f64 / region.width_m() as f64;
        let pixels_per_meter_y = height as f64 / region.height_m() as f64;

        let points = hazards
            .iter()
            .map(|hazard| {
                let grid = GridCoord::new(
                    region.north() as f64 - hazard.y as f64 / pixels_per_meter_y,
                    region.west() as f64 + hazard.x as f64 / pixels_per_meter_x,
                );
                let position =
                    sweref99tm::grid_to_geodetic(grid).map_err(|source| HazardError::Projection {
                        tile: tile.path().to_path_buf(),
                        source,
                    })?;
                Ok(HazardPoint {
                    pixel_x: hazard.x,
                    pixel_y: hazard.y,
                    grid,
                    position,
                    severity: hazard.severity,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for point in &points {
            metrics::counter!(metric_defs::HAZARD_POINTS.name, "severity" => point.severity.as_str())
                .increment(1);
        }
        Ok(points)
    }

    /// Detect hazards in many tiles in parallel.
    ///
    /// A failing tile is logged and reported in [`BatchReport::failures`];
    /// other tiles are unaffected. `should_stop` is polled before each tile
    /// starts, and tiles already running are completed.
    pub fn detect_batch<F>(&self, tiles: &[Tile], should_stop: F) -> BatchReport
    where
        F: Fn() -> bool + Sync,
    {
        let outcomes: Vec<Option<Result<Vec<HazardPoint>>>> = tiles
            .par_iter()
            .map(|tile| {
                if should_stop() {
                    return None;
                }
                Some(self.detect(tile))
            })
            .collect();

        let mut report = BatchReport::default();
        for (tile, outcome) in tiles.iter().zip(outcomes) {
            match outcome {
                Some(Ok(points)) => {
                    report.tiles_analyzed += 1;
                    report.points.extend(points);
                }
                Some(Err(error)) => {
                    tracing::warn!(
                        tile = %tile.path().display(),
                        %error,
                        "Tile analysis failed, its hazards are omitted"
                    );
                    metrics::counter!(metric_defs::HAZARD_TILE_FAILURES.name).increment(1);
                    report.failures.push(TileFailure {
                        tile: tile.path().to_path_buf(),
                        error,
                    });
                }
                None => report.cancelled = true,
            }
        }

        tracing::info!(
            tiles = report.tiles_analyzed,
            failed = report.failures.len(),
            points = report.points.len(),
            cancelled = report.cancelled,
            "Hazard detection finished"
        );
        report
    }
}

/// Transparent pixels mean truncated imagery; refuse to analyze such a tile.
fn ensure_opaque(tile: &Tile, image: &RgbaImage) -> Result<()> {
    if let Some((x, y, _)) = image.enumerate_pixels().find(|(_, _, p)| p.0[3] == 0) {
        return Err(TileError::CorruptTile {
            path: tile.path().to_path_buf(),
            x,
            y,
        }
        .into());
    }
    Ok(())
}
