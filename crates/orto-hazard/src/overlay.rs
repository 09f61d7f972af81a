//! Analysis overlay images for visual inspection of a detection pass.

use crate::{Category, ClassificationRaster, HazardError, PixelHazard, Result};
use image::{Rgba, RgbaImage};
use orto_tiles::ANALYZED_SUFFIX;
use std::path::{Path, PathBuf};

/// Color painted for hazard centroids.
pub const CENTROID_COLOR: Rgba<u8> = Rgba([0, 128, 0, 255]);

/// Overlay color of a category.
pub fn category_color(category: Category) -> Rgba<u8> {
    match category {
        Category::Land | Category::Landmass => Rgba([0, 0, 0, 255]),
        Category::Seagull => Rgba([0, 255, 255, 255]),
        Category::DangerHigh => Rgba([255, 0, 0, 255]),
        Category::DangerLow => Rgba([139, 0, 0, 255]),
        Category::DangerAreaHigh => Rgba([255, 255, 0, 255]),
        Category::DangerAreaLow => Rgba([165, 42, 42, 255]),
    }
}

/// Overlay path for a tile: `<stem>_analyzed.png` in the same folder.
pub fn overlay_path(tile_path: &Path) -> PathBuf {
    let stem = tile_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    tile_path.with_file_name(format!("{}{}.png", stem, ANALYZED_SUFFIX))
}

/// Paint classified cells and hazard centroids over a copy of the source.
pub fn render_overlay(
    source: &RgbaImage,
    raster: &ClassificationRaster,
    hazards: &[PixelHazard],
) -> RgbaImage {
    let mut image = source.clone();
    for ((x, y), cell) in raster.iter() {
        if let Some(category) = cell {
            image.put_pixel(x, y, category_color(*category));
        }
    }
    for hazard in hazards {
        if hazard.x < image.width() && hazard.y < image.height() {
            image.put_pixel(hazard.x, hazard.y, CENTROID_COLOR);
        }
    }
    image
}

/// Render and save the overlay for a tile.
pub fn write_overlay(
    tile_path: &Path,
    source: &RgbaImage,
    raster: &ClassificationRaster,
    hazards: &[PixelHazard],
) -> Result<PathBuf> {
    let path = overlay_path(tile_path);
    render_overlay(source, raster, hazards)
        .save(&path)
        .map_err(|source| HazardError::Overlay {
            path: path.clone(),
            source,
        })?;
    tracing::debug!(overlay = %path.display(), "Wrote analysis overlay");
    Ok(path)
}
