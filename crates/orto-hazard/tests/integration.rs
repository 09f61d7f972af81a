//! End-to-end detection on synthetic tiles written to a temporary folder.

use image::{Rgba, RgbaImage};
use orto_geo::{GridCoord, GridRegion};
use orto_hazard::{
    gpx, overlay, DetectorConfig, HazardDetector, HazardError, PointClusterer, Severity,
};
use orto_tiles::{Tile, TileError, TileIndex};
use std::path::Path;
use tempfile::TempDir;

/// Teal water: hue 180, below the hazard hue limit.
const TEAL: Rgba<u8> = Rgba([40, 70, 70, 255]);
/// Blue water: hue 200, never a hazard.
const BLUE: Rgba<u8> = Rgba([40, 60, 70, 255]);
const LAND: Rgba<u8> = Rgba([150, 150, 150, 255]);

/// 10 m tiles, 40 × 40 pixels.
fn region(col: i64) -> GridRegion {
    let west = 500_000 + col * 10;
    GridRegion::new(6_700_010, 6_700_000, west + 10, west).unwrap()
}

fn square(image: &mut RgbaImage, x0: u32, y0: u32, side: u32, color: Rgba<u8>) {
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            image.put_pixel(x, y, color);
        }
    }
}

fn save(dir: &Path, region: &GridRegion, image: &RgbaImage) -> Tile {
    let path = dir.join(TileIndex::file_name(region));
    image.save(&path).unwrap();
    Tile::new(*region, path)
}

/// A submerged rock: a brighter 5x5 patch centred on pixel (20, 20).
fn rock_tile(dir: &Path, col: i64) -> Tile {
    let mut image = RgbaImage::from_pixel(40, 40, TEAL);
    square(&mut image, 18, 18, 5, Rgba([48, 84, 84, 255]));
    save(dir, &region(col), &image)
}

/// A bird: a small bright blob in open water.
fn seagull_tile(dir: &Path, col: i64) -> Tile {
    let mut image = RgbaImage::from_pixel(40, 40, BLUE);
    square(&mut image, 10, 10, 3, LAND);
    save(dir, &region(col), &image)
}

fn detector() -> HazardDetector {
    HazardDetector::new(DetectorConfig::default()).unwrap()
}

#[test]
fn test_rock_is_detected_and_located() {
    let dir = TempDir::new().unwrap();
    let tile = rock_tile(dir.path(), 0);

    let points = detector().detect(&tile).unwrap();
    assert_eq!(points.len(), 1);

    let point = points[0];
    assert_eq!((point.pixel_x, point.pixel_y), (20, 20));
    assert_eq!(point.severity, Severity::High);
    assert_eq!(point.grid, GridCoord::new(6_700_005.0, 500_005.0));
    assert!(point.position.lat > 60.0 && point.position.lat < 61.0);
    assert!((point.position.lon - 15.0).abs() < 0.01);
}

#[test]
fn test_seagull_is_not_a_hazard() {
    let dir = TempDir::new().unwrap();
    let tile = seagull_tile(dir.path(), 0);
    assert!(detector().detect(&tile).unwrap().is_empty());
}

#[test]
fn test_overlay_is_written_and_not_indexed() {
    let dir = TempDir::new().unwrap();
    let tile = rock_tile(dir.path(), 0);

    detector().with_overlay(true).detect(&tile).unwrap();

    let overlay_path = overlay::overlay_path(tile.path());
    let image = image::open(&overlay_path).unwrap().to_rgba8();
    assert_eq!(*image.get_pixel(20, 20), overlay::CENTROID_COLOR);
    assert_eq!(*image.get_pixel(0, 0), TEAL);

    let index = TileIndex::scan(dir.path()).unwrap();
    assert_eq!(index.len(), 1);
    assert!(index.rejected().is_empty());
}

#[test]
fn test_batch_isolates_failing_tiles() {
    let dir = TempDir::new().unwrap();
    let mut tiles = vec![rock_tile(dir.path(), 0), seagull_tile(dir.path(), 1)];

    let mut truncated = RgbaImage::from_pixel(40, 40, TEAL);
    square(&mut truncated, 0, 30, 10, Rgba([0, 0, 0, 0]));
    tiles.push(save(dir.path(), &region(2), &truncated));

    tiles.push(rock_tile(dir.path(), 3));

    let report = detector().detect_batch(&tiles, || false);
    assert_eq!(report.tiles_analyzed, 3);
    assert!(!report.cancelled);
    assert_eq!(report.points.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].tile, tiles[2].path());
    assert!(matches!(
        report.failures[0].error,
        HazardError::Tile(TileError::CorruptTile { .. })
    ));
}

#[test]
fn test_batch_stops_on_request() {
    let dir = TempDir::new().unwrap();
    let tiles = vec![rock_tile(dir.path(), 0), rock_tile(dir.path(), 1)];

    let report = detector().detect_batch(&tiles, || true);
    assert!(report.cancelled);
    assert_eq!(report.tiles_analyzed, 0);
    assert!(report.points.is_empty());
    assert!(report.failures.is_empty());
}

#[test]
fn test_wrong_tile_size_fails() {
    let dir = TempDir::new().unwrap();
    let tile = save(dir.path(), &region(0), &RgbaImage::from_pixel(20, 20, TEAL));
    assert!(matches!(
        detector().detect(&tile),
        Err(HazardError::Tile(TileError::UnexpectedSize { .. }))
    ));
}

#[test]
fn test_detect_cluster_export() {
    let dir = TempDir::new().unwrap();
    // Two rocks 10 m apart: one cell at 20 m, two cells at 5 m.
    let tiles = vec![rock_tile(dir.path(), 0), rock_tile(dir.path(), 1)];
    let report = detector().detect_batch(&tiles, || false);
    assert_eq!(report.points.len(), 2);

    let merged = PointClusterer::new(20.0).unwrap().combine(&report.points);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].grid, GridCoord::new(6_700_005.0, 500_010.0));
    assert_eq!(merged[0].severity, Severity::High);

    let separate = PointClusterer::new(5.0).unwrap().combine(&report.points);
    assert_eq!(separate.len(), 2);

    let gpx_path = dir.path().join("hazards.gpx");
    gpx::write_hazards_gpx(&gpx_path, &merged).unwrap();
    let text = std::fs::read_to_string(&gpx_path).unwrap();
    assert_eq!(text.matches("<wpt ").count(), 1);
    assert!(text.contains("<sym>Hazard-Rock-Awash</sym>"));
}
