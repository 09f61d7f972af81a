//! Offline job runs over synthetic 10 m tiles with a stand-in chart converter.

use image::{Rgba, RgbaImage};
use orto_chart::ChartConverter;
use orto_geo::{sweref99tm, GeoBounds, GeodeticCoord, GridCoord, GridRegion};
use orto_runner::{CancelFlag, JobRunner, RunConfig, RunnerError};
use orto_tiles::TileIndex;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TEAL: Rgba<u8> = Rgba([40, 70, 70, 255]);

/// A job of 2 × 2 chart parts, each about 22 m square.
const JOBS: &str = r#"
work_dir: .
download:
  enabled: false
render:
  tile_span_m: 10
  tiles_per_block: 1
jobs:
  - name: Test
    lat0: 60.0001
    lon0: 15.0001
    lat1: 60.00035
    lon1: 15.0007
    part_lat: 0.0002
    part_lon: 0.0004
    analyze: true
    charts: {}
"#;

/// Copies the raster in place of a real chart.
struct CopyConverter;

impl ChartConverter for CopyConverter {
    fn convert(&self, raster: &Path, _bounds: &GeoBounds, output: &Path) -> orto_chart::Result<()> {
        fs::copy(raster, output)?;
        Ok(())
    }
}

/// Converts one chart, then requests a stop.
struct StopAfterFirst(CancelFlag);

impl ChartConverter for StopAfterFirst {
    fn convert(&self, raster: &Path, bounds: &GeoBounds, output: &Path) -> orto_chart::Result<()> {
        CopyConverter.convert(raster, bounds, output)?;
        self.0.cancel();
        Ok(())
    }
}

/// Write the job file and a teal tile grid with one submerged rock near the
/// middle of the job area.
fn setup() -> (TempDir, RunConfig) {
    let dir = TempDir::new().unwrap();
    let jobs = dir.path().join("jobs.yaml");
    fs::write(&jobs, JOBS).unwrap();
    let config = RunConfig::from_yaml_file(&jobs).unwrap();

    let area = config.jobs[0].aligned_bounds().unwrap();
    let r = GridRegion::bounding(&area).unwrap().aligned(10);
    let r = GridRegion::new(r.north() + 10, r.south() - 10, r.east() + 10, r.west() - 10).unwrap();

    let center = sweref99tm::geodetic_to_grid(GeodeticCoord::new(
        (area.north + area.south) / 2.0,
        (area.west + area.east) / 2.0,
    ));

    let tile_dir = config.tile_dir();
    fs::create_dir_all(&tile_dir).unwrap();
    for block in r.blocks(10) {
        let mut image = RgbaImage::from_pixel(40, 40, TEAL);
        if block.contains(center) {
            for y in 18..23 {
                for x in 18..23 {
                    image.put_pixel(x, y, Rgba([48, 84, 84, 255]));
                }
            }
        }
        image.save(tile_dir.join(TileIndex::file_name(&block))).unwrap();
    }

    (dir, config)
}

fn group_dir(config: &RunConfig) -> PathBuf {
    config.chart_dir().join("Test_1_Mean_Natural")
}

fn files_with_extension(dir: &Path, ext: &str) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == ext))
        .count()
}

#[test]
fn test_offline_run() {
    let (dir, config) = setup();
    assert_eq!(config.work_dir, dir.path().join("."));

    let runner = JobRunner::new(config.clone()).with_converter(Box::new(CopyConverter));
    let summary = runner.run().unwrap();
    assert!(!summary.has_failures());

    let job = &summary.jobs[0];
    assert!(job.tiles > 0);
    assert!(job.download.is_none());

    let analysis = job.analysis.as_ref().unwrap();
    assert_eq!(analysis.points, 1);
    assert!(analysis.failed_tiles.is_empty());
    let gpx = fs::read_to_string(dir.path().join("ortooutput.gpx")).unwrap();
    assert_eq!(gpx.matches("<wpt ").count(), 1);

    let charts = job.charts.as_ref().unwrap();
    assert_eq!(charts.group, "Test_1_Mean_Natural");
    assert_eq!(charts.built, 4);
    assert_eq!(charts.skipped, 0);
    assert_eq!(files_with_extension(&group_dir(&config), "kap"), 4);
    // Intermediate rasters are removed after conversion.
    assert_eq!(files_with_extension(&group_dir(&config), "png"), 0);

    assert!(summary.to_json().unwrap().contains("\"built\": 4"));
}

#[test]
fn test_existing_charts_are_skipped() {
    let (_dir, config) = setup();
    let runner = JobRunner::new(config).with_converter(Box::new(CopyConverter));

    runner.run().unwrap();
    let second = runner.run().unwrap();
    let charts = second.jobs[0].charts.as_ref().unwrap();
    assert_eq!(charts.built, 0);
    assert_eq!(charts.skipped, 4);
}

#[test]
fn test_keep_intermediate() {
    let (_dir, mut config) = setup();
    config.converter.keep_intermediate = true;
    config.jobs[0].analyze = false;

    let runner = JobRunner::new(config.clone()).with_converter(Box::new(CopyConverter));
    let summary = runner.run().unwrap();
    assert!(summary.jobs[0].analysis.is_none());
    assert_eq!(files_with_extension(&group_dir(&config), "png"), 4);
}

#[test]
fn test_cancel_keeps_completed_charts() {
    let (_dir, config) = setup();
    let cancel = CancelFlag::new();
    let runner = JobRunner::new(config.clone())
        .with_cancel_flag(cancel.clone())
        .with_converter(Box::new(StopAfterFirst(cancel)));

    assert!(matches!(runner.run(), Err(RunnerError::Cancelled)));
    assert_eq!(files_with_extension(&group_dir(&config), "kap"), 1);
}

#[test]
fn test_unreadable_tile_only_fails_its_part() {
    let (_dir, config) = setup();

    // Only the north-west part samples the tile 2 m inside the area's corner.
    let area = config.jobs[0].aligned_bounds().unwrap();
    let nw = sweref99tm::geodetic_to_grid(area.north_west());
    let inside = GridCoord::new(nw.north - 2.0, nw.east + 2.0);
    let index = TileIndex::scan(config.tile_dir()).unwrap();
    let damaged = index
        .tiles()
        .iter()
        .find(|tile| tile.region().contains(inside))
        .unwrap();
    fs::write(damaged.path(), b"garbage").unwrap();

    let runner = JobRunner::new(config.clone()).with_converter(Box::new(CopyConverter));
    let summary = runner.run().unwrap();
    assert!(summary.has_failures());

    let job = &summary.jobs[0];
    let analysis = job.analysis.as_ref().unwrap();
    assert_eq!(analysis.failed_tiles, vec![damaged.path().to_path_buf()]);
    assert_eq!(analysis.points, 1);

    let charts = job.charts.as_ref().unwrap();
    assert_eq!(charts.built, 3);
    assert_eq!(charts.failed.len(), 1);
    assert!(!charts.failed[0].exists());
    assert_eq!(files_with_extension(&group_dir(&config), "kap"), 3);
}

#[cfg(unix)]
#[test]
fn test_converter_failure_is_reported() {
    let (_dir, mut config) = setup();
    config.converter.program = PathBuf::from("false");
    config.jobs[0].analyze = false;

    let summary = JobRunner::new(config.clone()).run().unwrap();
    assert!(summary.has_failures());
    let charts = summary.jobs[0].charts.as_ref().unwrap();
    assert_eq!(charts.failed.len(), 4);
    assert_eq!(charts.built, 0);
    assert_eq!(files_with_extension(&group_dir(&config), "kap"), 0);
    // The raster stays behind for inspection.
    assert_eq!(files_with_extension(&group_dir(&config), "png"), 4);
}
