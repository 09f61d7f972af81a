//! Job file model.
//!
//! A job file is YAML:
//!
//! ```yaml
//! work_dir: /data/ortocharter
//! jobs:
//!   - name: East
//!     lat0: 60.6522
//!     lon0: 17.5769
//!     lat1: 60.5107
//!     lon1: 17.7934
//!     analyze: true
//!     charts:
//!       pixels_per_meter: 2
//!       filter: Subsurface2
//!       pixel_mode: Mean
//! ```
//!
//! Everything except `jobs` and each job's name and corners has a default.

use crate::{Result, RunnerError};
use orto_chart::{ChartOptions, RenderSettings, IMGKAP_PROGRAM};
use orto_geo::{GeoBounds, GeodeticCoord};
use orto_hazard::{DetectorConfig, DEFAULT_COMBINE_DISTANCE_M};
use orto_tiles::{CacheConfig, DEFAULT_LAYERS, DEFAULT_WMS_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default latitude extent of one chart part in degrees.
pub const DEFAULT_PART_LAT: f64 = 0.02;
/// Default longitude extent of one chart part in degrees.
pub const DEFAULT_PART_LON: f64 = 0.04;
/// Default hazard waypoint file, relative to the working directory.
pub const DEFAULT_GPX_FILE: &str = "ortooutput.gpx";

/// Source tile download settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Fetch missing tiles before running a job. When off, the tile folder
    /// must already be populated.
    pub enabled: bool,
    /// WMS GetMap endpoint.
    pub url: String,
    /// Comma-separated layer list.
    pub layers: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_WMS_URL.to_string(),
            layers: DEFAULT_LAYERS.to_string(),
        }
    }
}

/// External chart converter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// imgkap executable.
    pub program: PathBuf,
    /// Keep the chart PNG after a successful conversion.
    pub keep_intermediate: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(IMGKAP_PROGRAM),
            keep_intermediate: false,
        }
    }
}

/// One area to process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Job name, used for chart group folders.
    pub name: String,
    /// Latitude of one corner.
    pub lat0: f64,
    /// Longitude of one corner.
    pub lon0: f64,
    /// Latitude of the opposite corner.
    pub lat1: f64,
    /// Longitude of the opposite corner.
    pub lon1: f64,
    /// Latitude extent of one chart part in degrees.
    #[serde(default = "default_part_lat")]
    pub part_lat: f64,
    /// Longitude extent of one chart part in degrees.
    #[serde(default = "default_part_lon")]
    pub part_lon: f64,
    /// Run hazard detection and write waypoints.
    #[serde(default)]
    pub analyze: bool,
    /// Hazard points closer than this (same grid cell) are merged.
    #[serde(default = "default_combine_distance")]
    pub combine_distance_m: f64,
    /// Write a classification overlay next to every analyzed tile.
    #[serde(default)]
    pub write_overlay: bool,
    /// Waypoint file, relative to the working directory.
    #[serde(default = "default_gpx_file")]
    pub gpx_file: PathBuf,
    /// Build chart parts with these options.
    #[serde(default)]
    pub charts: Option<ChartOptions>,
}

fn default_part_lat() -> f64 {
    DEFAULT_PART_LAT
}

fn default_part_lon() -> f64 {
    DEFAULT_PART_LON
}

fn default_combine_distance() -> f64 {
    DEFAULT_COMBINE_DISTANCE_M
}

fn default_gpx_file() -> PathBuf {
    PathBuf::from(DEFAULT_GPX_FILE)
}

impl JobConfig {
    /// A job over the box spanned by two corners, with default settings.
    pub fn new(name: impl Into<String>, corner0: GeodeticCoord, corner1: GeodeticCoord) -> Self {
        Self {
            name: name.into(),
            lat0: corner0.lat,
            lon0: corner0.lon,
            lat1: corner1.lat,
            lon1: corner1.lon,
            part_lat: DEFAULT_PART_LAT,
            part_lon: DEFAULT_PART_LON,
            analyze: false,
            combine_distance_m: DEFAULT_COMBINE_DISTANCE_M,
            write_overlay: false,
            gpx_file: default_gpx_file(),
            charts: None,
        }
    }

    /// Check part sizes, distances and chart options.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(RunnerError::InvalidJob {
                job: self.name.clone(),
                reason: reason.to_string(),
            })
        };

        if self.name.is_empty() || self.name.contains(['/', '\\']) {
            return fail("name must be a non-empty folder name");
        }
        if !(self.part_lat > 0.0 && self.part_lon > 0.0) {
            return fail("part_lat and part_lon must be positive");
        }
        if self.analyze && !(self.combine_distance_m.is_finite() && self.combine_distance_m > 0.0) {
            return fail("combine_distance_m must be positive");
        }
        if let Some(charts) = &self.charts {
            if let Err(e) = charts.validate() {
                return fail(&e.to_string());
            }
        }
        self.bounds()?;
        Ok(())
    }

    /// The job's box as given.
    pub fn bounds(&self) -> Result<GeoBounds> {
        Ok(GeoBounds::from_corners(
            GeodeticCoord::new(self.lat0, self.lon0),
            GeodeticCoord::new(self.lat1, self.lon1),
        )?)
    }

    /// The box expanded outward to whole chart parts.
    pub fn aligned_bounds(&self) -> Result<GeoBounds> {
        Ok(self.bounds()?.aligned(self.part_lat, self.part_lon)?)
    }
}

/// A run: shared settings and the jobs to process in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Root of tiles, charts and waypoint output.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Tile download settings.
    #[serde(default)]
    pub download: DownloadConfig,
    /// Tile cache sizing for chart rendering.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Chart renderer settings.
    #[serde(default)]
    pub render: RenderSettings,
    /// Hazard detector thresholds.
    #[serde(default)]
    pub detector: DetectorConfig,
    /// Chart converter settings.
    #[serde(default)]
    pub converter: ConverterConfig,
    /// Jobs.
    pub jobs: Vec<JobConfig>,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

impl RunConfig {
    /// A run with default settings rooted at `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            download: DownloadConfig::default(),
            cache: CacheConfig::default(),
            render: RenderSettings::default(),
            detector: DetectorConfig::default(),
            converter: ConverterConfig::default(),
            jobs: Vec::new(),
        }
    }

    /// Parse and validate a YAML job description.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: RunConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML job file. A relative `work_dir` is
    /// resolved against the file's folder.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RunnerError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&text)?;
        if config.work_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.work_dir = parent.join(&config.work_dir);
            }
        }
        Ok(config)
    }

    /// Validate every job.
    pub fn validate(&self) -> Result<()> {
        for job in &self.jobs {
            job.validate()?;
        }
        self.render.validate()?;
        self.detector.validate()?;
        Ok(())
    }

    /// Folder holding source tiles.
    pub fn tile_dir(&self) -> PathBuf {
        self.work_dir.join("Download")
    }

    /// Folder holding chart groups.
    pub fn chart_dir(&self) -> PathBuf {
        self.work_dir.join("Charts")
    }
}
