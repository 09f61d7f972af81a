//! # orto-hazard
//!
//! Detection of navigation hazards (submerged or emergent rocks) in aerial
//! orthophoto tiles.
//!
//! A [`HazardDetector`] classifies each pixel of a tile with color
//! heuristics, grows connected components with a queue-based [`FloodFill`]
//! and reports one [`HazardPoint`] per qualifying component. A
//! [`PointClusterer`] then merges detections from overlapping or adjacent
//! tiles into one point per grid cell.
//!
//! ## Example
//!
//! ```no_run
//! use orto_hazard::{DetectorConfig, HazardDetector, PointClusterer, gpx};
//! use orto_tiles::TileIndex;
//!
//! let index = TileIndex::scan("tiles")?;
//! let detector = HazardDetector::new(DetectorConfig::default())?;
//! let report = detector.detect_batch(index.tiles(), || false);
//!
//! let points = PointClusterer::new(20.0)?.combine(&report.points);
//! gpx::write_hazards_gpx("hazards.gpx", &points)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cluster;
mod config;
mod detector;
mod error;
mod flood;
pub mod gpx;
pub mod overlay;
mod point;
mod raster;
mod sample;

pub use cluster::{combine, PointClusterer, DEFAULT_COMBINE_DISTANCE_M};
pub use config::DetectorConfig;
pub use detector::{BatchReport, HazardDetector, TileFailure};
pub use error::HazardError;
pub use flood::{Component, FloodFill};
pub use point::{HazardPoint, PixelHazard};
pub use raster::{Category, ClassificationRaster, Raster, Severity};

/// Result type for hazard detection.
pub type Result<T> = std::result::Result<T, HazardError>;
