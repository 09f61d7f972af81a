//! Error types for chart rendering.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors that can occur while rendering or converting a chart.
#[derive(Debug, Error)]
pub enum ChartError {
    /// A source tile could not be read or is damaged.
    #[error("Tile error: {0}")]
    Tile(#[from] orto_tiles::TileError),

    /// Invalid bounding box.
    #[error("Geometry error: {0}")]
    Geo(#[from] orto_geo::GeoError),

    /// Encoding the chart raster failed.
    #[error("Failed to write chart raster {path}: {source}")]
    Image {
        /// Output file path.
        path: PathBuf,
        /// Underlying encoder error.
        #[source]
        source: image::ImageError,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Render settings or request parameters are out of range.
    #[error("Invalid chart settings: {0}")]
    InvalidSettings(String),

    /// The bounding box is too narrow for a single output pixel.
    #[error("Chart area is too small for one pixel at {pixels_per_meter} pixels per meter")]
    EmptyChart {
        /// Requested resolution.
        pixels_per_meter: f64,
    },

    /// Rendering was stopped between partition blocks.
    #[error("Chart rendering cancelled")]
    Cancelled,

    /// The converter program could not be started.
    #[error("Failed to start chart converter {program}: {source}")]
    ConverterSpawn {
        /// Converter executable.
        program: PathBuf,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The converter exited unsuccessfully. Its output file has been removed.
    #[error("Chart converter {program} failed with {status} for {output}")]
    ExternalConverter {
        /// Converter executable.
        program: PathBuf,
        /// Exit status reported by the process.
        status: ExitStatus,
        /// Output file that was removed.
        output: PathBuf,
    },
}
