//! Error types for the job runner.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or running jobs.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The job file could not be read.
    #[error("Failed to read job file {path}: {source}")]
    ReadConfig {
        /// Job file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The job file is not valid YAML for a run configuration.
    #[error("Invalid job file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A run summary could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A job's parameters are out of range.
    #[error("Invalid job '{job}': {reason}")]
    InvalidJob {
        /// Job name.
        job: String,
        /// What is wrong.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Geometry error.
    #[error("Geometry error: {0}")]
    Geo(#[from] orto_geo::GeoError),

    /// Tile indexing or download error.
    #[error("Tile error: {0}")]
    Tile(#[from] orto_tiles::TileError),

    /// Hazard detection or export error.
    #[error("Hazard error: {0}")]
    Hazard(#[from] orto_hazard::HazardError),

    /// Chart rendering error.
    #[error("Chart error: {0}")]
    Chart(#[from] orto_chart::ChartError),

    /// The Ctrl-C handler could not be installed.
    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// The run was interrupted.
    #[error("Run cancelled")]
    Cancelled,
}
