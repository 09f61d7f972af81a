//! # orto-runner
//!
//! Runs orthophoto jobs end to end: download the source tiles of an area,
//! detect hazards and write them as GPX waypoints, and build georeferenced
//! chart parts.
//!
//! ## Example
//!
//! ```no_run
//! use orto_runner::{CancelFlag, JobRunner, RunConfig};
//!
//! let config = RunConfig::from_yaml_file("jobs.yaml")?;
//! let runner = JobRunner::new(config).with_cancel_flag(CancelFlag::install_ctrlc_handler()?);
//! let summary = runner.run()?;
//! println!("{}", summary.to_json()?);
//! # Ok::<(), orto_runner::RunnerError>(())
//! ```

mod cancel;
mod config;
mod error;
mod runner;
mod summary;

pub use cancel::CancelFlag;
pub use config::{
    ConverterConfig, DownloadConfig, JobConfig, RunConfig, DEFAULT_GPX_FILE, DEFAULT_PART_LAT,
    DEFAULT_PART_LON,
};
pub use error::RunnerError;
pub use runner::{tiles_overlapping, JobRunner};
pub use summary::{AnalysisSummary, ChartSummary, JobSummary, RunSummary};

/// Result type for the runner.
pub type Result<T> = std::result::Result<T, RunnerError>;
