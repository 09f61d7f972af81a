//! `ortocharter` command line.

use clap::{Parser, Subcommand};
use orto_chart::{ChartConverter, ChartOptions, ChartRequest, ColorFilter, ImgKap, PixelMode, IMGKAP_PROGRAM};
use orto_geo::{GeoBounds, GridRegion};
use orto_hazard::{DetectorConfig, DEFAULT_COMBINE_DISTANCE_M};
use orto_runner::{
    tiles_overlapping, CancelFlag, JobRunner, Result, RunConfig, RunnerError, DEFAULT_GPX_FILE,
};
use orto_tiles::TileIndex;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Hazard waypoints and nautical chart parts from aerial orthophotos.
#[derive(Parser, Debug)]
#[command(name = "ortocharter", version, about, long_about = None)]
struct Cli {
    /// Log filter such as `debug` or `orto_chart=trace`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Serve Prometheus metrics on this address.
    #[cfg(feature = "prometheus")]
    #[arg(long, global = true)]
    metrics_addr: Option<std::net::SocketAddr>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every job of a YAML job file.
    Run {
        /// Job file.
        jobs: PathBuf,
        /// Use the tiles already on disk, never download.
        #[arg(long)]
        offline: bool,
        /// Print a JSON run summary to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Detect hazards in a folder of tiles and write GPX waypoints.
    Analyze {
        /// Folder of `<west>,<south>,<east>,<north>.png` tiles.
        tile_dir: PathBuf,
        /// Merge hazards within grid cells of this size in meters.
        #[arg(long, default_value_t = DEFAULT_COMBINE_DISTANCE_M)]
        combine_distance: f64,
        /// Waypoint output file.
        #[arg(long, default_value = DEFAULT_GPX_FILE)]
        gpx: PathBuf,
        /// Write `<tile>_analyzed.png` classification overlays.
        #[arg(long)]
        overlay: bool,
        /// YAML file with detector thresholds.
        #[arg(long)]
        detector: Option<PathBuf>,
    },

    /// Render one chart raster from a folder of tiles.
    Chart {
        /// Folder of `<west>,<south>,<east>,<north>.png` tiles.
        tile_dir: PathBuf,
        /// North edge in degrees.
        #[arg(long)]
        north: f64,
        /// West edge in degrees.
        #[arg(long)]
        west: f64,
        /// South edge in degrees.
        #[arg(long)]
        south: f64,
        /// East edge in degrees.
        #[arg(long)]
        east: f64,
        /// Output pixels per meter.
        #[arg(long, default_value_t = 1.0)]
        ppm: f64,
        /// Color filter: Natural, Subsurface or Subsurface2.
        #[arg(long, default_value = "Natural")]
        filter: ColorFilter,
        /// Pixel sampling: Nearest, Mean or Lightest.
        #[arg(long, default_value = "Mean")]
        pixel_mode: PixelMode,
        /// PNG output file.
        #[arg(long)]
        out: PathBuf,
        /// Also convert to this KAP file.
        #[arg(long)]
        kap: Option<PathBuf>,
        /// imgkap executable.
        #[arg(long, default_value = IMGKAP_PROGRAM)]
        imgkap: PathBuf,
    },
}

/// `--log-level`, then `RUST_LOG`, then `info`.
fn env_filter(level: Option<&str>) -> EnvFilter {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    };
    filter.unwrap_or_else(|| EnvFilter::new("info"))
}

fn init_tracing(level: Option<&str>) {
    tracing_subscriber::fmt().with_env_filter(env_filter(level)).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());
    orto_metrics::describe_metrics();

    #[cfg(feature = "prometheus")]
    {
        if let Some(addr) = cli.metrics_addr {
            if let Err(error) = orto_metrics::install_prometheus_exporter(addr) {
                tracing::error!(%error, "Failed to start metrics exporter");
                return ExitCode::FAILURE;
            }
            tracing::info!(%addr, "Serving metrics");
        }
    }

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            tracing::warn!("Finished with failures, see the log above");
            ExitCode::from(2)
        }
        Err(RunnerError::Cancelled) => {
            tracing::warn!("Cancelled");
            ExitCode::from(130)
        }
        Err(error) => {
            tracing::error!(%error, "ortocharter failed");
            ExitCode::FAILURE
        }
    }
}

/// Run a command. `Ok(false)` means it finished with per-tile or per-chart failures.
fn run(command: Command) -> Result<bool> {
    match command {
        Command::Run { jobs, offline, json } => {
            let mut config = RunConfig::from_yaml_file(&jobs)?;
            if offline {
                config.download.enabled = false;
            }
            let runner = JobRunner::new(config).with_cancel_flag(CancelFlag::install_ctrlc_handler()?);
            let summary = runner.run()?;
            if json {
                println!("{}", summary.to_json()?);
            }
            Ok(!summary.has_failures())
        }

        Command::Analyze {
            tile_dir,
            combine_distance,
            gpx,
            overlay,
            detector,
        } => {
            let mut config = RunConfig::new(&tile_dir);
            if let Some(path) = detector {
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| RunnerError::ReadConfig { path, source })?;
                config.detector = serde_yaml::from_str::<DetectorConfig>(&text)?;
            }
            let runner = JobRunner::new(config).with_cancel_flag(CancelFlag::install_ctrlc_handler()?);

            let index = TileIndex::scan(&tile_dir)?;
            let summary = runner.analyze_tiles(index.tiles(), combine_distance, overlay, &gpx)?;
            tracing::info!(
                tiles = summary.tiles_analyzed,
                failed = summary.failed_tiles.len(),
                waypoints = summary.points,
                gpx = %summary.gpx.display(),
                "Analysis finished"
            );
            Ok(summary.failed_tiles.is_empty())
        }

        Command::Chart {
            tile_dir,
            north,
            west,
            south,
            east,
            ppm,
            filter,
            pixel_mode,
            out,
            kap,
            imgkap,
        } => {
            let bounds = GeoBounds::new(north, west, south, east)?;
            let request = ChartRequest {
                bounds,
                options: ChartOptions {
                    pixels_per_meter: ppm,
                    filter,
                    pixel_mode,
                },
            };

            let runner = JobRunner::new(RunConfig::new(&tile_dir))
                .with_cancel_flag(CancelFlag::install_ctrlc_handler()?);
            let tiles = tiles_overlapping(&tile_dir, &GridRegion::bounding(&bounds)?)?;
            let renderer = runner.renderer(tiles)?;

            let raster = runner.render_png(&renderer, &request, &out)?;
            tracing::info!(
                png = %out.display(),
                width = raster.image().width(),
                height = raster.image().height(),
                missing_pixels = raster.missing_pixels(),
                "Chart raster written"
            );

            if let Some(kap) = kap {
                ImgKap::new(imgkap).convert(&out, &bounds, &kap)?;
                tracing::info!(kap = %kap.display(), "Chart converted");
            }
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_overrides_environment() {
        assert_eq!(env_filter(Some("orto_chart=trace")).to_string(), "orto_chart=trace");
    }

    #[test]
    fn test_cli_parses_chart_command() {
        let cli = Cli::try_parse_from([
            "ortocharter",
            "--log-level",
            "debug",
            "chart",
            "tiles",
            "--north",
            "60.66",
            "--west",
            "17.56",
            "--south",
            "60.64",
            "--east",
            "17.6",
            "--filter",
            "subsurface",
            "--out",
            "c.png",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Chart {
                filter, pixel_mode, ..
            } => {
                assert_eq!(filter, ColorFilter::Subsurface);
                assert_eq!(pixel_mode, PixelMode::Mean);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
