//! Job execution: download, analyze, chart.

use crate::{
    AnalysisSummary, CancelFlag, ChartSummary, JobConfig, JobSummary, Result, RunConfig,
    RunSummary, RunnerError,
};
use orto_chart::{
    chart_file_name, BlockProgress, ChartConverter, ChartError, ChartOptions, ChartRaster,
    ChartRenderer, ChartRequest, ImgKap,
};
use orto_geo::{GeoBounds, GridRegion};
use orto_hazard::{gpx, HazardDetector, PointClusterer};
use orto_tiles::{DownloadStats, Tile, TileCache, TileDownloader, TileIndex};
use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

/// Runs jobs against a working directory.
///
/// Tiles live in `<work_dir>/Download`, charts in
/// `<work_dir>/Charts/<group>/` and waypoints in the job's GPX file under
/// `<work_dir>`. Existing tiles and charts are reused, so an interrupted run
/// can simply be started again.
pub struct JobRunner {
    config: RunConfig,
    cancel: CancelFlag,
    converter: Box<dyn ChartConverter>,
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("config", &self.config)
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl JobRunner {
    /// Create a runner converting charts with the configured imgkap.
    pub fn new(config: RunConfig) -> Self {
        let converter = Box::new(ImgKap::new(config.converter.program.clone()));
        Self {
            config,
            cancel: CancelFlag::new(),
            converter,
        }
    }

    /// Stop when this flag is set.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Use another chart converter.
    pub fn with_converter(mut self, converter: Box<dyn ChartConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every job in order. The first failing job ends the run.
    pub fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for job in &self.config.jobs {
            summary.jobs.push(self.run_job(job)?);
        }
        Ok(summary)
    }

    /// Run one job.
    pub fn run_job(&self, job: &JobConfig) -> Result<JobSummary> {
        job.validate()?;
        let area = job.aligned_bounds()?;
        let region = GridRegion::bounding(&area)?;
        tracing::info!(job = %job.name, ?area, %region, "Running job");

        let tile_dir = self.config.tile_dir();
        fs::create_dir_all(&tile_dir)?;
        let download = if self.config.download.enabled {
            Some(self.download(&region, &tile_dir)?)
        } else {
            None
        };
        self.check_cancelled()?;

        let tiles = tiles_overlapping(&tile_dir, &region)?;
        if tiles.is_empty() {
            tracing::warn!(job = %job.name, dir = %tile_dir.display(), "No source tiles cover the job area");
        }

        let analysis = if job.analyze {
            let gpx_path = self.config.work_dir.join(&job.gpx_file);
            Some(self.analyze_tiles(&tiles, job.combine_distance_m, job.write_overlay, &gpx_path)?)
        } else {
            None
        };

        let tile_count = tiles.len();
        let charts = match &job.charts {
            Some(options) => Some(self.build_charts(job, options, &area, tiles)?),
            None => None,
        };

        Ok(JobSummary {
            name: job.name.clone(),
            area,
            tiles: tile_count,
            download,
            analysis,
            charts,
        })
    }

    fn download(&self, region: &GridRegion, tile_dir: &Path) -> Result<DownloadStats> {
        let downloader = TileDownloader::with_url(self.config.download.url.as_str())?
            .with_layers(self.config.download.layers.as_str());
        Ok(downloader.download(region, tile_dir)?)
    }

    /// Detect hazards in `tiles`, merge them and write waypoints to `gpx_path`.
    ///
    /// Tiles that fail are reported in the summary and do not stop the others.
    pub fn analyze_tiles(
        &self,
        tiles: &[Tile],
        combine_distance_m: f64,
        write_overlay: bool,
        gpx_path: &Path,
    ) -> Result<AnalysisSummary> {
        let detector = HazardDetector::new(self.config.detector.clone())?.with_overlay(write_overlay);
        let clusterer = PointClusterer::new(combine_distance_m)?;

        let cancel = &self.cancel;
        let report = detector.detect_batch(tiles, || cancel.is_cancelled());
        if report.cancelled {
            return Err(RunnerError::Cancelled);
        }

        let points = clusterer.combine(&report.points);
        if let Some(parent) = gpx_path.parent() {
            fs::create_dir_all(parent)?;
        }
        gpx::write_hazards_gpx(gpx_path, &points)?;

        Ok(AnalysisSummary {
            tiles_analyzed: report.tiles_analyzed,
            failed_tiles: report.failures.into_iter().map(|f| f.tile).collect(),
            raw_points: report.points.len(),
            points: points.len(),
            gpx: gpx_path.to_path_buf(),
        })
    }

    /// A chart renderer over `tiles` with the configured cache and settings.
    pub fn renderer<I: IntoIterator<Item = Tile>>(&self, tiles: I) -> Result<ChartRenderer> {
        let mut cache = TileCache::new(self.config.cache);
        for tile in tiles {
            cache.register(tile);
        }
        Ok(ChartRenderer::new(cache, self.config.render)?)
    }

    /// Render every part of `area` that has no chart yet.
    fn build_charts(
        &self,
        job: &JobConfig,
        options: &ChartOptions,
        area: &GeoBounds,
        tiles: Vec<Tile>,
    ) -> Result<ChartSummary> {
        let group = options.group_name(&job.name);
        let dir = self.config.chart_dir().join(&group);
        fs::create_dir_all(&dir)?;
        tracing::info!(group = %group, dir = %dir.display(), "Creating chart group");

        let renderer = self.renderer(tiles)?;
        let mut summary = ChartSummary {
            group,
            dir,
            ..Default::default()
        };

        for part in area.parts(job.part_lat, job.part_lon) {
            self.check_cancelled()?;

            let kap = summary.dir.join(chart_file_name(&summary.group, &part));
            if kap.exists() {
                tracing::debug!(kap = %kap.display(), "Chart exists, skipping");
                summary.skipped += 1;
                continue;
            }

            let request = ChartRequest {
                bounds: part,
                options: *options,
            };
            match self.build_chart(&renderer, &request, &kap) {
                Ok(()) => summary.built += 1,
                Err(RunnerError::Chart(ChartError::EmptyChart { .. })) => {
                    tracing::warn!(kap = %kap.display(), "Chart part too small, skipping");
                    summary.empty += 1;
                }
                Err(RunnerError::Chart(error @ ChartError::ExternalConverter { .. })) => {
                    tracing::error!(%error, "Chart conversion failed");
                    summary.failed.push(kap);
                }
                // A bad source tile only costs the parts that sample it.
                Err(RunnerError::Chart(ChartError::Tile(error))) => {
                    tracing::warn!(kap = %kap.display(), %error, "Chart part skipped, source tile unreadable");
                    summary.failed.push(kap);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            group = %summary.group,
            built = summary.built,
            skipped = summary.skipped,
            failed = summary.failed.len(),
            "Chart group finished"
        );
        Ok(summary)
    }

    /// Render one chart and convert it to `kap`.
    ///
    /// The raster is written next to the chart as `<kap>.png` and removed
    /// after a successful conversion unless intermediates are kept.
    pub fn build_chart(&self, renderer: &ChartRenderer, request: &ChartRequest, kap: &Path) -> Result<()> {
        tracing::info!(kap = %kap.display(), "Building chart");
        let png = intermediate_path(kap);
        self.render_png(renderer, request, &png)?;

        self.converter.convert(&png, &request.bounds, kap)?;
        if !self.config.converter.keep_intermediate {
            fs::remove_file(&png)?;
        }
        Ok(())
    }

    /// Render one chart raster to a PNG file.
    pub fn render_png(&self, renderer: &ChartRenderer, request: &ChartRequest, png: &Path) -> Result<ChartRaster> {
        let cancel = &self.cancel;
        let raster = renderer
            .render_with(request, |progress| {
                log_memory(progress);
                if cancel.is_cancelled() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .map_err(|e| match e {
                ChartError::Cancelled => RunnerError::Cancelled,
                e => e.into(),
            })?;
        raster.write_png(png)?;
        Ok(raster)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }
        Ok(())
    }
}

/// Tiles in `dir` overlapping `region`.
pub fn tiles_overlapping(dir: &Path, region: &GridRegion) -> Result<Vec<Tile>> {
    let index = TileIndex::scan(dir)?;
    Ok(index
        .into_iter()
        .filter(|tile| tile.region().intersects(region))
        .collect())
}

/// `<kap>.png`
fn intermediate_path(kap: &Path) -> PathBuf {
    let mut name = kap.as_os_str().to_owned();
    name.push(".png");
    PathBuf::from(name)
}

fn log_memory(progress: &BlockProgress) {
    let resident_mb = memory_stats::memory_stats()
        .map(|stats| stats.physical_mem / (1024 * 1024))
        .unwrap_or(0);
    tracing::debug!(
        block = progress.index + 1,
        total = progress.total,
        resident_mb,
        "Chart block done"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intermediate_path() {
        assert_eq!(
            intermediate_path(Path::new("/c/East_1_Mean_Natural_60.66_17.56_60.64_17.6.kap")),
            PathBuf::from("/c/East_1_Mean_Natural_60.66_17.56_60.64_17.6.kap.png")
        );
    }

    #[test]
    fn test_cancelled_runner_stops_before_work() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = RunConfig::new(dir.path());
        config.download.enabled = false;

        let cancel = CancelFlag::new();
        cancel.cancel();
        let runner = JobRunner::new(config).with_cancel_flag(cancel);

        let job = JobConfig::new(
            "a",
            orto_geo::GeodeticCoord::new(60.01, 17.0),
            orto_geo::GeodeticCoord::new(60.0, 17.02),
        );
        assert!(matches!(runner.run_job(&job), Err(RunnerError::Cancelled)));
    }
}
