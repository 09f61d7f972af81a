//! Orthophoto tile fetcher for a WMS map service.
//!
//! Tiles are requested as `BLOCK_SIZE_M` square blocks in SWEREF 99 TM
//! (EPSG:3006) at [`SOURCE_PIXELS_PER_METER`] pixels per meter and saved under
//! their grid file names. Because regions are block aligned, tiles downloaded
//! for one job are reused by every later job that overlaps them.

use crate::{Result, TileError, TileIndex, SOURCE_PIXELS_PER_METER};
use orto_geo::{GridRegion, BLOCK_SIZE_M};
use orto_metrics::{metric_defs, metrics};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lantmäteriet orthophoto WMS endpoint.
pub const DEFAULT_WMS_URL: &str = "https://minkarta.lantmateriet.se/map/ortofoto/";

/// Layers requested from the default endpoint, coarsest first.
pub const DEFAULT_LAYERS: &str = "Ortofoto_0.5,Ortofoto_0.4,Ortofoto_0.25,Ortofoto_0.16";

/// Statistics for one download run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadStats {
    /// Tiles fetched from the service.
    pub tiles_downloaded: usize,
    /// Tiles already present on disk.
    pub tiles_skipped: usize,
    /// Bytes written.
    pub bytes_downloaded: u64,
}

/// Fetches grid-aligned tiles into a local folder.
pub struct TileDownloader {
    base_url: String,
    layers: String,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for TileDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileDownloader")
            .field("base_url", &self.base_url)
            .field("layers", &self.layers)
            .finish()
    }
}

impl TileDownloader {
    /// Create a downloader for the default service.
    pub fn new() -> Result<Self> {
        Self::with_url(DEFAULT_WMS_URL)
    }

    /// Create a downloader for another WMS endpoint serving the default layers.
    pub fn with_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            layers: DEFAULT_LAYERS.to_string(),
            client,
        })
    }

    /// Override the requested layer list (comma separated).
    pub fn with_layers(mut self, layers: impl Into<String>) -> Self {
        self.layers = layers.into();
        self
    }

    /// GetMap URL for one tile region.
    pub fn tile_url(&self, region: &GridRegion) -> String {
        let width = region.width_m() as u32 * SOURCE_PIXELS_PER_METER;
        let height = region.height_m() as u32 * SOURCE_PIXELS_PER_METER;
        format!(
            "{base}?SERVICE=WMS&VERSION=1.1.1&REQUEST=GetMap&FORMAT=image%2Fpng&TRANSPARENT=false\
             &LAYERS={layers}&TILED=true&STYLES=&SRS=EPSG%3A3006\
             &BBOX={west}%2C{south}%2C{east}%2C{north}&WIDTH={width}&HEIGHT={height}",
            base = self.base_url,
            layers = self.layers.replace(',', "%2C"),
            west = region.west(),
            south = region.south(),
            east = region.east(),
            north = region.north(),
        )
    }

    /// Download every block of `region` (aligned outward) into `dir`.
    ///
    /// Files that already exist are left untouched.
    pub fn download<P: AsRef<Path>>(&self, region: &GridRegion, dir: P) -> Result<DownloadStats> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let aligned = region.aligned(BLOCK_SIZE_M);
        tracing::info!(region = %aligned, dir = %dir.display(), "Downloading region");

        let mut stats = DownloadStats::default();
        for block in aligned.blocks(BLOCK_SIZE_M) {
            let path = dir.join(TileIndex::file_name(&block));
            if path.exists() {
                stats.tiles_skipped += 1;
                continue;
            }

            let bytes = self.download_tile(&block, &path)?;
            stats.tiles_downloaded += 1;
            stats.bytes_downloaded += bytes;
        }

        tracing::info!(
            downloaded = stats.tiles_downloaded,
            skipped = stats.tiles_skipped,
            bytes = stats.bytes_downloaded,
            "Download complete"
        );
        Ok(stats)
    }

    /// Fetch one tile, writing through a temporary file so an interrupted
    /// download never leaves a truncated tile under its final name.
    fn download_tile(&self, region: &GridRegion, path: &Path) -> Result<u64> {
        tracing::debug!(tile = %path.display(), "Downloading tile");
        let response = self.client.get(self.tile_url(region)).send()?;

        if !response.status().is_success() {
            return Err(TileError::TileDownloadFailed {
                region: region.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(TileError::TileDownloadFailed {
                region: region.to_string(),
                reason: format!("unexpected content type '{}'", content_type),
            });
        }

        let bytes = response.bytes()?;
        let partial = partial_path(path);
        fs::write(&partial, &bytes)?;
        fs::rename(&partial, path)?;

        metrics::counter!(metric_defs::TILES_DOWNLOADED.name).increment(1);
        Ok(bytes.len() as u64)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
