//! Bounded cache of decoded tile buffers with lazy decoding.

use crate::{Color, Result, SizeCheck, Tile, TileIndex};
use image::RgbaImage;
use orto_geo::GridCoord;
use orto_metrics::{metric_defs, metrics};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default maximum number of decoded buffers kept resident.
pub const DEFAULT_CAPACITY: usize = 16;

/// Sentinel for "no last match".
const NO_MATCH: usize = usize::MAX;

/// Cache sizing and decode options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of resident decoded buffers. `None` means unbounded,
    /// which is only sensible when the caller flushes with
    /// [`TileCache::evict_all`] between work partitions.
    pub capacity: Option<usize>,
    /// Dimension check applied on decode.
    pub size_check: SizeCheck,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: Some(DEFAULT_CAPACITY),
            size_check: SizeCheck::FixedScale,
        }
    }
}

impl CacheConfig {
    /// Unbounded residency, for partitioned render workloads.
    pub fn unbounded(size_check: SizeCheck) -> Self {
        Self {
            capacity: None,
            size_check,
        }
    }
}

/// Residency state of one registered tile.
#[derive(Debug, Clone, Default)]
enum TileState {
    #[default]
    Unloaded,
    Loaded(Arc<RgbaImage>),
}

/// Mutable part of the cache, guarded by a single lock.
#[derive(Debug, Default)]
struct Slots {
    states: Vec<TileState>,
    /// Loaded tile indices, least recently used first.
    access_order: Vec<usize>,
}

impl Slots {
    fn touch(&mut self, idx: usize) {
        if let Some(pos) = self.access_order.iter().position(|&i| i == idx) {
            self.access_order.remove(pos);
            self.access_order.push(idx);
        }
    }

    fn free(&mut self, idx: usize) {
        self.states[idx] = TileState::Unloaded;
    }
}

/// Lazily decoded tile buffers for a set of registered tiles.
///
/// Lookups go through [`TileCache::get_pixel`], which finds the tile covering a
/// grid coordinate, decodes it if necessary and reads the pixel. The region of
/// the previous hit is tested first, since raster scans hit the same tile many
/// times in a row.
///
/// The cache is shared between worker threads. Decoding happens outside the
/// lock. Buffers are handed out as `Arc`s, so a buffer that is evicted while a
/// worker still reads from it stays alive until that worker drops it.
///
/// # Example
///
/// ```no_run
/// use orto_tiles::{CacheConfig, TileCache, TileIndex};
/// use orto_geo::GridCoord;
///
/// let index = TileIndex::scan("tiles")?;
/// let cache = TileCache::from_index(index, CacheConfig::default());
///
/// if let Some(color) = cache.get_pixel(GridCoord::new(6_719_500.0, 643_500.0))? {
///     println!("brightness {}", color.brightness());
/// }
/// # Ok::<(), orto_tiles::TileError>(())
/// ```
#[derive(Debug)]
pub struct TileCache {
    tiles: Vec<Tile>,
    config: CacheConfig,
    slots: Mutex<Slots>,
    last_match: AtomicUsize,
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl TileCache {
    /// Create an empty cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            tiles: Vec::new(),
            config,
            slots: Mutex::new(Slots::default()),
            last_match: AtomicUsize::new(NO_MATCH),
        }
    }

    /// Create a cache holding every tile of an index.
    pub fn from_index(index: TileIndex, config: CacheConfig) -> Self {
        let mut cache = Self::new(config);
        for tile in index {
            cache.register(tile);
        }
        cache
    }

    /// Register a tile. Nothing is decoded until the tile is first hit.
    pub fn register(&mut self, tile: Tile) {
        self.tiles.push(tile);
        self.slots.get_mut().states.push(TileState::Unloaded);
    }

    /// Registered tiles.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Index of the tile whose region contains `coord`.
    fn find(&self, coord: GridCoord) -> Option<usize> {
        let hint = self.last_match.load(Ordering::Relaxed);
        if let Some(tile) = self.tiles.get(hint) {
            if tile.region().contains(coord) {
                return Some(hint);
            }
        }

        let idx = self
            .tiles
            .iter()
            .position(|tile| tile.region().contains(coord))?;
        self.last_match.store(idx, Ordering::Relaxed);
        Some(idx)
    }

    /// The tile covering a coordinate, if any.
    pub fn tile_at(&self, coord: GridCoord) -> Option<&Tile> {
        self.find(coord).map(|idx| &self.tiles[idx])
    }

    /// Color at a grid coordinate.
    ///
    /// Returns `Ok(None)` when no registered tile covers the coordinate.
    /// Decode failures and transparent (truncated) pixels are errors.
    pub fn get_pixel(&self, coord: GridCoord) -> Result<Option<Color>> {
        let Some(idx) = self.find(coord) else {
            return Ok(None);
        };
        let buffer = self.buffer(idx)?;
        self.tiles[idx].pixel(&buffer, coord).map(Some)
    }

    /// Decoded buffer for a registered tile, loading it if needed.
    fn buffer(&self, idx: usize) -> Result<Arc<RgbaImage>> {
        {
            let mut slots = self.slots.lock();
            if let TileState::Loaded(buffer) = &slots.states[idx] {
                let buffer = Arc::clone(buffer);
                slots.touch(idx);
                return Ok(buffer);
            }
        }

        let decoded = Arc::new(self.tiles[idx].decode(self.config.size_check)?);

        let mut slots = self.slots.lock();
        // Another worker may have decoded the same tile meanwhile.
        if let TileState::Loaded(buffer) = &slots.states[idx] {
            let buffer = Arc::clone(buffer);
            slots.touch(idx);
            return Ok(buffer);
        }

        if let Some(capacity) = self.config.capacity {
            while slots.access_order.len() >= capacity.max(1) {
                let oldest = slots.access_order.remove(0);
                slots.free(oldest);
                tracing::debug!(tile = %self.tiles[oldest].path().display(), "Freeing image");
                metrics::counter!(metric_defs::TILES_EVICTED.name, "reason" => "lru").increment(1);
            }
        }

        slots.states[idx] = TileState::Loaded(Arc::clone(&decoded));
        slots.access_order.push(idx);
        metrics::gauge!(metric_defs::CACHE_RESIDENT.name).set(slots.access_order.len() as f64);

        Ok(decoded)
    }

    /// Free every decoded buffer. Tiles stay registered and are decoded again
    /// on their next hit.
    pub fn evict_all(&self) {
        let mut slots = self.slots.lock();
        let evicted = slots.access_order.len();
        for idx in std::mem::take(&mut slots.access_order) {
            slots.free(idx);
        }

        if evicted > 0 {
            tracing::debug!(evicted, "Flushed tile cache");
            metrics::counter!(metric_defs::TILES_EVICTED.name, "reason" => "flush")
                .increment(evicted as u64);
        }
        metrics::gauge!(metric_defs::CACHE_RESIDENT.name).set(0.0);
    }

    /// Number of decoded buffers currently resident.
    pub fn resident_count(&self) -> usize {
        self.slots.lock().access_order.len()
    }

    /// True if the tile covering `coord` is currently decoded.
    pub fn is_resident(&self, coord: GridCoord) -> bool {
        let Some(idx) = self.find(coord) else {
            return false;
        };
        matches!(self.slots.lock().states[idx], TileState::Loaded(_))
    }

    /// A per-worker reader that keeps the last tile's buffer at hand.
    pub fn reader(&self) -> TileReader<'_> {
        TileReader {
            cache: self,
            current: None,
        }
    }
}

/// Per-worker view of a [`TileCache`].
///
/// Consecutive lookups inside the same tile are served from the reader's own
/// buffer handle without taking the cache lock. The handle keeps the buffer
/// alive even if the cache evicts it, so readers should be short-lived (one
/// raster row, for example).
#[derive(Debug)]
pub struct TileReader<'a> {
    cache: &'a TileCache,
    current: Option<(usize, Arc<RgbaImage>)>,
}

impl TileReader<'_> {
    /// Color at a grid coordinate, see [`TileCache::get_pixel`].
    pub fn get_pixel(&mut self, coord: GridCoord) -> Result<Option<Color>> {
        if let Some((idx, buffer)) = &self.current {
            let tile = &self.cache.tiles[*idx];
            if tile.region().contains(coord) {
                return tile.pixel(buffer, coord).map(Some);
            }
        }

        let Some(idx) = self.cache.find(coord) else {
            return Ok(None);
        };
        let buffer = self.cache.buffer(idx)?;
        let color = self.cache.tiles[idx].pixel(&buffer, coord)?;
        self.current = Some((idx, buffer));
        Ok(Some(color))
    }
}
