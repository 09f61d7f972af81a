//! # orto-tiles
//!
//! Grid-aligned orthophoto tiles, addressed by SWEREF 99 TM regions.
//!
//! A tile folder holds PNG files named `<west>,<south>,<east>,<north>.png`.
//! This crate provides:
//!
//! - [`TileIndex`]: scans a folder and parses tile names into regions without
//!   reading any image data.
//! - [`TileCache`]: decodes tiles lazily on first lookup and keeps a bounded
//!   number of decoded buffers resident.
//! - [`TileDownloader`]: fetches missing tiles from a WMS map service.
//!
//! ## Example
//!
//! ```no_run
//! use orto_tiles::{CacheConfig, TileCache, TileIndex};
//! use orto_geo::{sweref99tm, GeodeticCoord};
//!
//! let index = TileIndex::scan("tiles")?;
//! let cache = TileCache::from_index(index, CacheConfig::default());
//!
//! let grid = sweref99tm::geodetic_to_grid(GeodeticCoord::new(60.58, 17.65));
//! match cache.get_pixel(grid)? {
//!     Some(color) => println!("{:?}", color),
//!     None => println!("no tile covers this position"),
//! }
//! # Ok::<(), orto_tiles::TileError>(())
//! ```

mod cache;
mod color;
mod download;
mod error;
mod index;
mod tile;

pub use cache::{CacheConfig, TileCache, TileReader, DEFAULT_CAPACITY};
pub use color::Color;
pub use download::{DownloadStats, TileDownloader, DEFAULT_LAYERS, DEFAULT_WMS_URL};
pub use error::TileError;
pub use index::{RejectedTile, TileIndex, ANALYZED_SUFFIX};
pub use tile::{SizeCheck, Tile, SOURCE_PIXELS_PER_METER};

/// Result type for tile operations.
pub type Result<T> = std::result::Result<T, TileError>;
