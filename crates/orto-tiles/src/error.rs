//! Error types for the tiles crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when indexing, decoding or downloading tiles.
#[derive(Debug, Error)]
pub enum TileError {
    /// I/O error reading a file or directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File name does not follow `<west>,<south>,<east>,<north>.png`.
    #[error("Malformed tile name: {0}")]
    MalformedTileName(String),

    /// The backing image is missing or cannot be decoded.
    #[error("Failed to decode tile {path}: {source}")]
    Decode {
        /// Tile file path.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// The decoded image does not have the fixed source-tile size.
    #[error("Tile {path} is {width}x{height}, expected {expected_width}x{expected_height}")]
    UnexpectedSize {
        /// Tile file path.
        path: PathBuf,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
        /// Expected width in pixels.
        expected_width: u32,
        /// Expected height in pixels.
        expected_height: u32,
    },

    /// A fully transparent pixel was found, which means truncated imagery.
    #[error("Tile {path} is possibly damaged: transparent pixel at ({x}, {y})")]
    CorruptTile {
        /// Tile file path.
        path: PathBuf,
        /// Pixel column.
        x: u32,
        /// Pixel row.
        y: u32,
    },

    /// Invalid region or coordinate.
    #[error("Geometry error: {0}")]
    Geo(#[from] orto_geo::GeoError),

    /// HTTP request error when fetching tiles.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The map service returned something other than an image.
    #[error("Failed to download tile {region}: {reason}")]
    TileDownloadFailed {
        /// Region of the tile.
        region: String,
        /// Reason for failure.
        reason: String,
    },
}
