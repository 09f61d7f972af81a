//! Tile index built from a folder of grid-named tile images.

use crate::{Tile, TileError, Result};
use orto_geo::GridRegion;
use std::path::{Path, PathBuf};

/// Field separator in tile file names.
const SPLIT_CHAR: char = ',';

/// Extension of source tiles.
const TILE_EXTENSION: &str = "png";

/// Marker in the file name of derived analysis overlays, which are not tiles.
pub const ANALYZED_SUFFIX: &str = "_analyzed";

/// A tile file that was found but could not be indexed.
#[derive(Debug)]
pub struct RejectedTile {
    /// Path of the rejected file.
    pub path: PathBuf,
    /// Why it was rejected.
    pub error: TileError,
}

/// Set of available tiles, indexed by their grid regions.
///
/// Scanning only parses file names; no image data is read.
#[derive(Debug, Default)]
pub struct TileIndex {
    tiles: Vec<Tile>,
    rejected: Vec<RejectedTile>,
}

impl TileIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index all `.png` tiles in a directory.
    ///
    /// Analysis overlays (`*_analyzed.png`) are ignored. Files whose names do
    /// not parse are recorded in [`TileIndex::rejected`] and logged, so one
    /// bad file does not hide the rest of the folder. Tiles are ordered by
    /// file name, which keeps runs reproducible.
    pub fn scan<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || !path.extension().is_some_and(|ext| ext == TILE_EXTENSION) {
                continue;
            }
            if path
                .file_name()
                .and_then(|s| s.to_str())
                .is_some_and(|name| name.contains(ANALYZED_SUFFIX))
            {
                continue;
            }
            paths.push(path);
        }
        paths.sort();

        let mut index = Self::new();
        for path in paths {
            if let Err(error) = index.add_file(&path) {
                tracing::warn!(tile = %path.display(), %error, "Skipping tile");
                index.rejected.push(RejectedTile { path, error });
            }
        }

        tracing::info!(
            dir = %dir.display(),
            tiles = index.tiles.len(),
            rejected = index.rejected.len(),
            "Indexed tiles"
        );
        Ok(index)
    }

    /// Add a single tile file to the index.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let tile = Tile::from_path(path)?;
        self.tiles.push(tile);
        Ok(())
    }

    /// Add an already constructed tile.
    pub fn add_tile(&mut self, tile: Tile) {
        self.tiles.push(tile);
    }

    /// Parse `<west>,<south>,<east>,<north>.png` into a grid region.
    pub fn parse_file_name(name: &str) -> Result<GridRegion> {
        let malformed = || TileError::MalformedTileName(name.to_string());

        let stem = name
            .strip_suffix(TILE_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or_else(malformed)?;

        let parts: Vec<&str> = stem.split(SPLIT_CHAR).collect();
        let [west, south, east, north] = parts.as_slice() else {
            return Err(malformed());
        };

        let parse = |field: &str| field.parse::<i64>().map_err(|_| malformed());
        let (west, south, east, north) = (parse(west)?, parse(south)?, parse(east)?, parse(north)?);

        GridRegion::new(north, south, east, west).map_err(|_| malformed())
    }

    /// File name for a region, the inverse of [`TileIndex::parse_file_name`].
    pub fn file_name(region: &GridRegion) -> String {
        format!(
            "{west}{sep}{south}{sep}{east}{sep}{north}.{ext}",
            west = region.west(),
            south = region.south(),
            east = region.east(),
            north = region.north(),
            sep = SPLIT_CHAR,
            ext = TILE_EXTENSION
        )
    }

    /// Indexed tiles.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Files that were found but could not be indexed.
    pub fn rejected(&self) -> &[RejectedTile] {
        &self.rejected
    }

    /// Number of indexed tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// True if no tiles are indexed.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Region covering all indexed tiles.
    pub fn total_region(&self) -> Option<GridRegion> {
        let first = self.tiles.first()?.region();
        let (mut north, mut south, mut east, mut west) =
            (first.north(), first.south(), first.east(), first.west());

        for tile in &self.tiles[1..] {
            let r = tile.region();
            north = north.max(r.north());
            south = south.min(r.south());
            east = east.max(r.east());
            west = west.min(r.west());
        }

        GridRegion::new(north, south, east, west).ok()
    }
}

impl IntoIterator for TileIndex {
    type Item = Tile;
    type IntoIter = std::vec::IntoIter<Tile>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_name() {
        let region = TileIndex::parse_file_name("643000,6719000,644000,6720000.png").unwrap();
        assert_eq!(region.west(), 643_000);
        assert_eq!(region.south(), 6_719_000);
        assert_eq!(region.east(), 644_000);
        assert_eq!(region.north(), 6_720_000);
    }

    #[test]
    fn test_parse_file_name_rejects_malformed() {
        for name in [
            "643000,6719000,644000.png",
            "643000,6719000,644000,6720000,extra.png",
            "643000,6719000,644000,north.png",
            "643000;6719000;644000;6720000.png",
            "643000,6719000,644000,6720000.jpg",
            "643000,6719000,644000,6720000",
            "644000,6719000,643000,6720000.png", // east < west
            "643000,6720000,644000,6719000.png", // north < south
        ] {
            assert!(
                matches!(TileIndex::parse_file_name(name), Err(TileError::MalformedTileName(_))),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_file_name_round_trip() {
        let region = GridRegion::new(6_720_000, 6_719_000, 644_000, 643_000).unwrap();
        let name = TileIndex::file_name(&region);
        assert_eq!(name, "643000,6719000,644000,6720000.png");
        assert_eq!(TileIndex::parse_file_name(&name).unwrap(), region);
    }

    #[test]
    fn test_total_region() {
        let mut index = TileIndex::new();
        assert!(index.total_region().is_none());

        index.add_file("643000,6719000,644000,6720000.png").unwrap();
        index.add_file("644000,6718000,645000,6719000.png").unwrap();

        let total = index.total_region().unwrap();
        assert_eq!(total, GridRegion::new(6_720_000, 6_718_000, 645_000, 643_000).unwrap());
        assert_eq!(index.len(), 2);
    }
}
