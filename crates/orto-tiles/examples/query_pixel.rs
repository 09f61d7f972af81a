//! Example: Query the orthophoto color at a position.
//!
//! Usage: cargo run --example query_pixel -- <lat> <lon> [tile_dir]

use orto_geo::{sweref99tm, GeodeticCoord};
use orto_tiles::{CacheConfig, TileCache, TileIndex};
use std::env;
use std::time::Instant;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <lat> <lon> [tile_dir]", args[0]);
        eprintln!("Example: {} 60.58 17.65 ./tiles", args[0]);
        std::process::exit(1);
    }

    let lat: f64 = args[1].parse().expect("Invalid latitude");
    let lon: f64 = args[2].parse().expect("Invalid longitude");
    let tile_dir = args.get(3).map(|s| s.as_str()).unwrap_or("tiles");

    println!("Indexing tiles from {}...", tile_dir);
    let start = Instant::now();
    let index = TileIndex::scan(tile_dir).expect("Failed to index tile directory");
    println!("Indexed {} tiles in {:.3}s", index.len(), start.elapsed().as_secs_f64());
    for rejected in index.rejected() {
        println!("  skipped {}: {}", rejected.path.display(), rejected.error);
    }

    if let Some(region) = index.total_region() {
        println!("Coverage: {}", region);
    }

    let cache = TileCache::from_index(index, CacheConfig::default());
    let grid = sweref99tm::geodetic_to_grid(GeodeticCoord::new(lat, lon));
    println!("\nQuerying ({}, {}) -> N {:.2} E {:.2}...", lat, lon, grid.north, grid.east);

    let query_start = Instant::now();
    match cache.get_pixel(grid) {
        Ok(Some(color)) => println!(
            "Color: {:?}, brightness {:.3}, hue {:.1} (loaded in {:.2}s)",
            color,
            color.brightness(),
            color.hue(),
            query_start.elapsed().as_secs_f64()
        ),
        Ok(None) => println!("No tile covers this position"),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    // Second query is served from the decoded buffer.
    let query_start = Instant::now();
    if let Ok(Some(color)) = cache.get_pixel(grid) {
        println!("Color: {:?} (cached: {:.6}s)", color, query_start.elapsed().as_secs_f64());
    }
}
