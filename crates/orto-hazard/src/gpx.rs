//! GPX 1.1 waypoint export.

use crate::{HazardPoint, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Symbol used for detected hazards, understood by common chart plotters.
pub const HAZARD_SYMBOL: &str = "Hazard-Rock-Awash";

const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

/// A single GPX waypoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Optional display name.
    pub name: Option<String>,
    /// Optional map symbol.
    pub symbol: Option<String>,
}

impl From<&HazardPoint> for Waypoint {
    fn from(point: &HazardPoint) -> Self {
        Self {
            lat: point.position.lat,
            lon: point.position.lon,
            name: None,
            symbol: Some(HAZARD_SYMBOL.to_string()),
        }
    }
}

/// Write waypoints as a GPX document.
pub fn write_gpx<W: Write>(mut out: W, waypoints: &[Waypoint]) -> std::io::Result<()> {
    writeln!(out, r#"<?xml version="1.0" encoding="utf-8"?>"#)?;
    writeln!(out, r#"<gpx xmlns="{}" version="1.1" creator="ortocharter">"#, GPX_NAMESPACE)?;
    for wpt in waypoints {
        writeln!(out, r#"  <wpt lat="{}" lon="{}">"#, wpt.lat, wpt.lon)?;
        if let Some(name) = &wpt.name {
            writeln!(out, "    <name>{}</name>", escape(name))?;
        }
        if let Some(symbol) = &wpt.symbol {
            writeln!(out, "    <sym>{}</sym>", escape(symbol))?;
        }
        writeln!(out, "    <type>WPT</type>")?;
        writeln!(out, "  </wpt>")?;
    }
    writeln!(out, "</gpx>")?;
    out.flush()
}

/// Write hazard points to a GPX file.
pub fn write_hazards_gpx<P: AsRef<Path>>(path: P, points: &[HazardPoint]) -> Result<()> {
    let path = path.as_ref();
    let waypoints: Vec<Waypoint> = points.iter().map(Waypoint::from).collect();
    write_gpx(BufWriter::new(File::create(path)?), &waypoints)?;
    tracing::info!(gpx = %path.display(), waypoints = waypoints.len(), "Wrote waypoints");
    Ok(())
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
