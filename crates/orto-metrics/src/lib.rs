//! Metrics infrastructure for the orthophoto pipeline.
//!
//! This crate describes all metrics emitted by the tile cache, the hazard
//! detector and the chart renderer. It re-exports the `metrics` crate for
//! convenience and defines every metric as a structured [`Metric`] constant
//! to avoid typos and keep names, units and labels in one place.
//!
//! Nothing is recorded unless the binary installs a recorder; with no
//! recorder the `metrics` macros are no-ops.
//!
//! # Example
//!
//! ```rust
//! use orto_metrics::{metric_defs, describe_metrics};
//!
//! describe_metrics();
//! metrics::counter!(metric_defs::TILES_DECODED.name).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

/// A metric declaration: name, kind, unit, description and label keys.
///
/// ```rust
/// use orto_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const TILES: Metric = Metric::counter("orto.example.tiles", Unit::Count)
///     .with_description("Tiles seen");
///
/// assert_eq!(TILES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub kind: MetricKind,
    pub unit: Unit,
    pub description: &'static str,
    /// Label keys recorded with the metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    pub const fn counter(name: &'static str, unit: Unit) -> Self {
        Self::of_kind(name, MetricKind::Counter, unit)
    }

    pub const fn gauge(name: &'static str, unit: Unit) -> Self {
        Self::of_kind(name, MetricKind::Gauge, unit)
    }

    pub const fn histogram(name: &'static str, unit: Unit) -> Self {
        Self::of_kind(name, MetricKind::Histogram, unit)
    }

    const fn of_kind(name: &'static str, kind: MetricKind, unit: Unit) -> Self {
        Self {
            name,
            kind,
            unit,
            description: "",
            labels: &[],
        }
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers the description and unit with the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, self.unit, self.description),
            MetricKind::Gauge => describe_gauge!(self.name, self.unit, self.description),
            MetricKind::Histogram => describe_histogram!(self.name, self.unit, self.description),
        }
    }
}

/// All metric definitions for the pipeline.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Tile cache
    // ========================================================================

    /// Source tiles decoded from disk (including re-decodes after eviction).
    pub const TILES_DECODED: Metric = Metric::counter("orto.tiles.decoded", Unit::Count)
        .with_description("Source tiles decoded from disk");

    /// Decoded tile buffers freed by the cache.
    ///
    /// Labels: reason (`lru` or `flush`)
    pub const TILES_EVICTED: Metric = Metric::counter("orto.tiles.evicted", Unit::Count)
        .with_description("Decoded tile buffers freed by the cache")
        .with_labels(&["reason"]);

    /// Wall-clock time to decode one tile.
    pub const TILE_DECODE_TIME: Metric =
        Metric::histogram("orto.tiles.decode_time_us", Unit::Microseconds)
            .with_description("Time to decode one source tile in microseconds");

    /// Number of decoded buffers currently held by the cache.
    pub const CACHE_RESIDENT: Metric = Metric::gauge("orto.cache.resident", Unit::Count)
        .with_description("Decoded tile buffers resident in the cache");

    /// Tiles fetched from the map service.
    pub const TILES_DOWNLOADED: Metric = Metric::counter("orto.tiles.downloaded", Unit::Count)
        .with_description("Source tiles downloaded from the map service");

    // ========================================================================
    // Hazard detection
    // ========================================================================

    /// Hazard points emitted by the detector, before clustering.
    ///
    /// Labels: severity
    pub const HAZARD_POINTS: Metric = Metric::counter("orto.hazard.points", Unit::Count)
        .with_description("Hazard points emitted by the detector")
        .with_labels(&["severity"]);

    /// Components dropped as noise or as land.
    ///
    /// Labels: reason (`small` or `land`)
    pub const HAZARD_COMPONENTS_DISCARDED: Metric =
        Metric::counter("orto.hazard.components_discarded", Unit::Count)
            .with_description("Connected components discarded without a hazard point")
            .with_labels(&["reason"]);

    /// Land blobs reclassified as seagulls or as dangerous land.
    ///
    /// Labels: category
    pub const HAZARD_LAND_RECLASSIFIED: Metric =
        Metric::counter("orto.hazard.land_reclassified", Unit::Count)
            .with_description("Small land blobs reclassified during cleanup")
            .with_labels(&["category"]);

    /// Tiles whose detection failed and produced a partial result.
    pub const HAZARD_TILE_FAILURES: Metric =
        Metric::counter("orto.hazard.tile_failures", Unit::Count)
            .with_description("Tiles whose hazard detection failed");

    // ========================================================================
    // Chart rendering
    // ========================================================================

    /// Output chart pixels sampled.
    pub const CHART_PIXELS_RENDERED: Metric =
        Metric::counter("orto.chart.pixels_rendered", Unit::Count)
            .with_description("Output chart pixels sampled");

    /// Output chart pixels with no source coverage.
    pub const CHART_MISSING_PIXELS: Metric =
        Metric::counter("orto.chart.missing_pixels", Unit::Count)
            .with_description("Output chart pixels without source coverage");

    /// Wall-clock time to render one chart.
    pub const CHART_RENDER_TIME: Metric =
        Metric::histogram("orto.chart.render_time_ms", Unit::Milliseconds)
            .with_description("Time to render one chart raster in milliseconds");

    /// All metric definitions.
    pub const ALL: &[&Metric] = &[
        &TILES_DECODED,
        &TILES_EVICTED,
        &TILE_DECODE_TIME,
        &CACHE_RESIDENT,
        &TILES_DOWNLOADED,
        &HAZARD_POINTS,
        &HAZARD_COMPONENTS_DISCARDED,
        &HAZARD_LAND_RECLASSIFIED,
        &HAZARD_TILE_FAILURES,
        &CHART_PIXELS_RENDERED,
        &CHART_MISSING_PIXELS,
        &CHART_RENDER_TIME,
    ];
}

/// Registers descriptions for all metrics in [`metric_defs::ALL`].
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Installs a Prometheus recorder with an HTTP scrape endpoint.
#[cfg(feature = "prometheus")]
pub fn install_prometheus_exporter(
    addr: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_metrics();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique() {
        let names: HashSet<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), metric_defs::ALL.len());
    }

    #[test]
    fn test_metric_names_are_namespaced() {
        for metric in metric_defs::ALL {
            assert!(metric.name.starts_with("orto."), "{}", metric.name);
            assert!(!metric.description.is_empty(), "{} has no description", metric.name);
        }
    }

    #[test]
    fn test_builder() {
        const M: Metric = Metric::gauge("orto.test.gauge", Unit::Count)
            .with_description("test")
            .with_labels(&["a", "b"]);
        assert_eq!(M.kind, MetricKind::Gauge);
        assert_eq!(M.labels, &["a", "b"]);
        assert_eq!(M.unit, Unit::Count);
    }

    #[test]
    fn test_describe_without_recorder_is_noop() {
        describe_metrics();
    }
}
