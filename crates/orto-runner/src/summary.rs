//! Per-job results, serializable for `--json` output.

use crate::Result;
use orto_geo::GeoBounds;
use orto_tiles::DownloadStats;
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of hazard detection for one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisSummary {
    /// Tiles analyzed successfully.
    pub tiles_analyzed: usize,
    /// Tiles whose hazards are missing because analysis failed.
    pub failed_tiles: Vec<PathBuf>,
    /// Hazard points before merging.
    pub raw_points: usize,
    /// Waypoints written.
    pub points: usize,
    /// Waypoint file.
    pub gpx: PathBuf,
}

/// Outcome of chart generation for one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSummary {
    /// Chart group name.
    pub group: String,
    /// Folder holding the group's charts.
    pub dir: PathBuf,
    /// Charts built in this run.
    pub built: usize,
    /// Charts that already existed.
    pub skipped: usize,
    /// Parts too small for a single pixel.
    pub empty: usize,
    /// Charts that could not be built: an unreadable source tile or a
    /// failed conversion.
    pub failed: Vec<PathBuf>,
}

/// Outcome of one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    /// Job name.
    pub name: String,
    /// The job's area, aligned to whole chart parts.
    pub area: GeoBounds,
    /// Source tiles overlapping the area.
    pub tiles: usize,
    /// Download statistics, when downloading is enabled.
    pub download: Option<DownloadStats>,
    /// Hazard detection results, when requested.
    pub analysis: Option<AnalysisSummary>,
    /// Chart results, when requested.
    pub charts: Option<ChartSummary>,
}

impl JobSummary {
    /// True if any tile or chart failed.
    pub fn has_failures(&self) -> bool {
        self.analysis.as_ref().is_some_and(|a| !a.failed_tiles.is_empty())
            || self.charts.as_ref().is_some_and(|c| !c.failed.is_empty())
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Jobs in run order.
    pub jobs: Vec<JobSummary>,
}

impl RunSummary {
    /// True if any job had failures.
    pub fn has_failures(&self) -> bool {
        self.jobs.iter().any(JobSummary::has_failures)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_and_json() {
        let mut job = JobSummary {
            name: "East".to_string(),
            area: GeoBounds::new(60.66, 17.56, 60.5, 17.8).unwrap(),
            tiles: 12,
            download: None,
            analysis: Some(AnalysisSummary::default()),
            charts: None,
        };
        let mut summary = RunSummary { jobs: vec![job.clone()] };
        assert!(!summary.has_failures());

        job.charts = Some(ChartSummary {
            failed: vec![PathBuf::from("a.kap")],
            ..Default::default()
        });
        summary.jobs.push(job);
        assert!(summary.has_failures());

        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(json["jobs"][0]["name"], "East");
        assert_eq!(json["jobs"][0]["tiles"], 12);
        assert_eq!(json["jobs"][1]["charts"]["failed"][0], "a.kap");
        assert!(json["jobs"][0]["download"].is_null());
    }
}
