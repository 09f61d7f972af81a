//! Conversion of chart rasters into georeferenced chart files.

use crate::{ChartError, Result};
use orto_geo::GeoBounds;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Turns a raster plus its corner coordinates into a chart file.
pub trait ChartConverter: Send + Sync {
    /// Convert `raster` covering `bounds` into `output`.
    ///
    /// On failure no partial `output` may be left behind.
    fn convert(&self, raster: &Path, bounds: &GeoBounds, output: &Path) -> Result<()>;
}

/// Default imgkap executable, looked up on `PATH`.
pub const IMGKAP_PROGRAM: &str = "imgkap";

/// BSB/KAP conversion with the external `imgkap` tool.
///
/// Runs `imgkap -j MERCATOR <png> <north> <west> <south> <east> <kap>`.
#[derive(Debug, Clone)]
pub struct ImgKap {
    program: PathBuf,
    projection: String,
}

impl Default for ImgKap {
    fn default() -> Self {
        Self::new(IMGKAP_PROGRAM)
    }
}

impl ImgKap {
    /// Use the given executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            projection: "MERCATOR".to_string(),
        }
    }

    /// The executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command line arguments for one conversion.
    pub fn args(&self, raster: &Path, bounds: &GeoBounds, output: &Path) -> Vec<String> {
        vec![
            "-j".to_string(),
            self.projection.clone(),
            raster.display().to_string(),
            format_degrees(bounds.north),
            format_degrees(bounds.west),
            format_degrees(bounds.south),
            format_degrees(bounds.east),
            output.display().to_string(),
        ]
    }
}

impl ChartConverter for ImgKap {
    fn convert(&self, raster: &Path, bounds: &GeoBounds, output: &Path) -> Result<()> {
        let args = self.args(raster, bounds, output);
        tracing::info!(program = %self.program.display(), args = %args.join(" "), "Running chart converter");

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|source| ChartError::ConverterSpawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            remove_if_exists(output)?;
            tracing::warn!(program = %self.program.display(), %status, kap = %output.display(), "Chart conversion failed");
            return Err(ChartError::ExternalConverter {
                program: self.program.clone(),
                status,
                output: output.to_path_buf(),
            });
        }
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Format degrees with at most ten decimals and no trailing zeros.
pub fn format_degrees(value: f64) -> String {
    let text = format!("{:.10}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// File name of a chart part: `<group>_<north>_<west>_<south>_<east>.kap`.
pub fn chart_file_name(group: &str, bounds: &GeoBounds) -> String {
    format!(
        "{}_{}_{}_{}_{}.kap",
        group,
        format_degrees(bounds.north),
        format_degrees(bounds.west),
        format_degrees(bounds.south),
        format_degrees(bounds.east)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bounds() -> GeoBounds {
        GeoBounds::new(60.66, 17.56, 60.64, 17.6).unwrap()
    }

    #[test]
    fn test_format_degrees() {
        assert_eq!(format_degrees(60.66), "60.66");
        assert_eq!(format_degrees(17.0), "17");
        assert_eq!(format_degrees(60.660000000000004), "60.66");
        assert_eq!(format_degrees(-0.0000000000001), "0");
        assert_eq!(format_degrees(0.123456789012), "0.123456789");
    }

    #[test]
    fn test_chart_file_name() {
        assert_eq!(
            chart_file_name("Kallskar_1_Mean_Natural", &bounds()),
            "Kallskar_1_Mean_Natural_60.66_17.56_60.64_17.6.kap"
        );
    }

    #[test]
    fn test_imgkap_args() {
        let args = ImgKap::default().args(Path::new("a.png"), &bounds(), Path::new("a.kap"));
        assert_eq!(
            args,
            ["-j", "MERCATOR", "a.png", "60.66", "17.56", "60.64", "17.6", "a.kap"]
        );
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let converter = ImgKap::new(dir.path().join("no-such-imgkap"));
        let result = converter.convert(&dir.path().join("a.png"), &bounds(), &dir.path().join("a.kap"));
        assert!(matches!(result, Err(ChartError::ConverterSpawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_conversion_removes_output() {
        let dir = TempDir::new().unwrap();
        let kap = dir.path().join("a.kap");
        std::fs::write(&kap, b"partial").unwrap();

        let result = ImgKap::new("false").convert(&dir.path().join("a.png"), &bounds(), &kap);
        assert!(matches!(result, Err(ChartError::ExternalConverter { .. })));
        assert!(!kap.exists());

        // Nothing to remove is fine too.
        let result = ImgKap::new("false").convert(&dir.path().join("a.png"), &bounds(), &kap);
        assert!(matches!(result, Err(ChartError::ExternalConverter { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_conversion() {
        let dir = TempDir::new().unwrap();
        let kap = dir.path().join("a.kap");
        std::fs::write(&kap, b"chart").unwrap();
        ImgKap::new("true").convert(&dir.path().join("a.png"), &bounds(), &kap).unwrap();
        assert!(kap.exists());
    }
}
