//! Detector thresholds.

use crate::{HazardError, Result};
use orto_tiles::{Color, SizeCheck};
use serde::{Deserialize, Serialize};

/// Every tunable of the hazard detector.
///
/// The defaults are the reference threshold set, tuned on 0.25 m/pixel
/// orthophotos of the Swedish coast. Brightness values are HSL lightness in
/// `0.0..=1.0`, hues are degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// A raw pixel at least this bright is land.
    pub land_brightness: f32,
    /// Radius of the neighbourhood averaged for hue and local brightness.
    pub small_sample_radius: u32,
    /// Radius of the surrounding area the local brightness is compared to.
    pub large_sample_radius: u32,
    /// Local/surrounding brightness ratio above which a pixel is a weak hazard.
    pub brightness_factor_low: f32,
    /// Local/surrounding brightness ratio above which a pixel is a strong hazard.
    pub brightness_factor_high: f32,
    /// Hazard components smaller than this many pixels are noise.
    pub min_danger_size: usize,
    /// The small sample's red channel must exceed this for a hazard.
    pub min_red_for_danger: u8,
    /// The small sample's hue must be below this for a hazard.
    pub max_hue_for_danger: f32,
    /// Hue below this marks a low-confidence shallow area.
    pub hue_danger_area_low_max: f32,
    /// Hue below this marks a high-confidence shallow area.
    pub hue_danger_area_high_max: f32,
    /// Land components up to this size, surrounded only by unclassified
    /// water, are birds or glare.
    pub seagull_max_size: usize,
    /// Land components up to this size are reported as emergent rocks.
    pub dangerous_land_max_size: usize,
    /// Pixels painted with this color were marked safe by hand.
    pub safe_marker: Color,
    /// Dimension check for source tiles.
    pub size_check: SizeCheck,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            land_brightness: 0.37,
            small_sample_radius: 2,
            large_sample_radius: 10,
            brightness_factor_low: 1.05,
            brightness_factor_high: 1.08,
            min_danger_size: 2,
            min_red_for_danger: 31,
            max_hue_for_danger: 195.0,
            hue_danger_area_low_max: 170.0,
            hue_danger_area_high_max: 130.0,
            seagull_max_size: 40,
            dangerous_land_max_size: 1600,
            safe_marker: Color::new(255, 0, 255),
            size_check: SizeCheck::FixedScale,
        }
    }
}

impl DetectorConfig {
    /// Check that thresholds are ordered consistently.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(HazardError::InvalidConfig(msg.to_string()));

        if !(0.0..=1.0).contains(&self.land_brightness) {
            return fail("land_brightness must be within 0..=1");
        }
        if self.small_sample_radius > self.large_sample_radius {
            return fail("small_sample_radius must not exceed large_sample_radius");
        }
        if self.brightness_factor_low > self.brightness_factor_high {
            return fail("brightness_factor_low must not exceed brightness_factor_high");
        }
        if self.hue_danger_area_high_max > self.hue_danger_area_low_max {
            return fail("hue_danger_area_high_max must not exceed hue_danger_area_low_max");
        }
        if self.seagull_max_size > self.dangerous_land_max_size {
            return fail("seagull_max_size must not exceed dangerous_land_max_size");
        }
        if self.min_danger_size == 0 {
            return fail("min_danger_size must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        DetectorConfig::default().validate().unwrap();
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let config = DetectorConfig {
            brightness_factor_low: 1.2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(HazardError::InvalidConfig(_))));

        let config = DetectorConfig {
            small_sample_radius: 11,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: DetectorConfig = serde_yaml::from_str("land_brightness: 0.4\nseagull_max_size: 20\n").unwrap();
        assert_eq!(config.land_brightness, 0.4);
        assert_eq!(config.seagull_max_size, 20);
        assert_eq!(config.large_sample_radius, 10);
        assert_eq!(config.safe_marker, Color::new(255, 0, 255));
    }
}
