//! Per-pixel color filters.

use crate::ColorFilter;
use orto_tiles::Color;

/// Boosted red below this is treated as safe water by [`ColorFilter::Subsurface2`].
const SAFE_RED_CUTOFF: u8 = 50;

impl ColorFilter {
    /// Channel floor and step of the posterization pass.
    fn posterize_levels(self) -> (u8, u8) {
        match self {
            ColorFilter::Natural => (0, 3),
            ColorFilter::Subsurface | ColorFilter::Subsurface2 => (80, 8),
        }
    }

    /// Filter one sampled color.
    pub fn apply(self, color: Color) -> Color {
        let color = match self {
            ColorFilter::Natural => color,
            ColorFilter::Subsurface | ColorFilter::Subsurface2 => {
                let boosted = Color::new(
                    scale(color.r, 2.5),
                    scale(color.g, 1.5),
                    scale(color.b, 0.5),
                );
                if self == ColorFilter::Subsurface2 && boosted.r < SAFE_RED_CUTOFF {
                    Color::new(0, 0, 0)
                } else {
                    boosted
                }
            }
        };

        let (floor, step) = self.posterize_levels();
        posterize(color, floor, step)
    }
}

/// Scale a channel, rounding half to even and saturating.
fn scale(channel: u8, factor: f64) -> u8 {
    (channel as f64 * factor).round_ties_even().clamp(0.0, 255.0) as u8
}

/// Reduce the palette of light pixels: when every channel exceeds `floor`,
/// round each channel down to a multiple of `step`.
pub fn posterize(color: Color, floor: u8, step: u8) -> Color {
    if step <= 1 || color.r <= floor || color.g <= floor || color.b <= floor {
        return color;
    }
    Color::new(
        color.r - color.r % step,
        color.g - color.g % step,
        color.b - color.b % step,
    )
}
