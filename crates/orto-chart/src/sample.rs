//! Sampling of source tiles for one output pixel.

use crate::{PixelMode, Result};
use orto_geo::{sweref99tm, GeodeticCoord, GridCoord};
use orto_tiles::{Color, TileReader};

/// Grid step between area samples in meters (one source pixel at 4 px/m).
pub const AREA_STEP_M: f64 = 0.25;

/// Root-mean-square accumulator over channel values.
#[derive(Debug, Clone, Copy, Default)]
pub struct RmsMean {
    count: u64,
    r: u64,
    g: u64,
    b: u64,
}

impl RmsMean {
    /// Add one sample.
    pub fn push(&mut self, color: Color) {
        self.count += 1;
        self.r += color.r as u64 * color.r as u64;
        self.g += color.g as u64 * color.g as u64;
        self.b += color.b as u64 * color.b as u64;
    }

    /// The mean color, or `None` without samples. The mean square of each
    /// channel is truncated to an integer before the square root.
    pub fn finish(&self) -> Option<Color> {
        if self.count == 0 {
            return None;
        }
        let channel = |sum: u64| ((sum / self.count) as f64).sqrt() as u8;
        Some(Color::new(channel(self.r), channel(self.g), channel(self.b)))
    }
}

impl FromIterator<Color> for RmsMean {
    fn from_iter<I: IntoIterator<Item = Color>>(iter: I) -> Self {
        let mut mean = Self::default();
        for color in iter {
            mean.push(color);
        }
        mean
    }
}

/// Keeps the brightest sample; the first of equally bright samples wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lightest {
    best: Option<(Color, f32)>,
}

impl Lightest {
    /// Add one sample.
    pub fn push(&mut self, color: Color) {
        let brightness = color.brightness();
        match self.best {
            Some((_, best)) if brightness <= best => {}
            _ => self.best = Some((color, brightness)),
        }
    }

    /// The brightest sample, or `None` without samples.
    pub fn finish(&self) -> Option<Color> {
        self.best.map(|(color, _)| color)
    }
}

/// Samples output pixels through a per-worker tile reader.
pub struct PixelSampler<'a> {
    reader: TileReader<'a>,
    mode: PixelMode,
    half_lat: f64,
    half_lon: f64,
}

impl<'a> PixelSampler<'a> {
    /// Create a sampler whose area modes cover `half_lat` × `half_lon`
    /// degrees around each sampled position.
    pub fn new(reader: TileReader<'a>, mode: PixelMode, half_lat: f64, half_lon: f64) -> Self {
        Self {
            reader,
            mode,
            half_lat,
            half_lon,
        }
    }

    /// Sample at a geodetic position. `Ok(None)` means no tile covers it.
    pub fn sample(&mut self, position: GeodeticCoord) -> Result<Option<Color>> {
        match self.mode {
            PixelMode::Nearest => {
                Ok(self.reader.get_pixel(sweref99tm::geodetic_to_grid(position))?)
            }
            PixelMode::Mean => {
                let mut mean = RmsMean::default();
                self.scan_area(position, |c| mean.push(c))?;
                Ok(mean.finish())
            }
            PixelMode::Lightest => {
                let mut lightest = Lightest::default();
                self.scan_area(position, |c| lightest.push(c))?;
                Ok(lightest.finish())
            }
        }
    }

    /// Visit every covered source sample in the grid rectangle spanned by the
    /// north-west and south-east corners of the area around `position`.
    fn scan_area(&mut self, position: GeodeticCoord, mut visit: impl FnMut(Color)) -> Result<()> {
        let north_west = sweref99tm::geodetic_to_grid(GeodeticCoord::new(
            position.lat + self.half_lat,
            position.lon - self.half_lon,
        ));
        let south_east = sweref99tm::geodetic_to_grid(GeodeticCoord::new(
            position.lat - self.half_lat,
            position.lon + self.half_lon,
        ));

        for north in steps(south_east.north, north_west.north) {
            for east in steps(north_west.east, south_east.east) {
                if let Some(color) = self.reader.get_pixel(GridCoord::new(north, east))? {
                    visit(color);
                }
            }
        }
        Ok(())
    }
}

/// `low, low + step, ...` up to and including `high`. Empty when `high < low`.
fn steps(low: f64, high: f64) -> impl Iterator<Item = f64> {
    let count = if high >= low {
        ((high - low) / AREA_STEP_M).floor() as u64 + 1
    } else {
        0
    };
    (0..count).map(move |i| low + i as f64 * AREA_STEP_M)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_black_and_white() {
        let black = Color::new(0, 0, 0);
        let white = Color::new(255, 255, 255);
        let mean: RmsMean = [black, white, black, white].into_iter().collect();
        let color = mean.finish().unwrap();

        // sqrt(130050 / 4 = 32512) = 180.3, against an arithmetic mean of 127.
        assert_eq!(color, Color::new(180, 180, 180));
        let arithmetic = (255u32 + 255) / 4;
        assert_eq!(color.r as u32 - arithmetic, 53);
    }

    #[test]
    fn test_rms_of_uniform_is_identity() {
        let c = Color::new(12, 130, 255);
        let mean: RmsMean = std::iter::repeat(c).take(9).collect();
        assert_eq!(mean.finish(), Some(c));
        assert_eq!(RmsMean::default().finish(), None);
    }

    #[test]
    fn test_lightest_keeps_first_of_ties() {
        let mut lightest = Lightest::default();
        assert_eq!(lightest.finish(), None);

        lightest.push(Color::new(10, 10, 10));
        lightest.push(Color::new(100, 0, 0)); // brightness 100/510
        lightest.push(Color::new(0, 100, 0)); // same brightness
        lightest.push(Color::new(20, 20, 20));
        assert_eq!(lightest.finish(), Some(Color::new(100, 0, 0)));
    }

    #[test]
    fn test_lightest_accepts_black_first() {
        let mut lightest = Lightest::default();
        lightest.push(Color::new(0, 0, 0));
        assert_eq!(lightest.finish(), Some(Color::new(0, 0, 0)));
    }

    #[test]
    fn test_steps_are_inclusive() {
        let values: Vec<f64> = steps(10.0, 10.5).collect();
        assert_eq!(values, vec![10.0, 10.25, 10.5]);
        assert_eq!(steps(10.0, 10.1).count(), 1);
        assert_eq!(steps(10.0, 9.9).count(), 0);
    }
}
