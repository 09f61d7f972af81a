//! Constant-time box averages over a tile.

use image::RgbaImage;
use orto_tiles::Color;

/// Summed-area table of the RGB channels of an image.
///
/// Sums are kept modulo 2^32. A box sum is a difference of four table
/// entries, and every box sum fits in `u32`, so the wrapped arithmetic
/// still yields the exact box sum.
#[derive(Debug)]
pub(crate) struct AreaSampler {
    width: u32,
    height: u32,
    sums: Vec<[u32; 3]>,
}

impl AreaSampler {
    pub(crate) fn new(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let stride = width as usize + 1;
        let mut sums = vec![[0u32; 3]; stride * (height as usize + 1)];

        for y in 0..height as usize {
            let mut row = [0u32; 3];
            for x in 0..width as usize {
                let pixel = image.get_pixel(x as u32, y as u32).0;
                let above = sums[y * stride + x + 1];
                let cell = &mut sums[(y + 1) * stride + x + 1];
                for c in 0..3 {
                    row[c] = row[c].wrapping_add(pixel[c] as u32);
                    cell[c] = above[c].wrapping_add(row[c]);
                }
            }
        }

        Self {
            width,
            height,
            sums,
        }
    }

    /// Mean color of the `(2r + 1)²` box around `(x, y)`, clipped to the image.
    ///
    /// Channels are truncated to integers. A radius of 0 returns the pixel.
    pub(crate) fn mean(&self, x: u32, y: u32, radius: u32) -> Color {
        let x0 = x.saturating_sub(radius) as usize;
        let y0 = y.saturating_sub(radius) as usize;
        let x1 = (x.saturating_add(radius)).min(self.width - 1) as usize + 1;
        let y1 = (y.saturating_add(radius)).min(self.height - 1) as usize + 1;

        let stride = self.width as usize + 1;
        let at = |x: usize, y: usize| self.sums[y * stride + x];
        let (a, b, c, d) = (at(x1, y1), at(x1, y0), at(x0, y1), at(x0, y0));
        let count = ((x1 - x0) * (y1 - y0)) as u32;

        let channel = |i: usize| {
            let sum = a[i].wrapping_sub(b[i]).wrapping_sub(c[i]).wrapping_add(d[i]);
            (sum / count) as u8
        };
        Color::new(channel(0), channel(1), channel(2))
    }
}
