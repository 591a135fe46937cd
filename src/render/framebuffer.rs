//! RGBA accumulation buffer.
//!
//! Each pixel holds premultiplied color sums (R, G, B) and a coverage sum
//! (A). Splats only ever add to it. Readback divides color by coverage,
//! which makes the final color a coverage-weighted average of every splat
//! touching the pixel; pixels no splat reached get a dark gray.

use image::{Rgb, RgbImage};
use nalgebra::Vector3;

use crate::core::color::tone_map_u8;

/// Color of pixels with zero accumulated coverage.
pub const BACKGROUND: f32 = 0.05;

/// Added to coverage before normalizing.
pub const COVERAGE_EPSILON: f32 = 1e-8;

pub struct FrameBuffer {
    width: u32,
    height: u32,
    accum: Vec<[f32; 4]>,
}

impl FrameBuffer {
    /// A zeroed buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            accum: vec![[0.0; 4]; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Raw accumulator `[r, g, b, coverage]`.
    pub fn get(&self, x: u32, y: u32) -> [f32; 4] {
        self.accum[self.index(x, y)]
    }

    pub fn coverage(&self, x: u32, y: u32) -> f32 {
        self.get(x, y)[3]
    }

    /// Add `alpha * color` to the color sums and `alpha` to coverage.
    pub fn accumulate(&mut self, x: u32, y: u32, color: &Vector3<f32>, alpha: f32) {
        let i = self.index(x, y);
        let px = &mut self.accum[i];
        px[0] += alpha * color.x;
        px[1] += alpha * color.y;
        px[2] += alpha * color.z;
        px[3] += alpha;
    }

    /// True when no pixel received any coverage.
    pub fn is_empty(&self) -> bool {
        self.accum.iter().all(|px| px[3] <= 0.0)
    }

    /// Normalized (pre-tone-curve) color of one pixel.
    pub fn resolved_color(&self, x: u32, y: u32) -> Vector3<f32> {
        let [r, g, b, a] = self.get(x, y);
        if a > 0.0 {
            let inv = 1.0 / (a + COVERAGE_EPSILON);
            Vector3::new(r * inv, g * inv, b * inv)
        } else {
            Vector3::new(BACKGROUND, BACKGROUND, BACKGROUND)
        }
    }

    /// Normalize, fill uncovered pixels and tone-map to an 8-bit image.
    ///
    /// Consumes the buffer; it is single-use per render.
    pub fn resolve(self) -> RgbImage {
        let mut img = RgbImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.resolved_color(x, y);
                img.put_pixel(x, y, Rgb([tone_map_u8(c.x), tone_map_u8(c.y), tone_map_u8(c.z)]));
            }
        }
        img
    }
}
