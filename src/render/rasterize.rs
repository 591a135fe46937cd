//! Per-splat rasterization.
//!
//! A projected splat is turned into a [`Footprint`] (inverse covariance plus
//! a clipped pixel box) or rejected with a [`SkipReason`]. Footprints are
//! then summed into the frame buffer. A rejected splat contributes nothing
//! and never stops the render.

use nalgebra::Vector3;

use crate::core::ProjectedSplat;
use crate::render::framebuffer::FrameBuffer;

/// Centers farther than this outside the image are rejected outright (pixels).
pub const OFFSCREEN_MARGIN: f32 = 100.0;

/// Footprint radius in standard deviations.
pub const SIGMA_EXTENT: f32 = 3.0;

/// Per-splat radius cap (pixels).
pub const MAX_RADIUS: f32 = 50.0;

/// Splats with a smaller radius are invisible (pixels).
pub const MIN_RADIUS: f32 = 0.5;

/// Gaussian exponent clamp range.
pub const MIN_EXPONENT: f32 = -20.0;
pub const MAX_EXPONENT: f32 = 0.0;

/// Why a projected splat contributed nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Center more than `OFFSCREEN_MARGIN` outside the image.
    OffScreen,
    /// 2D covariance determinant <= 0.
    Degenerate,
    /// Radius below `MIN_RADIUS`.
    TooSmall,
    /// Pixel box empty after clipping to the image.
    EmptyFootprint,
    /// NaN or infinity in the splat or an intermediate value.
    NonFinite,
}

/// Everything needed to splat one ellipse into the frame buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Footprint {
    pub center_x: f32,
    pub center_y: f32,
    pub inv_xx: f32,
    pub inv_xy: f32,
    pub inv_yy: f32,
    pub radius: f32,
    /// Pixel box, half-open: `[min_x, max_x) × [min_y, max_y)`.
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
    pub opacity: f32,
    pub color: Vector3<f32>,
}

impl Footprint {
    /// Gaussian weight at integer pixel `(px, py)`, in `[e^-20, 1]`.
    pub fn weight_at(&self, px: u32, py: u32) -> f32 {
        let dx = px as f32 - self.center_x;
        let dy = py as f32 - self.center_y;
        let exponent = -0.5
            * (self.inv_xx * dx * dx + 2.0 * self.inv_xy * dx * dy + self.inv_yy * dy * dy);
        exponent.clamp(MIN_EXPONENT, MAX_EXPONENT).exp()
    }

    /// Number of pixels in the clipped box.
    pub fn pixel_count(&self) -> usize {
        (self.max_x - self.min_x) as usize * (self.max_y - self.min_y) as usize
    }
}

fn all_finite(splat: &ProjectedSplat) -> bool {
    splat.screen_x.is_finite()
        && splat.screen_y.is_finite()
        && splat.opacity.is_finite()
        && splat.cov2d.iter().all(|v| v.is_finite())
        && splat.color.iter().all(|v| v.is_finite())
}

/// Clip `[center - radius, center + radius]` to `[0, size)`.
///
/// Bounds truncate toward zero; the upper bound is exclusive.
fn clip_span(center: f32, radius: f32, size: u32) -> (u32, u32) {
    let lo = ((center - radius) as i64).max(0);
    let hi = ((center + radius + 1.0) as i64).min(size as i64);
    (lo.clamp(0, size as i64) as u32, hi.max(0) as u32)
}

/// Compute the footprint of one projected splat on a `width × height` image.
pub fn prepare_footprint(
    splat: &ProjectedSplat,
    width: u32,
    height: u32,
) -> Result<Footprint, SkipReason> {
    if !all_finite(splat) {
        return Err(SkipReason::NonFinite);
    }

    let (x, y) = (splat.screen_x, splat.screen_y);
    if x < -OFFSCREEN_MARGIN
        || x > width as f32 + OFFSCREEN_MARGIN
        || y < -OFFSCREEN_MARGIN
        || y > height as f32 + OFFSCREEN_MARGIN
    {
        return Err(SkipReason::OffScreen);
    }

    let det = splat.determinant();
    if !det.is_finite() {
        return Err(SkipReason::NonFinite);
    }
    if det <= 0.0 {
        return Err(SkipReason::Degenerate);
    }

    let lambda_max = splat.max_eigenvalue();
    let extent = SIGMA_EXTENT * lambda_max.sqrt();
    if !extent.is_finite() {
        return Err(SkipReason::NonFinite);
    }
    let radius = extent.min(MAX_RADIUS);
    if radius < MIN_RADIUS {
        return Err(SkipReason::TooSmall);
    }

    let (inv_xx, inv_xy, inv_yy) = splat
        .inverse_covariance()
        .ok_or(SkipReason::Degenerate)?;
    if !(inv_xx.is_finite() && inv_xy.is_finite() && inv_yy.is_finite()) {
        return Err(SkipReason::NonFinite);
    }

    let (min_x, max_x) = clip_span(x, radius, width);
    let (min_y, max_y) = clip_span(y, radius, height);
    if max_x <= min_x || max_y <= min_y {
        return Err(SkipReason::EmptyFootprint);
    }

    Ok(Footprint {
        center_x: x,
        center_y: y,
        inv_xx,
        inv_xy,
        inv_yy,
        radius,
        min_x,
        max_x,
        min_y,
        max_y,
        opacity: splat.opacity,
        color: splat.color,
    })
}

/// Add a footprint's contribution to every pixel of its box.
///
/// Plain summation: `rgb += opacity * w * color`, `coverage += opacity * w`.
pub fn accumulate_footprint(fb: &mut FrameBuffer, footprint: &Footprint) {
    for py in footprint.min_y..footprint.max_y {
        for px in footprint.min_x..footprint.max_x {
            let alpha = footprint.opacity * footprint.weight_at(px, py);
            fb.accumulate(px, py, &footprint.color, alpha);
        }
    }
}

/// Prepare and accumulate one splat.
pub fn rasterize_splat(fb: &mut FrameBuffer, splat: &ProjectedSplat) -> Result<usize, SkipReason> {
    let footprint = prepare_footprint(splat, fb.width(), fb.height())?;
    accumulate_footprint(fb, &footprint);
    Ok(footprint.pixel_count())
}
