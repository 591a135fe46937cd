//! Thumbnail renderer: the whole CPU pipeline behind one call.
//!
//! splat store (opacity cap) → projector → depth sequencer → rasterizer
//! → frame buffer readback.
//!
//! The render itself cannot fail. Culled and skipped splats are counted in
//! [`RenderStats`]; a scene with nothing visible yields an all-background
//! image.

use image::RgbImage;

use crate::core::{Camera, SplatCloud};
use crate::render::framebuffer::FrameBuffer;
use crate::render::project::project_splats;
use crate::render::rasterize::{rasterize_splat, SkipReason};
use crate::render::sort::sort_back_to_front;

/// Default splat cap, matching the thumbnail tool's density limit.
pub const DEFAULT_MAX_SPLATS: usize = 200_000;

/// Per-render counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Splats in the input cloud.
    pub input: usize,
    /// Splats left after the opacity cap.
    pub kept: usize,
    pub malformed: usize,
    pub near_culled: usize,
    /// Splats that survived projection.
    pub visible: usize,
    pub off_screen: usize,
    pub degenerate: usize,
    pub too_small: usize,
    pub empty_footprint: usize,
    pub non_finite: usize,
    /// Splats that wrote to the frame buffer.
    pub rasterized: usize,
    /// Total pixel writes.
    pub pixels_touched: usize,
}

impl RenderStats {
    pub fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::OffScreen => self.off_screen += 1,
            SkipReason::Degenerate => self.degenerate += 1,
            SkipReason::TooSmall => self.too_small += 1,
            SkipReason::EmptyFootprint => self.empty_footprint += 1,
            SkipReason::NonFinite => self.non_finite += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.off_screen + self.degenerate + self.too_small + self.empty_footprint + self.non_finite
    }

    /// No splat survived projection.
    pub fn nothing_visible(&self) -> bool {
        self.visible == 0
    }
}

/// Run the pipeline up to (not including) readback.
///
/// Exposed so callers and tests can inspect raw coverage.
pub fn render_frame(cloud: &SplatCloud, camera: &Camera, max_splats: usize) -> (FrameBuffer, RenderStats) {
    let mut stats = RenderStats {
        input: cloud.len(),
        ..Default::default()
    };
    let mut fb = FrameBuffer::new(camera.width, camera.height);

    let kept = cloud.opacity_ranked_indices(max_splats);
    stats.kept = kept.len();

    let Some(view) = camera.view() else {
        tracing::warn!("camera look direction is degenerate; rendering background only");
        return (fb, stats);
    };

    let mut projection = project_splats(kept.iter().map(|&i| (i, &cloud.splats[i])), &view);
    stats.malformed = projection.malformed;
    stats.near_culled = projection.near_culled;
    stats.visible = projection.visible.len();

    if projection.nothing_visible() {
        tracing::debug!(
            near_culled = stats.near_culled,
            malformed = stats.malformed,
            "no visible splats"
        );
        return (fb, stats);
    }

    sort_back_to_front(&mut projection.visible);

    for splat in &projection.visible {
        match rasterize_splat(&mut fb, splat) {
            Ok(pixels) => {
                stats.rasterized += 1;
                stats.pixels_touched += pixels;
            }
            Err(reason) => stats.record_skip(reason),
        }
    }

    tracing::debug!(
        input = stats.input,
        kept = stats.kept,
        visible = stats.visible,
        rasterized = stats.rasterized,
        skipped = stats.skipped(),
        "rasterized frame"
    );

    (fb, stats)
}

/// CPU thumbnail renderer.
///
/// Holds only the splat cap; the camera is passed per call so batch renders
/// never share state.
#[derive(Clone, Debug)]
pub struct ThumbnailRenderer {
    pub max_splats: usize,
}

impl ThumbnailRenderer {
    pub fn new(max_splats: usize) -> Self {
        Self { max_splats }
    }

    /// Render to an 8-bit RGB image.
    pub fn render(&self, cloud: &SplatCloud, camera: &Camera) -> RgbImage {
        self.render_with_stats(cloud, camera).0
    }

    pub fn render_with_stats(&self, cloud: &SplatCloud, camera: &Camera) -> (RgbImage, RenderStats) {
        let (fb, stats) = render_frame(cloud, camera, self.max_splats);
        (fb.resolve(), stats)
    }
}

impl Default for ThumbnailRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SPLATS)
    }
}
