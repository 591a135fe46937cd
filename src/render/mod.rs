//! Forward rendering pipeline (CPU implementation).
//!
//! This module implements the thumbnail render of a splat cloud:
//! - Project 3D splats to 2D ellipses (`project`)
//! - Order them back to front (`sort`)
//! - Rasterize each ellipse over its pixel box (`rasterize`)
//! - Accumulate and normalize coverage-weighted color (`framebuffer`)
//!
//! Single-threaded. Contributions are summed, so any per-splat parallel
//! split would only change floating-point summation order.

pub mod framebuffer;
pub mod project;
pub mod rasterize;
pub mod sort;
pub mod thumbnail;

// Re-export
pub use framebuffer::FrameBuffer;
pub use project::{project_splat, project_splats, Culled, Projection};
pub use rasterize::{prepare_footprint, rasterize_splat, Footprint, SkipReason};
pub use sort::sort_back_to_front;
pub use thumbnail::{render_frame, RenderStats, ThumbnailRenderer, DEFAULT_MAX_SPLATS};
