//! # splat-thumb: CPU thumbnails for 3D Gaussian splat scenes
//!
//! Renders a single preview image of a trained splat scene from a fixed
//! look-at camera, with no GPU: each splat's 3D covariance is projected to
//! a 2D screen-space Gaussian and summed into a coverage-weighted frame
//! buffer.
//!
//! ## Architecture
//!
//! - `core`: Fundamental data structures (splats, camera, math utilities)
//! - `render`: Projection, depth sort, rasterization, frame buffer readback
//! - `io`: PLY loading and thumbnail export
//! - `config`: Render configuration (JSON + command-line overrides)
//! - `batch`: Thumbnail every scene in a directory
//!
//! ## Example
//!
//! ```no_run
//! use splat_thumb::{load_splat_ply, RenderConfig, ThumbnailRenderer};
//! use std::path::Path;
//!
//! let config = RenderConfig::default();
//! let cloud = load_splat_ply(Path::new("scene.ply"))?;
//! let image = ThumbnailRenderer::new(config.max_splats).render(&cloud, &config.camera());
//! image.save("scene.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core data structures and math
pub mod core;

// I/O operations (PLY, image export)
pub mod io;

// CPU rendering pipeline
pub mod render;

pub mod batch;
pub mod config;

// Re-export commonly used types at crate root for convenience
pub use config::{ConfigError, RenderConfig};
pub use core::{Camera, Splat, SplatCloud};
pub use io::{load_splat_ply, save_thumbnail, LoadError, OutputError};
pub use render::{RenderStats, ThumbnailRenderer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
