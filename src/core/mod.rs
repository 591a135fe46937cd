//! Core data structures and mathematical operations.
//!
//! This module contains the fundamental types used throughout the system:
//! - `Splat`: 3D Gaussian primitive, and `SplatCloud` (the splat store)
//! - `ProjectedSplat`: a splat after projection to screen space
//! - `Camera`: look-at camera configuration and its derived `CameraView`
//! - Math utilities: quaternions, covariance, projection Jacobian
//!
//! All types here are "pure data" - no I/O, no rendering logic.

mod camera;
pub mod color;
mod gaussian;
pub mod math;

// Re-export public types
pub use camera::{Camera, CameraView};
pub use gaussian::{ProjectedSplat, Splat, SplatCloud};
pub use math::{covariance_3d, perspective_jacobian, quaternion_to_matrix, sigmoid};
