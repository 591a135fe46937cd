//! Splat representation and cloud data structure.
//!
//! A splat here holds *activated* values: the loader has already applied
//! `exp()` to the log-scales, `sigmoid()` to the opacity logit and converted
//! the SH DC term to RGB. The render core only ever reads splats.

use nalgebra::{Matrix2, Matrix3, Quaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::core::math::{covariance_3d, quaternion_to_matrix};

/// A 3D anisotropic Gaussian primitive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Splat {
    /// World-space center.
    pub position: Vector3<f32>,

    /// Per-axis standard deviation along the splat's local axes.
    pub scale: Vector3<f32>,

    /// Orientation as `(w, x, y, z)`. Renormalized on use.
    pub rotation: Quaternion<f32>,

    /// Flat RGB color in [0, 1].
    pub color: Vector3<f32>,

    /// Opacity in [0, 1].
    pub opacity: f32,
}

impl Splat {
    pub fn new(
        position: Vector3<f32>,
        scale: Vector3<f32>,
        rotation: Quaternion<f32>,
        color: Vector3<f32>,
        opacity: f32,
    ) -> Self {
        Self {
            position,
            scale,
            rotation,
            color,
            opacity,
        }
    }

    /// Rotation frame of the splat's local axes.
    pub fn rotation_matrix(&self) -> Matrix3<f32> {
        quaternion_to_matrix(&self.rotation)
    }

    /// Compute the 3D covariance matrix Σ = R · S · Sᵀ · Rᵀ
    pub fn covariance_matrix(&self) -> Matrix3<f32> {
        covariance_3d(&self.rotation_matrix(), &self.scale)
    }

    /// A splat the projector can use: finite center and strictly positive,
    /// finite scale on every axis.
    pub fn is_well_formed(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.scale.iter().all(|s| s.is_finite() && *s > 0.0)
    }
}

/// A splat after projection to screen space.
///
/// Produced by the camera projector; the depth sequencer only reorders these.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectedSplat {
    /// Center in pixel coordinates (x right, y down).
    pub screen_x: f32,
    pub screen_y: f32,

    /// 2D covariance (symmetric), in pixels².
    pub cov2d: Matrix2<f32>,

    pub color: Vector3<f32>,
    pub opacity: f32,

    /// Positive distance along the camera's forward axis.
    pub depth: f32,

    /// Index of the source splat in the cloud that was projected.
    pub splat_idx: usize,
}

impl ProjectedSplat {
    /// det([a b; b c]) = a*c - b*b
    pub fn determinant(&self) -> f32 {
        let c = &self.cov2d;
        c[(0, 0)] * c[(1, 1)] - c[(0, 1)] * c[(0, 1)]
    }

    /// Larger eigenvalue of the 2D covariance.
    ///
    /// The discriminant is floored at 0.1 so rounding error can never make the
    /// square root negative.
    pub fn max_eigenvalue(&self) -> f32 {
        let trace = self.cov2d[(0, 0)] + self.cov2d[(1, 1)];
        let det = self.determinant();
        0.5 * (trace + (trace * trace - 4.0 * det).max(0.1).sqrt())
    }

    /// Analytic inverse of the 2D covariance as `(inv_xx, inv_xy, inv_yy)`.
    ///
    /// Returns `None` for a non-positive determinant.
    ///
    /// inv = 1/det * [ c  -b]
    ///               [-b   a]
    pub fn inverse_covariance(&self) -> Option<(f32, f32, f32)> {
        let det = self.determinant();
        if det <= 0.0 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;
        Some((
            self.cov2d[(1, 1)] * inv_det,
            -self.cov2d[(0, 1)] * inv_det,
            self.cov2d[(0, 0)] * inv_det,
        ))
    }
}

/// The splat store: every splat of one scene, in file order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SplatCloud {
    pub splats: Vec<Splat>,
}

impl SplatCloud {
    pub fn new() -> Self {
        Self { splats: Vec::new() }
    }

    pub fn from_splats(splats: Vec<Splat>) -> Self {
        Self { splats }
    }

    pub fn len(&self) -> usize {
        self.splats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splats.is_empty()
    }

    /// Indices of the splats kept under a `max_splats` cap.
    ///
    /// With `len() <= max_splats` this is every index in order. Otherwise the
    /// `max_splats` most opaque splats, highest opacity first, ties kept in
    /// original order. NaN opacities rank below every other value.
    pub fn opacity_ranked_indices(&self, max_splats: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.splats.len()).collect();
        if self.splats.len() <= max_splats {
            return indices;
        }

        let rank = |i: usize| {
            let o = self.splats[i].opacity;
            if o.is_nan() {
                f32::NEG_INFINITY
            } else {
                o
            }
        };
        // sort_by is stable, so equal opacities keep index order.
        indices.sort_by(|&a, &b| rank(b).total_cmp(&rank(a)));
        indices.truncate(max_splats);
        indices
    }

    /// Cap the cloud at `max_splats`, keeping the most opaque splats.
    pub fn subsample_by_opacity(self, max_splats: usize) -> Self {
        if self.splats.len() <= max_splats {
            return self;
        }
        let indices = self.opacity_ranked_indices(max_splats);
        let splats = indices
            .into_iter()
            .map(|i| self.splats[i].clone())
            .collect();
        Self { splats }
    }
}
