//! Camera projector: world-space splats to screen-space ellipses.
//!
//! Per splat:
//! 1) Transform the center into camera space and cull at the near plane
//! 2) Perspective-project the center to pixels
//! 3) Rotate Σ into camera space
//! 4) Push Σ through the perspective Jacobian: Σ₂d = J Σ_cam Jᵀ
//! 5) Add a fixed diagonal regularizer so every splat covers about a pixel
//!
//! Each splat is projected independently from its own attributes and the
//! shared `CameraView`.

use nalgebra::Matrix2;

use crate::core::{CameraView, ProjectedSplat, Splat};

/// Added to both diagonal entries of every 2D covariance (pixels²).
pub const COVARIANCE_REGULARIZATION: f32 = 0.3;

/// Why a splat produced no projected output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Culled {
    /// Non-finite center or non-positive scale.
    Malformed,
    /// At or behind the near plane.
    NearPlane,
}

/// Project one splat. `splat_idx` is carried through to the output.
pub fn project_splat(
    splat: &Splat,
    splat_idx: usize,
    view: &CameraView,
) -> Result<ProjectedSplat, Culled> {
    if !splat.is_well_formed() {
        return Err(Culled::Malformed);
    }

    // 1) Mean to camera space.
    let pos_cam = view.world_to_camera(&splat.position);
    if !pos_cam.iter().all(|v| v.is_finite()) {
        return Err(Culled::Malformed);
    }

    // 2) Mean to pixels (None at or behind the near plane).
    let screen = view.project(&pos_cam).ok_or(Culled::NearPlane)?;

    // 3) Covariance to camera space (translation has no effect on covariance).
    let cov_cam = view.covariance_to_camera(&splat.covariance_matrix());

    // 4) Linearize the perspective map at the mean.
    let j = view.projection_jacobian(&pos_cam);
    let cov2d: Matrix2<f32> = j * cov_cam * j.transpose();

    // 5) Minimum blur.
    let cov2d = cov2d + Matrix2::identity() * COVARIANCE_REGULARIZATION;

    Ok(ProjectedSplat {
        screen_x: screen.x,
        screen_y: screen.y,
        cov2d,
        color: splat.color,
        opacity: splat.opacity,
        depth: -pos_cam.z,
        splat_idx,
    })
}

/// Output of projecting a whole splat set.
#[derive(Clone, Debug, Default)]
pub struct Projection {
    /// Surviving splats, in input order.
    pub visible: Vec<ProjectedSplat>,
    pub malformed: usize,
    pub near_culled: usize,
}

impl Projection {
    /// True when no splat survived; a valid empty frame, not an error.
    pub fn nothing_visible(&self) -> bool {
        self.visible.is_empty()
    }
}

/// Project every `(index, splat)` pair, dropping culled splats.
pub fn project_splats<'a, I>(splats: I, view: &CameraView) -> Projection
where
    I: IntoIterator<Item = (usize, &'a Splat)>,
{
    let mut projection = Projection::default();

    for (idx, splat) in splats {
        match project_splat(splat, idx, view) {
            Ok(p) => projection.visible.push(p),
            Err(Culled::Malformed) => projection.malformed += 1,
            Err(Culled::NearPlane) => projection.near_culled += 1,
        }
    }

    projection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Camera;
    use approx::assert_relative_eq;
    use nalgebra::{Quaternion, Vector3};

    fn camera() -> Camera {
        Camera::new(
            Vector3::new(0.0, 0.5, 2.0),
            Vector3::new(0.0, 0.5, 10.0),
            Vector3::new(0.0, -1.0, 0.0),
            50.0,
            0.1,
            100.0,
            1920,
            1080,
        )
    }

    fn splat_at(position: Vector3<f32>) -> Splat {
        Splat::new(
            position,
            Vector3::new(0.1, 0.1, 0.1),
            Quaternion::identity(),
            Vector3::new(1.0, 0.0, 0.0),
            1.0,
        )
    }

    #[test]
    fn test_project_center_splat() {
        let cam = camera();
        let view = cam.view().unwrap();
        let p = project_splat(&splat_at(Vector3::new(0.0, 0.5, 10.0)), 7, &view).unwrap();

        assert_relative_eq!(p.screen_x, 960.0, epsilon = 1e-3);
        assert_relative_eq!(p.screen_y, 540.0, epsilon = 1e-3);
        assert_relative_eq!(p.depth, 8.0, epsilon = 1e-5);
        assert_eq!(p.splat_idx, 7);

        // Isotropic 0.1 std at depth 8: σ_px = f * 0.1 / 8.
        let sigma_px = cam.focal() * 0.1 / 8.0;
        let expected = sigma_px * sigma_px + COVARIANCE_REGULARIZATION;
        assert_relative_eq!(p.cov2d[(0, 0)], expected, max_relative = 1e-4);
        assert_relative_eq!(p.cov2d[(1, 1)], expected, max_relative = 1e-4);
        assert_relative_eq!(p.cov2d[(0, 1)], 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_cov2d_is_symmetric_for_rotated_splat() {
        let view = camera().view().unwrap();
        let mut s = splat_at(Vector3::new(1.0, -0.5, 12.0));
        s.scale = Vector3::new(0.4, 0.05, 0.2);
        s.rotation = Quaternion::new(0.8, 0.3, -0.4, 0.1);
        let p = project_splat(&s, 0, &view).unwrap();
        assert_relative_eq!(p.cov2d[(0, 1)], p.cov2d[(1, 0)], max_relative = 1e-4);
        assert!(p.determinant() > 0.0);
    }

    #[test]
    fn test_behind_camera_is_culled() {
        let view = camera().view().unwrap();
        let result = project_splat(&splat_at(Vector3::new(0.0, 0.5, -5.0)), 0, &view);
        assert_eq!(result, Err(Culled::NearPlane));
    }

    #[test]
    fn test_zero_scale_is_malformed() {
        let view = camera().view().unwrap();
        let mut s = splat_at(Vector3::new(0.0, 0.5, 10.0));
        s.scale = Vector3::zeros();
        assert_eq!(project_splat(&s, 0, &view), Err(Culled::Malformed));
    }

    #[test]
    fn test_project_splats_counts() {
        let view = camera().view().unwrap();
        let mut bad = splat_at(Vector3::new(0.0, 0.5, 10.0));
        bad.position.y = f32::NAN;
        let splats = vec![
            splat_at(Vector3::new(0.0, 0.5, 10.0)),
            splat_at(Vector3::new(0.0, 0.5, -5.0)),
            bad,
        ];

        let projection = project_splats(splats.iter().enumerate(), &view);
        assert_eq!(projection.visible.len(), 1);
        assert_eq!(projection.near_culled, 1);
        assert_eq!(projection.malformed, 1);
        assert!(!projection.nothing_visible());
    }
}
