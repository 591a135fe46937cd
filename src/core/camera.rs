//! Look-at pinhole camera.
//!
//! The camera is plain configuration: position, target, up vector, vertical
//! field of view and output size. Everything the projector needs per splat
//! (the orthonormal basis, view rotation and focal length) is derived once
//! into a [`CameraView`].
//!
//! Camera space follows the usual right-handed convention: X right, Y up and
//! the camera looking down -Z.

use nalgebra::{Matrix2x3, Matrix3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::core::math::perspective_jacobian;

/// A look-at camera with a vertical field of view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Eye position in world space.
    pub position: Vector3<f32>,

    /// Point the camera looks at.
    pub look_at: Vector3<f32>,

    /// Approximate up direction; re-orthogonalized against the view direction.
    pub up: Vector3<f32>,

    /// Vertical field of view in degrees.
    pub fov_degrees: f32,

    pub near: f32,
    pub far: f32,

    /// Output image width (pixels)
    pub width: u32,

    /// Output image height (pixels)
    pub height: u32,
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        position: Vector3<f32>,
        look_at: Vector3<f32>,
        up: Vector3<f32>,
        fov_degrees: f32,
        near: f32,
        far: f32,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            position,
            look_at,
            up,
            fov_degrees,
            near,
            far,
            width,
            height,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// tan(fov / 2) for the vertical field of view.
    pub fn tan_half_fov(&self) -> f32 {
        (self.fov_degrees.to_radians() * 0.5).tan()
    }

    /// Focal length in pixels: f = height / (2 tan(fov/2)).
    pub fn focal(&self) -> f32 {
        self.height as f32 / (2.0 * self.tan_half_fov())
    }

    /// Orthonormal `(right, up, forward)` basis.
    ///
    /// Returns `None` when the look direction is zero or parallel to `up`.
    pub fn basis(&self) -> Option<(Vector3<f32>, Vector3<f32>, Vector3<f32>)> {
        let forward = (self.look_at - self.position).try_normalize(1e-12)?;
        let right = forward.cross(&self.up).try_normalize(1e-12)?;
        let cam_up = right.cross(&forward);
        Some((right, cam_up, forward))
    }

    /// Derive the per-render projection state.
    pub fn view(&self) -> Option<CameraView> {
        let (right, up, forward) = self.basis()?;
        let rotation = Matrix3::from_rows(&[
            right.transpose(),
            up.transpose(),
            (-forward).transpose(),
        ]);

        Some(CameraView {
            rotation,
            eye: self.position,
            near: self.near,
            width: self.width as f32,
            height: self.height as f32,
            aspect: self.aspect(),
            tan_half_fov: self.tan_half_fov(),
            focal: self.focal(),
        })
    }
}

/// Derived camera state shared by every splat of one render.
#[derive(Clone, Debug)]
pub struct CameraView {
    /// World → camera rotation; rows are `[right, up, -forward]`.
    pub rotation: Matrix3<f32>,
    pub eye: Vector3<f32>,
    pub near: f32,
    pub width: f32,
    pub height: f32,
    pub aspect: f32,
    pub tan_half_fov: f32,
    pub focal: f32,
}

impl CameraView {
    /// Transform a point from world coordinates to camera coordinates.
    pub fn world_to_camera(&self, point_world: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * (point_world - self.eye)
    }

    /// Whether a camera-space point lies beyond the near plane.
    pub fn in_front(&self, point_camera: &Vector3<f32>) -> bool {
        point_camera.z < -self.near
    }

    /// Project a camera-space point to pixel coordinates (y down).
    ///
    /// Returns None if the point is not beyond the near plane.
    pub fn project(&self, point_camera: &Vector3<f32>) -> Option<Vector2<f32>> {
        if !self.in_front(point_camera) {
            return None;
        }

        let z = -point_camera.z;
        let x_ndc = point_camera.x / (z * self.tan_half_fov * self.aspect);
        let y_ndc = point_camera.y / (z * self.tan_half_fov);

        Some(Vector2::new(
            (x_ndc + 1.0) * 0.5 * self.width,
            (1.0 - y_ndc) * 0.5 * self.height,
        ))
    }

    /// Rotate a world-space covariance into camera space: V Σ Vᵀ.
    pub fn covariance_to_camera(&self, cov_world: &Matrix3<f32>) -> Matrix3<f32> {
        self.rotation * cov_world * self.rotation.transpose()
    }

    pub fn projection_jacobian(&self, point_camera: &Vector3<f32>) -> Matrix2x3<f32> {
        perspective_jacobian(point_camera, self.focal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn thumbnail_camera() -> Camera {
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

    #[test]
    fn test_basis_is_orthonormal() {
        let (right, up, forward) = thumbnail_camera().basis().unwrap();
        assert_relative_eq!(forward, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(right, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(up, Vector3::new(0.0, -1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(right.dot(&up), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_basis_degenerate_up() {
        let mut cam = thumbnail_camera();
        cam.up = Vector3::new(0.0, 0.0, 1.0);
        assert!(cam.basis().is_none());
        assert!(cam.view().is_none());
    }

    #[test]
    fn test_focal_length() {
        let cam = thumbnail_camera();
        let expected = 1080.0 / (2.0 * (25.0f32).to_radians().tan());
        assert_relative_eq!(cam.focal(), expected, epsilon = 1e-3);
    }

    #[test]
    fn test_point_on_axis_projects_to_center() {
        let view = thumbnail_camera().view().unwrap();
        let p_cam = view.world_to_camera(&Vector3::new(0.0, 0.5, 10.0));
        assert_relative_eq!(p_cam, Vector3::new(0.0, 0.0, -8.0), epsilon = 1e-5);

        let px = view.project(&p_cam).unwrap();
        assert_relative_eq!(px.x, 960.0, epsilon = 1e-3);
        assert_relative_eq!(px.y, 540.0, epsilon = 1e-3);
    }

    #[test]
    fn test_point_behind_camera() {
        let view = thumbnail_camera().view().unwrap();
        let p_cam = view.world_to_camera(&Vector3::new(0.0, 0.5, -5.0));
        assert!(p_cam.z > 0.0);
        assert!(view.project(&p_cam).is_none());
    }

    #[test]
    fn test_point_inside_near_plane_is_rejected() {
        let view = thumbnail_camera().view().unwrap();
        let p_cam = view.world_to_camera(&Vector3::new(0.0, 0.5, 2.05));
        assert!(view.project(&p_cam).is_none());
    }
}
