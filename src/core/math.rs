//! Mathematical utilities (quaternions, covariance, activation functions).

use nalgebra::{Matrix2x3, Matrix3, Quaternion, Vector3};

/// Added to the quaternion norm before dividing, so an all-zero quaternion
/// resolves to the identity rotation instead of NaNs.
pub const QUATERNION_NORM_EPSILON: f32 = 1e-8;

/// Renormalize a quaternion that may not be exactly unit length.
pub fn normalize_quaternion(q: &Quaternion<f32>) -> Quaternion<f32> {
    let inv = 1.0 / (q.norm() + QUATERNION_NORM_EPSILON);
    Quaternion::new(q.w * inv, q.i * inv, q.j * inv, q.k * inv)
}

/// Convert a quaternion `(w, x, y, z)` to a 3×3 rotation matrix.
///
/// The input is renormalized first, so slightly-off unit quaternions from
/// file data are fine. A zero quaternion yields the identity.
///
/// R = | 1-2(y²+z²)   2(xy-wz)    2(xz+wy)  |
///     | 2(xy+wz)     1-2(x²+z²)  2(yz-wx)  |
///     | 2(xz-wy)     2(yz+wx)    1-2(x²+y²)|
pub fn quaternion_to_matrix(q: &Quaternion<f32>) -> Matrix3<f32> {
    let q = normalize_quaternion(q);
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);

    Matrix3::new(
        1.0 - 2.0 * (y * y + z * z),
        2.0 * (x * y - w * z),
        2.0 * (x * z + w * y),
        2.0 * (x * y + w * z),
        1.0 - 2.0 * (x * x + z * z),
        2.0 * (y * z - w * x),
        2.0 * (x * z - w * y),
        2.0 * (y * z + w * x),
        1.0 - 2.0 * (x * x + y * y),
    )
}

/// Build the 3D covariance Σ = R · diag(s²) · Rᵀ, computed as (R·S)(R·S)ᵀ.
///
/// Symmetric and positive semi-definite by construction.
pub fn covariance_3d(rotation: &Matrix3<f32>, scale: &Vector3<f32>) -> Matrix3<f32> {
    let rs = rotation * Matrix3::from_diagonal(scale);
    rs * rs.transpose()
}

/// Sigmoid activation function: σ(x) = 1 / (1 + e^(-x))
///
/// Maps logit-space opacity from splat files to (0, 1).
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Jacobian of the perspective map at a camera-space point.
///
/// The camera looks down -Z, so the positive depth is `z = -point_camera.z`.
///
/// J = | f/z    0     -f*x/z² |
///     |  0    f/z    -f*y/z² |
pub fn perspective_jacobian(point_camera: &Vector3<f32>, focal: f32) -> Matrix2x3<f32> {
    let z = -point_camera.z;
    let z_inv = 1.0 / z;
    let z_inv_sq = z_inv * z_inv;

    Matrix2x3::new(
        focal * z_inv,
        0.0,
        -focal * point_camera.x * z_inv_sq,
        0.0,
        focal * z_inv,
        -focal * point_camera.y * z_inv_sq,
    )
}
