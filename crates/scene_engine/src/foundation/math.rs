//! Math utilities and types
//!
//! Provides the vector/matrix aliases used by the scene and lighting code,
//! plus the Euler-angle `Transform` that every scene object owns.

use std::cell::Cell;

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, Euler rotation and scale
///
/// Rotation is stored as pitch/yaw/roll in degrees (x, y, z) and wrapped into
/// `[0, 360)` whenever it is written. The model matrix is cached and only
/// rebuilt after one of the setters ran, so reading it every frame for a
/// static object costs a `Cell` load.
#[derive(Debug, Clone)]
pub struct Transform {
    position: Vec3,
    euler_degrees: Vec3,
    scale: Vec3,
    /// `None` while dirty
    cached_model: Cell<Option<Mat4>>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            euler_degrees: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            cached_model: Cell::new(None),
        }
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
            && self.euler_degrees == other.euler_degrees
            && self.scale == other.scale
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform from position, Euler angles (degrees) and scale
    pub fn new(position: Vec3, euler_degrees: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            euler_degrees: utils::wrap_degrees(euler_degrees),
            scale,
            cached_model: Cell::new(None),
        }
    }

    /// World-space position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Euler angles in degrees (pitch, yaw, roll)
    pub fn rotation(&self) -> Vec3 {
        self.euler_degrees
    }

    /// Per-axis scale
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Set the world-space position
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.mark_dirty();
    }

    /// Set the Euler angles in degrees
    pub fn set_rotation(&mut self, euler_degrees: Vec3) {
        self.euler_degrees = utils::wrap_degrees(euler_degrees);
        self.mark_dirty();
    }

    /// Set the per-axis scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.mark_dirty();
    }

    /// Offset the position
    pub fn add_position(&mut self, delta: Vec3) {
        self.set_position(self.position + delta);
    }

    /// Offset the Euler angles
    pub fn add_rotation(&mut self, delta_degrees: Vec3) {
        self.set_rotation(self.euler_degrees + delta_degrees);
    }

    /// Offset the scale
    pub fn add_scale(&mut self, delta: Vec3) {
        self.set_scale(self.scale + delta);
    }

    /// Whether the next `model_matrix` call will rebuild the matrix
    pub fn is_dirty(&self) -> bool {
        self.cached_model.get().is_none()
    }

    /// Model matrix `T * R * S`, rebuilt only after a setter ran
    pub fn model_matrix(&self) -> Mat4 {
        if let Some(model) = self.cached_model.get() {
            return model;
        }

        let radians = self.euler_degrees.map(utils::deg_to_rad);
        let rotation = Quat::from_euler_angles(radians.x, radians.y, radians.z);
        let model = Mat4::new_translation(&self.position)
            * rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale);

        self.cached_model.set(Some(model));
        model
    }

    /// Local forward axis: the normalized third column of the model matrix
    ///
    /// Returns `None` for a degenerate (zero-scale) transform.
    pub fn forward(&self) -> Option<Vec3> {
        let model = self.model_matrix();
        let column = Vec3::new(model[(0, 2)], model[(1, 2)], model[(2, 2)]);
        column.try_normalize(f32::EPSILON)
    }

    fn mark_dirty(&mut self) {
        self.cached_model.set(None);
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Wrap every component into `[0, 360)`
    pub fn wrap_degrees(angles: Vec3) -> Vec3 {
        angles.map(|a| a.rem_euclid(360.0))
    }
}

/// Extension trait for Mat4 with camera helpers
pub trait Mat4Ext {
    /// Create a right-handed perspective projection matrix (OpenGL clip space)
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let eye = nalgebra::Point3::from(eye);
        let target = nalgebra::Point3::from(target);
        Mat4::look_at_rh(&eye, &target, &up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_model_matrix_is_cached_until_setter() {
        let mut transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        assert!(transform.is_dirty());

        let first = transform.model_matrix();
        assert!(!transform.is_dirty());
        assert_relative_eq!(first[(0, 3)], 1.0);
        assert_relative_eq!(first[(1, 3)], 2.0);
        assert_relative_eq!(first[(2, 3)], 3.0);

        transform.set_scale(Vec3::new(2.0, 2.0, 2.0));
        assert!(transform.is_dirty());
        let second = transform.model_matrix();
        assert_relative_eq!(second[(0, 0)], 2.0);
    }

    #[test]
    fn test_rotation_wraps_into_positive_range() {
        let mut transform = Transform::identity();
        transform.set_rotation(Vec3::new(-90.0, 370.0, 720.0));
        assert_relative_eq!(transform.rotation(), Vec3::new(270.0, 10.0, 0.0), epsilon = 1e-4);
    }

    #[test]
    fn test_forward_follows_yaw() {
        let mut transform = Transform::identity();
        assert_relative_eq!(transform.forward().unwrap(), Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-5);

        // Yaw of 90 degrees turns +Z into +X
        transform.set_rotation(Vec3::new(0.0, 90.0, 0.0));
        assert_relative_eq!(transform.forward().unwrap(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_forward_ignores_scale() {
        let transform = Transform::new(Vec3::zeros(), Vec3::zeros(), Vec3::new(7.5, 7.5, 7.5));
        assert_relative_eq!(transform.forward().unwrap(), Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_degenerate_scale_has_no_forward() {
        let transform = Transform::new(Vec3::zeros(), Vec3::zeros(), Vec3::zeros());
        assert!(transform.forward().is_none());
    }
}
