//! Per-object input behaviours
//!
//! A behaviour is shared between any number of scene objects and mutates
//! only the transform it is handed, so it keeps no per-object state. Time
//! flows in through [`InputContext`].

use std::fmt;

use crate::foundation::math::{utils, Transform, Vec3};

/// Per-frame input state shared by all behaviours
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputContext {
    /// Angular speed multiplier (radians per second for orbits)
    pub rotation_speed: f32,
    /// Seconds since the previous frame
    pub delta: f32,
    /// Accumulated orbit angle in radians
    pub angle: f32,
    /// Orbit radius
    pub radius: f32,
}

impl Default for InputContext {
    fn default() -> Self {
        Self {
            rotation_speed: 0.5,
            delta: 0.016,
            angle: 0.0,
            radius: 45.0,
        }
    }
}

impl InputContext {
    /// Start a new frame lasting `delta` seconds
    pub fn advance(&mut self, delta: f32) {
        self.delta = delta;
        self.angle = (self.angle + self.rotation_speed * delta) % std::f32::consts::TAU;
    }
}

/// Behaviour that drives a scene object's transform every frame
pub trait InputBehavior: fmt::Debug {
    /// Apply one frame of input to `transform`
    fn update(&self, transform: &mut Transform, ctx: &InputContext);
}

/// Constant spin around the object's own axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinBehavior {
    /// Spin rate in degrees per second for each Euler axis, before `rotation_speed`
    pub degrees_per_second: Vec3,
}

impl SpinBehavior {
    /// Spin around the Y axis
    pub fn yaw(degrees_per_second: f32) -> Self {
        Self {
            degrees_per_second: Vec3::new(0.0, degrees_per_second, 0.0),
        }
    }
}

impl InputBehavior for SpinBehavior {
    fn update(&self, transform: &mut Transform, ctx: &InputContext) {
        transform.add_rotation(self.degrees_per_second * ctx.rotation_speed * ctx.delta);
    }
}

/// Circular orbit in the XZ plane around `center`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitBehavior {
    /// Orbit center
    pub center: Vec3,
    /// Phase offset in degrees so several objects can share one orbit
    pub phase_degrees: f32,
}

impl OrbitBehavior {
    /// Orbit around `center` starting at `phase_degrees`
    pub fn new(center: Vec3, phase_degrees: f32) -> Self {
        Self { center, phase_degrees }
    }
}

impl InputBehavior for OrbitBehavior {
    fn update(&self, transform: &mut Transform, ctx: &InputContext) {
        let angle = ctx.angle + utils::deg_to_rad(self.phase_degrees);
        let (sin, cos) = angle.sin_cos();
        let position = Vec3::new(
            self.center.x + ctx.radius * cos,
            transform.position().y,
            self.center.z + ctx.radius * sin,
        );
        transform.set_position(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spin_scales_with_delta_and_speed() {
        let ctx = InputContext {
            rotation_speed: 2.0,
            delta: 0.5,
            ..InputContext::default()
        };
        let mut transform = Transform::identity();
        SpinBehavior::yaw(90.0).update(&mut transform, &ctx);
        assert_relative_eq!(transform.rotation(), Vec3::new(0.0, 90.0, 0.0));
    }

    #[test]
    fn test_orbit_keeps_height_and_radius() {
        let mut ctx = InputContext::default();
        ctx.advance(1.0);

        let mut transform = Transform::from_position(Vec3::new(0.0, 7.0, 0.0));
        OrbitBehavior::new(Vec3::zeros(), 0.0).update(&mut transform, &ctx);

        let p = transform.position();
        assert_relative_eq!(p.y, 7.0);
        assert_relative_eq!((p.x * p.x + p.z * p.z).sqrt(), ctx.radius, epsilon = 1e-3);
        assert_relative_eq!(p.z.atan2(p.x), 0.5, epsilon = 1e-5);
    }
}
