//! Central gravity field
//!
//! Inverse-square attraction toward an attractor body outside a reference
//! radius, growing linearly with distance inside it (uniform shell).

use rust2d_math::Vec2;
use rust2d_physics::{BodyKey, PhysicsWorld, RigidBody2D, VelocityHook};

/// Acceleration felt at `at` toward `attractor`.
///
/// Outside `radius` the magnitude is `force / d²`; inside it is scaled by
/// `(d / radius)³`, so both sides agree at `d == radius`.
pub fn central_acceleration(at: Vec2, attractor: Vec2, force: f32, radius: f32) -> Vec2 {
    let offset = attractor - at;
    let d = offset.length();
    if d == 0.0 {
        return Vec2::ZERO;
    }
    let mut f = force / (d * d * d);
    if d < radius {
        let ratio = d / radius;
        f *= ratio * ratio * ratio;
    }
    offset * f
}

/// Velocity hook pulling bodies toward an attractor body
#[derive(Clone, Copy, Debug)]
pub struct CentralGravity {
    pub attractor: BodyKey,
    pub force: f32,
    pub radius: f32,
}

impl VelocityHook for CentralGravity {
    fn acceleration(&self, _key: BodyKey, body: &RigidBody2D, world: &PhysicsWorld) -> Vec2 {
        match world.get_body(self.attractor) {
            Some(attractor) => central_acceleration(body.position, attractor.position, self.force, self.radius),
            None => world.config.gravity,
        }
    }
}
