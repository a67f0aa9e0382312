//! Rigid body types for 2D physics simulation

use rust2d_math::Vec2;
use serde::{Serialize, Deserialize};
use slotmap::new_key_type;

// Define generational key type for rigid bodies
new_key_type! {
    /// Key to a rigid body in the physics world
    ///
    /// Uses generational indexing to prevent the ABA problem where a handle
    /// could point to a reused slot. If a body is removed and its slot reused,
    /// old keys will return None instead of pointing to the wrong body.
    pub struct BodyKey;
}

/// How a body takes part in the simulation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    /// Moved by forces, gravity and contacts
    #[default]
    Dynamic,
    /// Moved only by its own velocity; pushes dynamic bodies but is never pushed
    Kinematic,
    /// Never moves
    Static,
}

/// A 2D rigid body
///
/// Collision geometry lives in the world's shape storage; a body only carries
/// its kinematic state and mass properties.
#[derive(Clone, Debug)]
pub struct RigidBody2D {
    /// Position of the body origin (world coordinates)
    pub position: Vec2,
    /// Rotation in radians
    pub angle: f32,
    /// Linear velocity (units per second)
    pub velocity: Vec2,
    /// Angular velocity (radians per second)
    pub angular_velocity: f32,
    /// Mass; infinite for kinematic and static bodies
    pub mass: f32,
    /// Moment of inertia about the body origin; infinite disables rotation response
    pub moment: f32,
    /// Dynamic, kinematic or static
    pub kind: BodyKind,
    /// Accumulated force, cleared after each step
    pub force: Vec2,
    /// Accumulated torque, cleared after each step
    pub torque: f32,
}

impl RigidBody2D {
    /// Create a dynamic body at `position`
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            angle: 0.0,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass: 1.0,
            moment: f32::INFINITY,
            kind: BodyKind::Dynamic,
            force: Vec2::ZERO,
            torque: 0.0,
        }
    }

    /// Create a body of the given kind
    pub fn with_kind_at(kind: BodyKind, position: Vec2) -> Self {
        Self::new(position).with_kind(kind)
    }

    /// Set the body kind
    pub fn with_kind(mut self, kind: BodyKind) -> Self {
        self.set_kind(kind);
        self
    }

    /// Set the rotation
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    /// Set the velocity of this body
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the angular velocity of this body
    pub fn with_angular_velocity(mut self, angular_velocity: f32) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Set the mass and moment of inertia
    pub fn with_mass(mut self, mass: f32, moment: f32) -> Self {
        self.mass = mass;
        self.moment = moment;
        self
    }

    /// Change the body kind; static bodies are brought to rest
    pub fn set_kind(&mut self, kind: BodyKind) {
        self.kind = kind;
        if kind == BodyKind::Static {
            self.velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
        }
    }

    /// Whether contacts and forces move this body
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }

    /// Inverse mass; zero for anything that contacts cannot move
    #[inline]
    pub fn inverse_mass(&self) -> f32 {
        if self.is_dynamic() && self.mass.is_finite() && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// Inverse moment; zero for anything that contacts cannot rotate
    #[inline]
    pub fn inverse_moment(&self) -> f32 {
        if self.is_dynamic() && self.moment.is_finite() && self.moment > 0.0 {
            1.0 / self.moment
        } else {
            0.0
        }
    }

    /// Transform a point from body space to world space
    #[inline]
    pub fn local_to_world(&self, point: Vec2) -> Vec2 {
        self.position + point.rotated(self.angle)
    }

    /// Transform a point from world space to body space
    #[inline]
    pub fn world_to_local(&self, point: Vec2) -> Vec2 {
        (point - self.position).rotated(-self.angle)
    }

    /// Velocity of the material point at `point` (world coordinates): `v + ω × r`
    #[inline]
    pub fn velocity_at_world_point(&self, point: Vec2) -> Vec2 {
        self.velocity + Vec2::cross_scalar(self.angular_velocity, point - self.position)
    }

    /// Apply an impulse at a world point
    pub fn apply_impulse_at_world_point(&mut self, impulse: Vec2, point: Vec2) {
        self.velocity += impulse * self.inverse_mass();
        self.angular_velocity += (point - self.position).cross(impulse) * self.inverse_moment();
    }

    /// Apply an impulse at a point given in body coordinates
    pub fn apply_impulse_at_local_point(&mut self, impulse: Vec2, point: Vec2) {
        let world_point = self.local_to_world(point);
        self.apply_impulse_at_world_point(impulse, world_point);
    }

    /// Accumulate a force through the body origin
    pub fn apply_force(&mut self, force: Vec2) {
        self.force += force;
    }

    /// Apply a positional correction (e.g., from collision resolution)
    pub fn apply_correction(&mut self, correction: Vec2) {
        self.position += correction;
    }
}
