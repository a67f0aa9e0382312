//! 2D Physics simulation for rust2d
//!
//! This crate provides physics simulation for 2D rigid bodies, including:
//! - Collision shapes (circles, convex polygons, capsules)
//! - Collision detection with a single rounded-hull separating-axis test
//! - Rigid body dynamics with gravity, damping and per-body gravity overrides
//! - First-contact notification keyed by collision class

pub mod body;
pub mod collision;
pub mod material;
pub mod shapes;
pub mod world;

// Re-export commonly used types
pub use body::{BodyKey, BodyKind, RigidBody2D};
pub use collision::{rounded_hull_contact, CollisionClass, CollisionFilter, CollisionLayer, Contact};
pub use material::PhysicsMaterial;
pub use shapes::{Aabb, Shape, ShapeGeometry, ShapeKey};
pub use world::{AcceptAll, Arbiter, ContactListener, PhysicsConfig, PhysicsWorld, VelocityHook};
