//! Core types for the rust2d engine
//!
//! This crate keeps a physics world and a scene graph consistent while
//! entities come and go:
//!
//! - [`ShapeDescriptor`] - Collision shapes paired with a render node
//! - [`Entity`] / [`EntityDesc`] - A body and a node kept in step
//! - [`World`] - Entity storage and the per-tick pipeline phases
//! - [`Timeline`] - Scheduled (optionally fading) removals
//! - [`CentralGravity`] - Shell gravity as a velocity hook
//! - [`Commands`] - Deferred mutations from callbacks
//! - [`Simulation`] - Fixed-order tick around input and render views
//! - [`Scene`] - Loadable/saveable level templates

mod clock;
mod commands;
mod decompose;
mod descriptor;
mod entity;
mod error;
mod gravity;
mod input;
mod scene;
mod scene_graph;
mod simulation;
mod timeline;
mod trace;
mod transform;
mod world;

pub use clock::{Clock, DEFAULT_SPEED_DELTA, DEFAULT_TIME_STEP};
pub use commands::{CollisionEvent, CollisionHandler, Command, Commands, FinalizeContext};
pub use descriptor::{CompoundPart, DescriptorKind, ShapeDef, ShapeDescriptor, ShapeProps, DEFAULT_FONT_SIZE};
pub use entity::{Behavior, Entity, EntityDesc, EntityKey, Transience};
pub use error::{BehaviorError, EntityError};
pub use gravity::{central_acceleration, CentralGravity};
pub use input::{ActionMap, Binding, InputButton, InputState, Key, Modifiers, MouseButton, Trigger};
pub use scene::{CentralGravityTemplate, EntityTemplate, Scene, SceneLoadError, SceneSaveError, ShapeTemplate, TransientTemplate};
pub use scene_graph::{DirtyFlags, Material, Node, NodeInstance, NodeKey, NodeKind, SceneGraph};
pub use simulation::{Game, RenderView, Simulation};
pub use timeline::{fade_opacity, Timeline, TimelineRecord};
pub use trace::Trace;
pub use transform::Transform2D;
pub use world::{World, WorldConfig};

// Re-export commonly used types from rust2d_math for convenience
pub use rust2d_math::{GeometryError, MarchStyle, Vec2};

// Re-export physics types for convenient access through rust2d_core
pub use rust2d_physics::{
    BodyKey, BodyKind, CollisionClass, CollisionFilter, CollisionLayer, PhysicsConfig, PhysicsMaterial,
    PhysicsWorld, RigidBody2D,
};
