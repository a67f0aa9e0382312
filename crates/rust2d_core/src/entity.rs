//! Entities
//!
//! An Entity couples one physics body with one render node through its shape
//! descriptor. The world owns the body and node storage; the entity holds
//! their keys and its lifecycle state.

use std::sync::Arc;

use rust2d_math::Vec2;
use rust2d_physics::{BodyKey, BodyKind, CollisionClass, RigidBody2D, ShapeKey};
use slotmap::new_key_type;

use crate::clock::Clock;
use crate::commands::{CollisionHandler, Commands, FinalizeContext};
use crate::descriptor::{CompoundPart, DescriptorKind, ShapeDef, ShapeDescriptor};
use crate::error::BehaviorError;
use crate::scene_graph::NodeKey;

new_key_type! {
    /// Key to an entity stored in a World
    pub struct EntityKey;
}

/// Scripted hooks attached to an entity
pub trait Behavior: Send {
    /// Drive the body of a kinematic entity; called once per tick
    fn update_velocity(&mut self, _body: &mut RigidBody2D, _clock: &Clock) -> Result<(), BehaviorError> {
        Ok(())
    }

    /// Called when the entity is unregistered
    fn on_finalize(&mut self, _ctx: &FinalizeContext, _commands: &mut Commands) {}
}

/// Scheduled removal of an entity
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transience {
    pub fade_start: f64,
    pub end_time: f64,
    pub fading: bool,
}

/// Everything needed to create an entity
pub struct EntityDesc {
    pub descriptor: ShapeDescriptor,
    pub position: Vec2,
    pub angle: f32,
    /// Initial velocity, if one was given
    pub velocity: Option<Vec2>,
    pub angular_velocity: Option<f32>,
    pub kind: BodyKind,
    pub mass: Option<f32>,
    pub moment: Option<f32>,
    pub class: CollisionClass,
    pub name: Option<String>,
    /// Keep compound parts as child entities that can be split off
    pub decomposable: bool,
    pub behavior: Option<Box<dyn Behavior>>,
    pub handler: Option<Arc<dyn CollisionHandler>>,
}

impl EntityDesc {
    /// Dynamic entity at the origin
    pub fn new(descriptor: ShapeDescriptor) -> Self {
        Self {
            descriptor,
            position: Vec2::ZERO,
            angle: 0.0,
            velocity: None,
            angular_velocity: None,
            kind: BodyKind::Dynamic,
            mass: None,
            moment: None,
            class: CollisionClass::DEFAULT,
            name: None,
            decomposable: false,
            behavior: None,
            handler: None,
        }
    }

    /// Capsule of `thickness` spanning `from` to `to`
    pub fn line(from: Vec2, to: Vec2, thickness: f32) -> Self {
        let span = to - from;
        Self::new(ShapeDescriptor::segment(span.length(), thickness))
            .at((from + to) * 0.5)
            .with_angle(span.angle())
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: f32) -> Self {
        self.angular_velocity = Some(angular_velocity);
        self
    }

    pub fn with_kind(mut self, kind: BodyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn with_moment(mut self, moment: f32) -> Self {
        self.moment = Some(moment);
        self
    }

    pub fn with_class(mut self, class: CollisionClass) -> Self {
        self.class = class;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn decomposable(mut self) -> Self {
        self.decomposable = true;
        self
    }

    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    pub fn with_collision_handler(mut self, handler: impl CollisionHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Mass and moment: explicit values first, then shape densities, then
    /// unit mass with no rotation
    pub fn mass_properties(&self) -> (f32, f32) {
        match self.descriptor.mass_properties() {
            Some((density_mass, density_moment)) => {
                let mass = self.mass.unwrap_or(density_mass);
                let moment = self.moment.unwrap_or_else(|| match self.mass {
                    Some(m) => self.descriptor.moment_for_mass(m),
                    None => density_moment,
                });
                (mass, moment)
            }
            None => (self.mass.unwrap_or(1.0), self.moment.unwrap_or(f32::INFINITY)),
        }
    }

    /// Static bodies take no velocity at all, not even a zero one
    pub(crate) fn is_valid(&self) -> bool {
        self.kind != BodyKind::Static || (self.velocity.is_none() && self.angular_velocity.is_none())
    }

    /// Description of a compound part placed relative to a compound at
    /// `position`/`angle`
    pub(crate) fn from_part(part: &CompoundPart, position: Vec2, angle: f32) -> Self {
        let mut desc = Self::new(part.descriptor.clone())
            .at(position + part.offset.rotated(angle))
            .with_angle(angle + part.angle)
            .with_class(part.class);
        desc.mass = part.mass;
        desc.name = part.name.clone();
        desc.decomposable = part.decomposable
            && matches!(part.descriptor.kind, DescriptorKind::Compound { .. });
        desc
    }
}

/// An entity stored in a World
pub struct Entity {
    pub name: Option<String>,
    pub(crate) class: CollisionClass,
    pub(crate) body: BodyKey,
    pub(crate) node: NodeKey,
    pub(crate) descriptor: ShapeDescriptor,
    pub(crate) shape_defs: Vec<ShapeDef>,
    /// Keys of the shapes while registered
    pub(crate) shape_keys: Vec<ShapeKey>,
    pub(crate) alive: bool,
    /// Cleared by kinematic conversion; shapes are not re-inserted
    pub(crate) collidable: bool,
    pub(crate) transience: Option<Transience>,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
    pub(crate) handler: Option<Arc<dyn CollisionHandler>>,
    pub(crate) decomposable: bool,
    /// Parts of a decomposable compound, in build order
    pub(crate) children: Vec<EntityKey>,
    pub(crate) parent: Option<EntityKey>,
    /// Angle relative to the parent compound
    pub(crate) child_angle: f32,
}

impl Entity {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn class(&self) -> CollisionClass {
        self.class
    }

    pub fn body(&self) -> BodyKey {
        self.body
    }

    pub fn node(&self) -> NodeKey {
        self.node
    }

    pub fn descriptor(&self) -> &ShapeDescriptor {
        &self.descriptor
    }

    pub fn shape_keys(&self) -> &[ShapeKey] {
        &self.shape_keys
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_collidable(&self) -> bool {
        self.collidable
    }

    pub fn transience(&self) -> Option<&Transience> {
        self.transience.as_ref()
    }

    pub fn is_decomposable(&self) -> bool {
        self.decomposable
    }

    pub fn children(&self) -> &[EntityKey] {
        &self.children
    }

    pub fn parent(&self) -> Option<EntityKey> {
        self.parent
    }

    pub fn has_behavior(&self) -> bool {
        self.behavior.is_some()
    }
}
