//! Deferred world mutations
//!
//! Collision handlers and behavior hooks run while the world is borrowed, so
//! they describe what should happen as [`Command`]s. The world applies the
//! buffer at fixed points of the tick.

use rust2d_math::Vec2;
use rust2d_physics::CollisionClass;

use crate::entity::{EntityDesc, EntityKey};

/// A mutation requested from inside a callback
pub enum Command {
    /// Unregister at the next tick boundary
    Remove(EntityKey),
    /// Demote to kinematic at the next tick boundary
    DeclareKinematic(EntityKey),
    /// Schedule a group for removal
    MarkTransient {
        entities: Vec<EntityKey>,
        duration: f64,
        fading: bool,
    },
    Decompose {
        entity: EntityKey,
        recursive: bool,
    },
    /// Create and register a new entity, optionally transient `(duration, fading)`
    Spawn {
        desc: Box<EntityDesc>,
        transient: Option<(f64, bool)>,
    },
    ApplyImpulse {
        entity: EntityKey,
        impulse: Vec2,
        /// World-space application point
        point: Vec2,
    },
    SetVelocity {
        entity: EntityKey,
        velocity: Vec2,
        angular_velocity: f32,
    },
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Remove(key) => write!(f, "Remove({:?})", key),
            Command::DeclareKinematic(key) => write!(f, "DeclareKinematic({:?})", key),
            Command::MarkTransient { entities, duration, fading } => {
                write!(f, "MarkTransient({:?}, {}, {})", entities, duration, fading)
            }
            Command::Decompose { entity, recursive } => write!(f, "Decompose({:?}, {})", entity, recursive),
            Command::Spawn { transient, .. } => write!(f, "Spawn(transient: {:?})", transient),
            Command::ApplyImpulse { entity, impulse, point } => {
                write!(f, "ApplyImpulse({:?}, {:?}, {:?})", entity, impulse, point)
            }
            Command::SetVelocity { entity, velocity, angular_velocity } => {
                write!(f, "SetVelocity({:?}, {:?}, {})", entity, velocity, angular_velocity)
            }
        }
    }
}

/// Buffer of pending commands
#[derive(Debug, Default)]
pub struct Commands {
    queue: Vec<Command>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.queue.push(command);
    }

    pub fn remove(&mut self, entity: EntityKey) {
        self.push(Command::Remove(entity));
    }

    pub fn declare_kinematic(&mut self, entity: EntityKey) {
        self.push(Command::DeclareKinematic(entity));
    }

    pub fn mark_transient(&mut self, entity: EntityKey, duration: f64, fading: bool) {
        self.push(Command::MarkTransient { entities: vec![entity], duration, fading });
    }

    pub fn mark_group_transient(&mut self, entities: Vec<EntityKey>, duration: f64, fading: bool) {
        self.push(Command::MarkTransient { entities, duration, fading });
    }

    pub fn decompose(&mut self, entity: EntityKey, recursive: bool) {
        self.push(Command::Decompose { entity, recursive });
    }

    pub fn spawn(&mut self, desc: EntityDesc) {
        self.push(Command::Spawn { desc: Box::new(desc), transient: None });
    }

    pub fn spawn_transient(&mut self, desc: EntityDesc, duration: f64, fading: bool) {
        self.push(Command::Spawn { desc: Box::new(desc), transient: Some((duration, fading)) });
    }

    pub fn apply_impulse(&mut self, entity: EntityKey, impulse: Vec2, point: Vec2) {
        self.push(Command::ApplyImpulse { entity, impulse, point });
    }

    pub fn set_velocity(&mut self, entity: EntityKey, velocity: Vec2, angular_velocity: f32) {
        self.push(Command::SetVelocity { entity, velocity, angular_velocity });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.queue.iter()
    }

    /// Take every pending command, leaving the buffer empty
    pub fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.queue)
    }
}

/// First contact between an entity's shape and another shape
#[derive(Clone, Copy, Debug)]
pub struct CollisionEvent {
    /// Entity whose class the handler is registered for
    pub entity: EntityKey,
    pub other: EntityKey,
    pub class: CollisionClass,
    pub other_class: CollisionClass,
    pub point: Vec2,
    /// Contact normal pointing from `entity` toward `other`
    pub normal: Vec2,
    /// Velocity of `other` relative to `entity` at the contact point
    pub relative_velocity: Vec2,
    /// Simulation time of the step
    pub time: f64,
}

/// Reacts to first contacts of a collision class.
///
/// Returning `false` makes the physics step ignore the contact until the
/// shapes separate.
pub trait CollisionHandler: Send + Sync {
    fn begin(&self, event: &CollisionEvent, commands: &mut Commands) -> bool;
}

impl<F> CollisionHandler for F
where
    F: Fn(&CollisionEvent, &mut Commands) -> bool + Send + Sync,
{
    fn begin(&self, event: &CollisionEvent, commands: &mut Commands) -> bool {
        self(event, commands)
    }
}

/// State of an entity at the moment it is unregistered
#[derive(Clone, Copy, Debug)]
pub struct FinalizeContext {
    pub entity: EntityKey,
    pub position: Vec2,
    pub angle: f32,
    pub velocity: Vec2,
    pub angular_velocity: f32,
    pub time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn key(n: u64) -> EntityKey {
        EntityKey::from(KeyData::from_ffi(n))
    }

    #[test]
    fn test_take_empties_buffer() {
        let mut commands = Commands::new();
        commands.remove(key(1));
        commands.declare_kinematic(key(1));
        assert_eq!(commands.len(), 2);
        let taken = commands.take();
        assert_eq!(taken.len(), 2);
        assert!(commands.is_empty());
        assert!(matches!(taken[0], Command::Remove(_)));
    }

    #[test]
    fn test_closure_handler() {
        let handler = |event: &CollisionEvent, commands: &mut Commands| {
            commands.remove(event.other);
            false
        };
        let event = CollisionEvent {
            entity: key(1),
            other: key(2),
            class: CollisionClass::named("a"),
            other_class: CollisionClass::DEFAULT,
            point: Vec2::ZERO,
            normal: Vec2::X,
            relative_velocity: Vec2::ZERO,
            time: 0.0,
        };
        let mut commands = Commands::new();
        assert!(!CollisionHandler::begin(&handler, &event, &mut commands));
        assert!(matches!(commands.iter().next(), Some(Command::Remove(k)) if *k == key(2)));
    }
}
