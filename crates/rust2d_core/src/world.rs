//! World container for entities
//!
//! The World owns the physics world, the scene graph and every entity
//! coupling the two. It runs the per-tick pipeline phases; `Simulation`
//! orders them around input dispatch and render views.

use std::collections::HashMap;
use std::sync::Arc;

use rust2d_math::Vec2;
use rust2d_physics::{
    Arbiter, BodyKey, BodyKind, CollisionClass, ContactListener, PhysicsConfig, PhysicsWorld, RigidBody2D,
};
use slotmap::{SecondaryMap, SlotMap};

use crate::clock::{Clock, DEFAULT_SPEED_DELTA, DEFAULT_TIME_STEP};
use crate::commands::{CollisionEvent, CollisionHandler, Command, Commands, FinalizeContext};
use crate::descriptor::DescriptorKind;
use crate::entity::{Entity, EntityDesc, EntityKey, Transience};
use crate::error::EntityError;
use crate::gravity::CentralGravity;
use crate::scene_graph::{NodeKey, SceneGraph};
use crate::timeline::Timeline;
use crate::trace::Trace;

/// World-level settings
#[derive(Clone, Debug, PartialEq)]
pub struct WorldConfig {
    /// Entities farther than this from the origin on either axis are removed
    pub universe_size: f32,
    /// Ticks between two trail points
    pub trace_length: u32,
    /// Trail segments kept
    pub trace_max_segments: usize,
    /// Simulation time per tick
    pub time_step: f64,
    /// Step change on speed up / slow down
    pub speed_delta: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            universe_size: 100_000.0,
            trace_length: 10,
            trace_max_segments: 1000,
            time_step: DEFAULT_TIME_STEP,
            speed_delta: DEFAULT_SPEED_DELTA,
        }
    }
}

/// Active central gravity field
#[derive(Clone, Debug)]
pub(crate) struct GravityField {
    pub(crate) attractor: EntityKey,
    pub(crate) hook: Arc<CentralGravity>,
}

/// The 2D world containing all entities
pub struct World {
    pub(crate) entities: SlotMap<EntityKey, Entity>,
    pub(crate) physics: PhysicsWorld,
    pub(crate) scene: SceneGraph,
    pub(crate) timeline: Timeline<EntityKey>,
    pub(crate) clock: Clock,
    pub(crate) gravity: Option<GravityField>,
    handlers: HashMap<CollisionClass, Arc<dyn CollisionHandler>>,
    /// Reverse lookup from physics bodies, for contact reports
    body_owner: SecondaryMap<BodyKey, EntityKey>,
    pending_kinematic: Vec<EntityKey>,
    /// Alive kinematic entities driven by their behavior
    kinematic: Vec<EntityKey>,
    pending_removals: Vec<EntityKey>,
    commands: Commands,
    flushing: bool,
    trace: Trace,
    config: WorldConfig,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create an empty world with default settings
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default(), PhysicsConfig::default())
    }

    pub fn with_config(config: WorldConfig, physics: PhysicsConfig) -> Self {
        Self {
            entities: SlotMap::with_key(),
            physics: PhysicsWorld::with_config(physics),
            scene: SceneGraph::new(),
            timeline: Timeline::new(),
            clock: Clock::new(config.time_step, config.speed_delta),
            gravity: None,
            handlers: HashMap::new(),
            body_owner: SecondaryMap::new(),
            pending_kinematic: Vec::new(),
            kinematic: Vec::new(),
            pending_removals: Vec::new(),
            commands: Commands::new(),
            flushing: false,
            trace: Trace::new(),
            config,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    pub fn timeline(&self) -> &Timeline<EntityKey> {
        &self.timeline
    }

    /// Commands applied at the next flush
    pub fn commands_mut(&mut self) -> &mut Commands {
        &mut self.commands
    }

    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    pub fn is_alive(&self, key: EntityKey) -> bool {
        self.entities.get(key).is_some_and(|e| e.alive)
    }

    /// Physics body of an entity
    pub fn body(&self, key: EntityKey) -> Option<&RigidBody2D> {
        self.entities.get(key).and_then(|e| self.physics.get_body(e.body))
    }

    pub fn body_mut(&mut self, key: EntityKey) -> Option<&mut RigidBody2D> {
        let body = self.entities.get(key)?.body;
        self.physics.get_body_mut(body)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn alive_count(&self) -> usize {
        self.entities.values().filter(|e| e.alive).count()
    }

    pub fn keys(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.entities.keys()
    }

    pub fn find_by_name(&self, name: &str) -> Option<EntityKey> {
        self.entities
            .iter()
            .find(|(_, e)| e.name.as_deref() == Some(name))
            .map(|(k, _)| k)
    }

    /// Entities in the active kinematic set
    pub fn kinematic_entities(&self) -> &[EntityKey] {
        &self.kinematic
    }

    // --- Lifecycle ---

    /// Create a detached entity
    pub fn create(&mut self, desc: EntityDesc) -> Result<EntityKey, EntityError> {
        if !desc.is_valid() {
            return Err(EntityError::StaticWithVelocity);
        }
        let node = desc.descriptor.build_node(&mut self.scene);
        let key = self.insert_entity(desc, node);
        log::debug!("created entity {:?}", key);
        Ok(key)
    }

    /// Create and register
    pub fn spawn(&mut self, desc: EntityDesc) -> Result<EntityKey, EntityError> {
        let key = self.create(desc)?;
        self.register(key);
        Ok(key)
    }

    fn insert_entity(&mut self, desc: EntityDesc, node: NodeKey) -> EntityKey {
        let (mass, moment) = desc.mass_properties();
        let body = RigidBody2D::with_kind_at(desc.kind, desc.position)
            .with_angle(desc.angle)
            .with_velocity(desc.velocity.unwrap_or(Vec2::ZERO))
            .with_angular_velocity(desc.angular_velocity.unwrap_or(0.0))
            .with_mass(mass, moment);
        let body = self.physics.insert_detached(body);

        let EntityDesc { descriptor, position, angle, class, name, decomposable, behavior, handler, .. } = desc;
        let parts = match &descriptor.kind {
            DescriptorKind::Compound { parts } if decomposable => parts.clone(),
            _ => Vec::new(),
        };

        let key = self.entities.insert(Entity {
            name,
            class,
            body,
            node,
            shape_defs: descriptor.shape_defs(),
            descriptor,
            shape_keys: Vec::new(),
            alive: false,
            collidable: true,
            transience: None,
            behavior,
            handler,
            decomposable: !parts.is_empty(),
            children: Vec::new(),
            parent: None,
            child_angle: 0.0,
        });
        self.body_owner.insert(body, key);

        if !parts.is_empty() {
            let child_nodes = self.scene.get(node).map(|n| n.children().to_vec()).unwrap_or_default();
            let mut children = Vec::with_capacity(parts.len());
            for (part, child_node) in parts.iter().zip(child_nodes) {
                let child = self.insert_entity(EntityDesc::from_part(part, position, angle), child_node);
                if let Some(entity) = self.entities.get_mut(child) {
                    entity.parent = Some(key);
                    entity.child_angle = part.angle;
                }
                children.push(child);
            }
            if let Some(entity) = self.entities.get_mut(key) {
                entity.children = children;
            }
        }
        key
    }

    /// Make an entity alive: body simulated, shapes in the physics world,
    /// node in the scene. Returns `false` if nothing changed.
    pub fn register(&mut self, key: EntityKey) -> bool {
        let Some(entity) = self.entities.get_mut(key) else {
            log::trace!("register: unknown entity {:?}", key);
            return false;
        };
        if entity.alive {
            log::trace!("register: {:?} already alive", key);
            return false;
        }
        if entity.parent.is_some() {
            log::trace!("register: {:?} is still part of a compound", key);
            return false;
        }
        entity.alive = true;
        let body = entity.body;
        let node = entity.node;
        let class = entity.class;
        let handler = entity.handler.clone();
        let defs = if entity.collidable { entity.shape_defs.clone() } else { Vec::new() };

        let kind = self.physics.get_body(body).map_or(BodyKind::Static, |b| b.kind);
        if kind != BodyKind::Static {
            self.physics.attach_body(body);
        }
        let shape_keys = defs
            .iter()
            .filter_map(|def| self.physics.add_shape(body, def.to_shape(class)))
            .collect();
        if let Some(entity) = self.entities.get_mut(key) {
            entity.shape_keys = shape_keys;
        }

        self.scene.add_to_scene(node);
        if let Some(b) = self.physics.get_body(body) {
            sync_node(&mut self.scene, b, node);
        }
        if let Some(handler) = handler {
            self.handlers.insert(class, handler);
        }
        self.bind_gravity(key);
        if kind == BodyKind::Kinematic && !self.kinematic.contains(&key) {
            self.kinematic.push(key);
        }
        log::debug!("registered entity {:?}", key);
        true
    }

    /// Make an entity dead: shapes removed, body detached, node out of the
    /// scene, finalize hook run. Returns `false` if nothing changed.
    pub fn unregister(&mut self, key: EntityKey) -> bool {
        let Some(entity) = self.entities.get_mut(key) else {
            log::trace!("unregister: unknown entity {:?}", key);
            return false;
        };
        if !entity.alive {
            log::trace!("unregister: {:?} already dead", key);
            return false;
        }
        entity.alive = false;
        let shape_keys = std::mem::take(&mut entity.shape_keys);
        let behavior = entity.behavior.take();
        let body = entity.body;
        let node = entity.node;

        for shape in shape_keys {
            self.physics.remove_shape(shape);
        }
        self.physics.detach_body(body);
        self.physics.clear_velocity_hook(body);
        self.scene.remove_from_scene(node);
        self.kinematic.retain(|&k| k != key);
        if self.trace.target() == Some(key) {
            self.trace.stop(&mut self.scene);
        }

        if let Some(mut behavior) = behavior {
            if let Some(ctx) = self.finalize_context(key) {
                behavior.on_finalize(&ctx, &mut self.commands);
            }
            if let Some(entity) = self.entities.get_mut(key) {
                entity.behavior = Some(behavior);
            }
        }
        log::debug!("unregistered entity {:?}", key);
        self.flush_commands();
        true
    }

    fn finalize_context(&self, key: EntityKey) -> Option<FinalizeContext> {
        let body = self.body(key)?;
        Some(FinalizeContext {
            entity: key,
            position: body.position,
            angle: body.angle,
            velocity: body.velocity,
            angular_velocity: body.angular_velocity,
            time: self.clock.time(),
        })
    }

    /// Unregister and release storage, including parts of an intact compound
    pub fn despawn(&mut self, key: EntityKey) -> bool {
        if !self.entities.contains_key(key) {
            return false;
        }
        self.unregister(key);
        self.timeline.remove_entity(key);
        self.pending_kinematic.retain(|&k| k != key);
        self.pending_removals.retain(|&k| k != key);
        self.kinematic.retain(|&k| k != key);

        let Some(entity) = self.entities.remove(key) else {
            return false;
        };
        self.physics.remove_body(entity.body);
        self.body_owner.remove(entity.body);
        self.scene.destroy(entity.node);
        if let Some(parent) = entity.parent.and_then(|p| self.entities.get_mut(p)) {
            parent.children.retain(|&k| k != key);
        }
        for child in entity.children {
            self.despawn(child);
        }
        if self.gravity.as_ref().is_some_and(|g| g.attractor == key) {
            self.clear_central_gravity();
        }
        log::debug!("despawned entity {:?}", key);
        true
    }

    /// Schedule removal at `now + duration`
    pub fn mark_transient(&mut self, key: EntityKey, duration: f64, fading: bool) {
        self.mark_group_transient(vec![key], duration, fading);
    }

    /// Schedule a group for removal in the same tick. A member already
    /// scheduled is moved to the new record.
    pub fn mark_group_transient(&mut self, keys: Vec<EntityKey>, duration: f64, fading: bool) {
        let now = self.clock.time();
        let keys: Vec<EntityKey> = keys.into_iter().filter(|&k| self.entities.contains_key(k)).collect();
        for &key in &keys {
            if let Some(entity) = self.entities.get_mut(key) {
                entity.transience = Some(Transience { fade_start: now, end_time: now + duration, fading });
                if !fading {
                    self.scene.set_opacity(entity.node, 1.0);
                }
            }
        }
        self.timeline.insert(keys, now, duration, fading);
    }

    /// Demote to kinematic at the next tick boundary
    pub fn declare_kinematic(&mut self, key: EntityKey) {
        if self.entities.contains_key(key) && !self.pending_kinematic.contains(&key) {
            self.pending_kinematic.push(key);
        }
    }

    /// Unregister at the next tick boundary
    pub fn queue_removal(&mut self, key: EntityKey) {
        if self.entities.contains_key(key) && !self.pending_removals.contains(&key) {
            self.pending_removals.push(key);
        }
    }

    // --- Content hooks ---

    pub fn set_collision_handler(&mut self, class: CollisionClass, handler: impl CollisionHandler + 'static) {
        self.handlers.insert(class, Arc::new(handler));
    }

    pub fn has_collision_handler(&self, class: CollisionClass) -> bool {
        self.handlers.contains_key(&class)
    }

    /// Pull every alive dynamic entity toward `attractor`, replacing the
    /// uniform gravity. Entities registered later are bound too.
    pub fn set_central_gravity(&mut self, attractor: EntityKey, force: f32, radius: f32) -> Result<(), EntityError> {
        let body = self.entities.get(attractor).ok_or(EntityError::UnknownEntity)?.body;
        self.clear_central_gravity();
        self.gravity = Some(GravityField {
            attractor,
            hook: Arc::new(CentralGravity { attractor: body, force, radius }),
        });
        let alive: Vec<EntityKey> = self.entities.iter().filter(|(_, e)| e.alive).map(|(k, _)| k).collect();
        for key in alive {
            self.bind_gravity(key);
        }
        log::info!("central gravity around {:?} (force {}, radius {})", attractor, force, radius);
        Ok(())
    }

    pub fn clear_central_gravity(&mut self) {
        if self.gravity.take().is_none() {
            return;
        }
        for entity in self.entities.values() {
            self.physics.clear_velocity_hook(entity.body);
        }
    }

    /// Attractor, force and radius of the active field
    pub fn central_gravity(&self) -> Option<(EntityKey, f32, f32)> {
        self.gravity.as_ref().map(|g| (g.attractor, g.hook.force, g.hook.radius))
    }

    fn bind_gravity(&mut self, key: EntityKey) {
        let Some(field) = &self.gravity else {
            return;
        };
        if field.attractor == key {
            return;
        }
        let Some(entity) = self.entities.get(key).filter(|e| e.alive) else {
            return;
        };
        if self.physics.get_body(entity.body).is_some_and(|b| b.is_dynamic()) {
            self.physics.set_velocity_hook(entity.body, field.hook.clone());
        }
    }

    /// Start tracing `key`, or stop if it is already traced. Returns whether
    /// a trace is active afterwards.
    pub fn toggle_trace(&mut self, key: EntityKey) -> bool {
        if self.trace.target() == Some(key) {
            self.trace.stop(&mut self.scene);
            return false;
        }
        if !self.is_alive(key) {
            return false;
        }
        self.trace.start(&mut self.scene, key);
        true
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    // --- Tick pipeline ---

    /// Phases before input dispatch
    pub fn begin_tick(&mut self) {
        self.expire_transients();
        self.commit_kinematic();
        self.update_trace();
    }

    /// Phases after input dispatch
    pub fn finish_tick(&mut self) {
        self.flush_commands();
        self.process_removals();
        self.clock.advance();
        self.step_physics();
    }

    /// Full pipeline without input or render views
    pub fn tick(&mut self) {
        self.begin_tick();
        self.finish_tick();
    }

    /// Remove expired groups, then fade the remaining fading groups
    pub fn expire_transients(&mut self) {
        let now = self.clock.time();
        for record in self.timeline.pop_expired(now) {
            for key in record.group {
                self.despawn(key);
            }
        }
        for record in self.timeline.records().iter().filter(|r| r.fading) {
            let opacity = record.opacity_at(now);
            for &key in &record.group {
                if let Some(entity) = self.entities.get(key) {
                    self.scene.set_opacity(entity.node, opacity);
                }
            }
        }
    }

    /// Apply pending kinematic conversions, then drive the kinematic set
    pub fn commit_kinematic(&mut self) {
        for key in std::mem::take(&mut self.pending_kinematic) {
            let Some(entity) = self.entities.get_mut(key) else {
                continue;
            };
            if !entity.alive {
                log::trace!("declare_kinematic: {:?} is dead", key);
                continue;
            }
            entity.collidable = false;
            let shapes = std::mem::take(&mut entity.shape_keys);
            let body = entity.body;
            for shape in shapes {
                self.physics.remove_shape(shape);
            }
            if let Some(b) = self.physics.get_body_mut(body) {
                b.set_kind(BodyKind::Kinematic);
            }
            self.physics.clear_velocity_hook(body);
            if !self.kinematic.contains(&key) {
                self.kinematic.push(key);
            }
            log::debug!("entity {:?} is now kinematic", key);
        }

        let clock = self.clock;
        for key in self.kinematic.clone() {
            let Some(entity) = self.entities.get_mut(key) else {
                continue;
            };
            let Some(mut behavior) = entity.behavior.take() else {
                continue;
            };
            let result = match self.physics.get_body_mut(entity.body) {
                Some(body) => behavior.update_velocity(body, &clock),
                None => Ok(()),
            };
            entity.behavior = Some(behavior);
            if let Err(e) = result {
                log::error!("entity {:?}: {}", key, e);
                self.queue_removal(key);
            }
        }
    }

    /// Extend the trail of the traced entity
    pub fn update_trace(&mut self) {
        let Some(target) = self.trace.target() else {
            return;
        };
        let position = self
            .entities
            .get(target)
            .filter(|e| e.alive)
            .and_then(|e| self.physics.get_body(e.body))
            .map(|b| b.position);
        match position {
            Some(position) => {
                self.trace
                    .record(&mut self.scene, position, self.config.trace_length, self.config.trace_max_segments)
            }
            None => self.trace.stop(&mut self.scene),
        }
    }

    pub fn process_removals(&mut self) {
        for key in std::mem::take(&mut self.pending_removals) {
            self.unregister(key);
        }
    }

    /// Step the physics engine, then copy body state into the scene
    pub fn step_physics(&mut self) {
        let dt = self.clock.dt() as f32;
        if dt > 0.0 {
            let mut listener = WorldListener {
                owners: &self.body_owner,
                handlers: &self.handlers,
                commands: &mut self.commands,
                time: self.clock.time(),
            };
            self.physics.step_with(dt, &mut listener);
        }
        self.sync_to_render();
        self.enforce_universe();
        self.flush_commands();
    }

    /// Copy body position and angle of every alive moving entity into its node
    pub fn sync_to_render(&mut self) {
        for entity in self.entities.values().filter(|e| e.alive) {
            if let Some(body) = self.physics.get_body(entity.body) {
                if body.kind != BodyKind::Static {
                    sync_node(&mut self.scene, body, entity.node);
                }
            }
        }
    }

    fn enforce_universe(&mut self) {
        let limit = self.config.universe_size;
        let escaped: Vec<EntityKey> = self
            .entities
            .iter()
            .filter(|(_, e)| e.alive)
            .filter(|(_, e)| {
                self.physics
                    .get_body(e.body)
                    .is_some_and(|b| b.position.x.abs() > limit || b.position.y.abs() > limit)
            })
            .map(|(k, _)| k)
            .collect();
        for key in escaped {
            log::warn!("entity {:?} left the universe", key);
            self.queue_removal(key);
        }
    }

    /// Apply buffered commands, including those pushed while applying
    pub fn flush_commands(&mut self) {
        if self.flushing {
            return;
        }
        self.flushing = true;
        while !self.commands.is_empty() {
            for command in self.commands.take() {
                self.apply(command);
            }
        }
        self.flushing = false;
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Remove(key) => self.queue_removal(key),
            Command::DeclareKinematic(key) => self.declare_kinematic(key),
            Command::MarkTransient { entities, duration, fading } => {
                self.mark_group_transient(entities, duration, fading)
            }
            Command::Decompose { entity, recursive } => {
                if let Err(e) = self.decompose(entity, recursive) {
                    log::warn!("cannot decompose {:?}: {}", entity, e);
                }
            }
            Command::Spawn { desc, transient } => match self.spawn(*desc) {
                Ok(key) => {
                    if let Some((duration, fading)) = transient {
                        self.mark_transient(key, duration, fading);
                    }
                }
                Err(e) => log::error!("cannot spawn entity: {}", e),
            },
            Command::ApplyImpulse { entity, impulse, point } => {
                if let Some(body) = self.body_mut(entity) {
                    body.apply_impulse_at_world_point(impulse, point);
                }
            }
            Command::SetVelocity { entity, velocity, angular_velocity } => {
                if let Some(body) = self.body_mut(entity).filter(|b| b.kind != BodyKind::Static) {
                    body.velocity = velocity;
                    body.angular_velocity = angular_velocity;
                }
            }
        }
    }
}

/// Place a node so its pivot sits on the body origin, turned by the body angle
fn sync_node(scene: &mut SceneGraph, body: &RigidBody2D, node: NodeKey) {
    let pivot = scene.get(node).map_or(Vec2::ZERO, |n| n.transform().pivot);
    scene.set_rotation(node, body.angle);
    scene.set_position(node, body.position - pivot);
}

/// Routes first contacts to the collision handlers of both classes
struct WorldListener<'a> {
    owners: &'a SecondaryMap<BodyKey, EntityKey>,
    handlers: &'a HashMap<CollisionClass, Arc<dyn CollisionHandler>>,
    commands: &'a mut Commands,
    time: f64,
}

impl WorldListener<'_> {
    fn event(&self, arbiter: &Arbiter) -> Option<CollisionEvent> {
        Some(CollisionEvent {
            entity: *self.owners.get(arbiter.body_a)?,
            other: *self.owners.get(arbiter.body_b)?,
            class: arbiter.class_a,
            other_class: arbiter.class_b,
            point: arbiter.contact.point,
            normal: arbiter.contact.normal,
            relative_velocity: arbiter.relative_velocity,
            time: self.time,
        })
    }
}

impl ContactListener for WorldListener<'_> {
    fn begin(&mut self, arbiter: &Arbiter) -> bool {
        let handlers = self.handlers;
        let mut accept = true;
        for arbiter in [*arbiter, arbiter.swapped()] {
            let Some(handler) = handlers.get(&arbiter.class_a) else {
                continue;
            };
            if let Some(event) = self.event(&arbiter) {
                accept &= handler.begin(&event, self.commands);
            }
        }
        accept
    }
}
