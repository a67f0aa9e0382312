//! Physics world and simulation
//!
//! Bodies are stored persistently and are either *attached* (simulated) or
//! detached (kept, but neither integrated nor reported). Shapes are stored
//! separately and refer to their body; a shape collides as soon as it is in
//! the world, whatever its body's membership. Static geometry therefore uses
//! a detached static body carrying attached shapes.

use std::collections::HashMap;
use std::sync::Arc;

use rust2d_math::Vec2;
use slotmap::{SecondaryMap, SlotMap};

use crate::body::{BodyKey, BodyKind, RigidBody2D};
use crate::collision::{rounded_hull_contact, CollisionClass, Contact};
use crate::shapes::{Aabb, Shape, ShapeKey};

/// Penetration left uncorrected to avoid jitter
const PENETRATION_SLOP: f32 = 0.01;
/// Fraction of the remaining penetration corrected per sub-step
const CORRECTION_PERCENT: f32 = 0.8;

/// Configuration for the physics simulation
#[derive(Clone, Debug)]
pub struct PhysicsConfig {
    /// Uniform gravity acceleration (+y is down)
    pub gravity: Vec2,
    /// Fraction of velocity kept per second (1.0 = no damping)
    pub damping: f32,
    /// Solver iterations per sub-step
    pub iterations: u32,
    /// Sub-steps per `step` call
    pub substeps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::ZERO,
            damping: 1.0,
            iterations: 10,
            substeps: 1,
        }
    }
}

impl PhysicsConfig {
    /// Create a new physics config with the given gravity
    pub fn new(gravity: Vec2) -> Self {
        Self { gravity, ..Self::default() }
    }
}

/// Per-body override of the gravity used during velocity integration
///
/// Returns the acceleration applied to `body` in place of the world gravity.
pub trait VelocityHook: Send + Sync {
    fn acceleration(&self, key: BodyKey, body: &RigidBody2D, world: &PhysicsWorld) -> Vec2;
}

/// Contact pair handed to a listener when two shapes start touching
#[derive(Clone, Copy, Debug)]
pub struct Arbiter {
    pub shape_a: ShapeKey,
    pub shape_b: ShapeKey,
    pub body_a: BodyKey,
    pub body_b: BodyKey,
    pub class_a: CollisionClass,
    pub class_b: CollisionClass,
    /// Contact with its normal pointing from A to B
    pub contact: Contact,
    /// Velocity of B relative to A at the contact point
    pub relative_velocity: Vec2,
}

impl Arbiter {
    /// Same contact seen from shape B
    pub fn swapped(&self) -> Self {
        Self {
            shape_a: self.shape_b,
            shape_b: self.shape_a,
            body_a: self.body_b,
            body_b: self.body_a,
            class_a: self.class_b,
            class_b: self.class_a,
            contact: Contact::new(self.contact.point, -self.contact.normal, self.contact.penetration),
            relative_velocity: -self.relative_velocity,
        }
    }
}

/// Receives first-contact notifications during a step
pub trait ContactListener {
    /// Called once when two shapes start touching. Returning `false` ignores
    /// the pair until the shapes separate.
    fn begin(&mut self, arbiter: &Arbiter) -> bool;
}

/// Listener that accepts every contact
pub struct AcceptAll;

impl ContactListener for AcceptAll {
    fn begin(&mut self, _arbiter: &Arbiter) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug)]
struct ActiveContact {
    body_a: BodyKey,
    body_b: BodyKey,
    contact: Contact,
    friction: f32,
    bounce_velocity: f32,
    normal_impulse: f32,
    tangent_impulse: f32,
}

/// The physics world containing all rigid bodies and shapes
pub struct PhysicsWorld {
    /// All rigid bodies (using generational keys)
    bodies: SlotMap<BodyKey, RigidBody2D>,
    /// Bodies currently simulated
    attached: SecondaryMap<BodyKey, ()>,
    /// Collision shapes in the world
    shapes: SlotMap<ShapeKey, Shape>,
    /// Gravity overrides
    velocity_hooks: SecondaryMap<BodyKey, Arc<dyn VelocityHook>>,
    /// Touching pairs and whether their contact is processed
    touching: HashMap<(ShapeKey, ShapeKey), bool>,
    /// Physics configuration
    pub config: PhysicsConfig,
}

impl PhysicsWorld {
    /// Create a new physics world with default configuration
    pub fn new() -> Self {
        Self::with_config(PhysicsConfig::default())
    }

    /// Create a new physics world with custom configuration
    pub fn with_config(config: PhysicsConfig) -> Self {
        Self {
            bodies: SlotMap::with_key(),
            attached: SecondaryMap::new(),
            shapes: SlotMap::with_key(),
            velocity_hooks: SecondaryMap::new(),
            touching: HashMap::new(),
            config,
        }
    }

    /// Add a body to the world, attached, and return its key
    pub fn add_body(&mut self, body: RigidBody2D) -> BodyKey {
        let key = self.bodies.insert(body);
        self.attached.insert(key, ());
        key
    }

    /// Store a body without simulating it
    pub fn insert_detached(&mut self, body: RigidBody2D) -> BodyKey {
        self.bodies.insert(body)
    }

    /// Start simulating a stored body. Returns false if the key is stale.
    pub fn attach_body(&mut self, key: BodyKey) -> bool {
        if !self.bodies.contains_key(key) {
            return false;
        }
        self.attached.insert(key, ());
        true
    }

    /// Stop simulating a body; it stays stored
    pub fn detach_body(&mut self, key: BodyKey) {
        self.attached.remove(key);
    }

    /// Whether a body is simulated
    pub fn is_attached(&self, key: BodyKey) -> bool {
        self.attached.contains_key(key)
    }

    /// Remove a body and its shapes from the world and return it
    pub fn remove_body(&mut self, key: BodyKey) -> Option<RigidBody2D> {
        for shape in self.shapes_of(key) {
            self.remove_shape(shape);
        }
        self.attached.remove(key);
        self.velocity_hooks.remove(key);
        self.bodies.remove(key)
    }

    /// Get an immutable reference to a body by key
    pub fn get_body(&self, key: BodyKey) -> Option<&RigidBody2D> {
        self.bodies.get(key)
    }

    /// Get a mutable reference to a body by key
    pub fn get_body_mut(&mut self, key: BodyKey) -> Option<&mut RigidBody2D> {
        self.bodies.get_mut(key)
    }

    /// Get the number of stored bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Get the number of simulated bodies
    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    /// Iterate over all body keys
    pub fn body_keys(&self) -> impl Iterator<Item = BodyKey> + '_ {
        self.bodies.keys()
    }

    /// Add a shape bound to `body`. Returns `None` if the body does not exist.
    pub fn add_shape(&mut self, body: BodyKey, mut shape: Shape) -> Option<ShapeKey> {
        if !self.bodies.contains_key(body) {
            return None;
        }
        shape.body = Some(body);
        Some(self.shapes.insert(shape))
    }

    /// Remove a shape from the world; its body binding is cleared
    pub fn remove_shape(&mut self, key: ShapeKey) -> Option<Shape> {
        self.touching.retain(|&(a, b), _| a != key && b != key);
        self.shapes.remove(key).map(|mut shape| {
            shape.body = None;
            shape
        })
    }

    /// Get a shape by key
    pub fn get_shape(&self, key: ShapeKey) -> Option<&Shape> {
        self.shapes.get(key)
    }

    /// Keys of all shapes bound to `body`
    pub fn shapes_of(&self, body: BodyKey) -> Vec<ShapeKey> {
        self.shapes
            .iter()
            .filter(|(_, s)| s.body == Some(body))
            .map(|(k, _)| k)
            .collect()
    }

    /// Get the number of shapes in the world
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Number of shape pairs currently touching
    pub fn touching_count(&self) -> usize {
        self.touching.len()
    }

    /// Replace the gravity used to integrate `body`
    pub fn set_velocity_hook(&mut self, body: BodyKey, hook: Arc<dyn VelocityHook>) {
        if self.bodies.contains_key(body) {
            self.velocity_hooks.insert(body, hook);
        }
    }

    /// Restore world gravity for `body`
    pub fn clear_velocity_hook(&mut self, body: BodyKey) {
        self.velocity_hooks.remove(body);
    }

    /// Whether `body` has a gravity override
    pub fn has_velocity_hook(&self, body: BodyKey) -> bool {
        self.velocity_hooks.contains_key(body)
    }

    /// Step the physics simulation forward by dt seconds
    pub fn step(&mut self, dt: f32) {
        self.step_with(dt, &mut AcceptAll);
    }

    /// Step the simulation, reporting new contacts to `listener`
    ///
    /// Each sub-step performs:
    /// 1. Velocity integration of attached dynamic bodies (gravity or hook, forces, damping)
    /// 2. Position integration of attached dynamic and kinematic bodies
    /// 3. Contact detection and first-contact notification
    /// 4. Impulse resolution with restitution and friction
    /// 5. Positional correction
    pub fn step_with(&mut self, dt: f32, listener: &mut dyn ContactListener) {
        let substeps = self.config.substeps.max(1);
        let h = dt / substeps as f32;
        for _ in 0..substeps {
            self.integrate_velocities(h);
            self.integrate_positions(h);
            let mut contacts = self.detect_contacts(listener);
            self.solve_velocities(&mut contacts);
            self.correct_positions(&contacts);
        }
        for (_, body) in &mut self.bodies {
            body.force = Vec2::ZERO;
            body.torque = 0.0;
        }
    }

    fn integrate_velocities(&mut self, dt: f32) {
        let accelerations: Vec<(BodyKey, Vec2)> = self
            .attached
            .keys()
            .filter_map(|key| {
                let body = self.bodies.get(key)?;
                if !body.is_dynamic() {
                    return None;
                }
                let gravity = match self.velocity_hooks.get(key) {
                    Some(hook) => hook.acceleration(key, body, self),
                    None => self.config.gravity,
                };
                Some((key, gravity))
            })
            .collect();

        let damping = self.config.damping.clamp(0.0, 1.0).powf(dt);
        for (key, gravity) in accelerations {
            if let Some(body) = self.bodies.get_mut(key) {
                let inv_mass = body.inverse_mass();
                let inv_moment = body.inverse_moment();
                body.velocity = body.velocity * damping + (gravity + body.force * inv_mass) * dt;
                body.angular_velocity = body.angular_velocity * damping + body.torque * inv_moment * dt;
            }
        }
    }

    fn integrate_positions(&mut self, dt: f32) {
        for key in self.attached.keys() {
            if let Some(body) = self.bodies.get_mut(key) {
                if body.kind == BodyKind::Static {
                    continue;
                }
                body.position += body.velocity * dt;
                body.angle += body.angular_velocity * dt;
            }
        }
    }

    fn detect_contacts(&mut self, listener: &mut dyn ContactListener) -> Vec<ActiveContact> {
        struct Candidate {
            key: ShapeKey,
            body: BodyKey,
            hull: Vec<Vec2>,
            radius: f32,
            aabb: Aabb,
        }

        let candidates: Vec<Candidate> = self
            .shapes
            .iter()
            .filter_map(|(key, shape)| {
                let body_key = shape.body?;
                let body = self.bodies.get(body_key)?;
                let (hull, radius) = shape.geometry.world_hull(body);
                let aabb = Aabb::from_points(&hull, radius);
                Some(Candidate { key, body: body_key, hull, radius, aabb })
            })
            .collect();

        let mut still_touching: HashMap<(ShapeKey, ShapeKey), bool> = HashMap::new();
        let mut active = Vec::new();

        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                let (a, b) = (&candidates[i], &candidates[j]);
                if a.body == b.body || !a.aabb.overlaps(&b.aabb) {
                    continue;
                }
                let (Some(body_a), Some(body_b)) = (self.bodies.get(a.body), self.bodies.get(b.body)) else {
                    continue;
                };
                if !body_a.is_dynamic() && !body_b.is_dynamic() {
                    continue;
                }
                let (Some(shape_a), Some(shape_b)) = (self.shapes.get(a.key), self.shapes.get(b.key)) else {
                    continue;
                };
                if !shape_a.filter.collides_with(&shape_b.filter) {
                    continue;
                }
                let Some(contact) = rounded_hull_contact(&a.hull, a.radius, &b.hull, b.radius) else {
                    continue;
                };

                let pair = (a.key, b.key);
                let relative_velocity =
                    body_b.velocity_at_world_point(contact.point) - body_a.velocity_at_world_point(contact.point);
                let processed = match self.touching.get(&pair) {
                    Some(&processed) => processed,
                    None => {
                        let arbiter = Arbiter {
                            shape_a: a.key,
                            shape_b: b.key,
                            body_a: a.body,
                            body_b: b.body,
                            class_a: shape_a.collision_class,
                            class_b: shape_b.collision_class,
                            contact,
                            relative_velocity,
                        };
                        listener.begin(&arbiter)
                    }
                };
                still_touching.insert(pair, processed);
                if !processed {
                    continue;
                }

                let material = shape_a.material.combine(&shape_b.material);
                let approach = relative_velocity.dot(contact.normal);
                active.push(ActiveContact {
                    body_a: a.body,
                    body_b: b.body,
                    contact,
                    friction: material.friction,
                    bounce_velocity: if approach < 0.0 { -material.elasticity * approach } else { 0.0 },
                    normal_impulse: 0.0,
                    tangent_impulse: 0.0,
                });
            }
        }

        self.touching = still_touching;
        active
    }

    fn solve_velocities(&mut self, contacts: &mut [ActiveContact]) {
        for _ in 0..self.config.iterations.max(1) {
            for c in contacts.iter_mut() {
                let Some([a, b]) = self.bodies.get_disjoint_mut([c.body_a, c.body_b]) else {
                    continue;
                };
                let n = c.contact.normal;
                let p = c.contact.point;
                let ra = p - a.position;
                let rb = p - b.position;
                let (ima, imb) = (a.inverse_mass(), b.inverse_mass());
                let (iia, iib) = (a.inverse_moment(), b.inverse_moment());

                let rel = b.velocity_at_world_point(p) - a.velocity_at_world_point(p);
                let rn_a = ra.cross(n);
                let rn_b = rb.cross(n);
                let k_normal = ima + imb + rn_a * rn_a * iia + rn_b * rn_b * iib;
                if k_normal <= 0.0 {
                    continue;
                }
                let vn = rel.dot(n);
                let lambda = -(vn - c.bounce_velocity) / k_normal;
                let accumulated = (c.normal_impulse + lambda).max(0.0);
                let applied = accumulated - c.normal_impulse;
                c.normal_impulse = accumulated;
                let impulse = n * applied;
                a.apply_impulse_at_world_point(-impulse, p);
                b.apply_impulse_at_world_point(impulse, p);

                let t = n.perp();
                let rel = b.velocity_at_world_point(p) - a.velocity_at_world_point(p);
                let rt_a = ra.cross(t);
                let rt_b = rb.cross(t);
                let k_tangent = ima + imb + rt_a * rt_a * iia + rt_b * rt_b * iib;
                if k_tangent <= 0.0 {
                    continue;
                }
                let lambda = -rel.dot(t) / k_tangent;
                let limit = c.friction * c.normal_impulse;
                let accumulated = (c.tangent_impulse + lambda).clamp(-limit, limit);
                let applied = accumulated - c.tangent_impulse;
                c.tangent_impulse = accumulated;
                let impulse = t * applied;
                a.apply_impulse_at_world_point(-impulse, p);
                b.apply_impulse_at_world_point(impulse, p);
            }
        }
    }

    fn correct_positions(&mut self, contacts: &[ActiveContact]) {
        for c in contacts {
            let Some([a, b]) = self.bodies.get_disjoint_mut([c.body_a, c.body_b]) else {
                continue;
            };
            let (ima, imb) = (a.inverse_mass(), b.inverse_mass());
            let total = ima + imb;
            if total <= 0.0 {
                continue;
            }
            let depth = (c.contact.penetration - PENETRATION_SLOP).max(0.0) * CORRECTION_PERCENT;
            let correction = c.contact.normal * (depth / total);
            a.apply_correction(-correction * ima);
            b.apply_correction(correction * imb);
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
