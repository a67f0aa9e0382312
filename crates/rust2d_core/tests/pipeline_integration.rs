//! Integration tests for the tick pipeline
//!
//! These tests drive a World through whole ticks and check that:
//! 1. Alive entities stay in step with their bodies
//! 2. Transient entities fade and expire at the scheduled tick
//! 3. Central gravity is continuous across the reference radius
//! 4. Decomposition preserves momentum and placement
//! 5. Lifecycle calls are idempotent
//! 6. Kinematic conversion and collision handlers behave as deferred mutations

use rust2d_core::{
    Behavior, BehaviorError, BodyKind, Clock, CollisionClass, CollisionEvent, Commands, CompoundPart,
    EntityDesc, EntityKey, FinalizeContext, PhysicsConfig, RigidBody2D, ShapeDescriptor, Vec2, World,
    WorldConfig,
};

fn world_with_step(time_step: f64) -> World {
    World::with_config(WorldConfig { time_step, ..WorldConfig::default() }, PhysicsConfig::default())
}

fn ball(radius: f32, position: Vec2) -> EntityDesc {
    EntityDesc::new(ShapeDescriptor::circle(radius).with_density(1.0)).at(position)
}

fn run_until(world: &mut World, time: f64) {
    while world.clock().time() < time - world.clock().dt() * 0.5 {
        world.tick();
    }
}

// ==================== Synchronization ====================

/// Every alive moving entity's node follows its body after each tick
#[test]
fn test_nodes_follow_bodies() {
    let mut world = World::with_config(WorldConfig::default(), PhysicsConfig::new(Vec2::new(0.0, 50.0)));
    let mut keys = Vec::new();
    for i in 0..5 {
        let desc = ball(1.0, Vec2::new(i as f32 * 10.0, 0.0))
            .with_velocity(Vec2::new(3.0, -2.0 * i as f32))
            .with_angular_velocity(0.5 * i as f32);
        keys.push(world.spawn(desc).unwrap());
    }
    let text = world
        .spawn(EntityDesc::new(ShapeDescriptor::text("hello", 10.0)).at(Vec2::new(-50.0, 0.0)).with_angular_velocity(1.0))
        .unwrap();
    keys.push(text);

    for _ in 0..200 {
        world.tick();
        for &key in &keys {
            let body = world.body(key).unwrap();
            let entity = world.get(key).unwrap();
            let node = world.scene().get(entity.node()).unwrap();
            let anchor = world.scene().map_to_scene(entity.node(), node.transform().pivot).unwrap();
            assert!(
                (anchor - body.position).length() < 1e-3,
                "node anchor {:?} should match body position {:?}",
                anchor,
                body.position
            );
            assert_eq!(node.rotation(), body.angle, "node rotation should match body angle");
        }
    }
}

/// Alive entities are in both worlds; dead ones in neither
#[test]
fn test_alive_means_registered_everywhere() {
    let mut world = World::new();
    let key = world.create(ball(1.0, Vec2::ZERO)).unwrap();
    let body = world.get(key).unwrap().body();
    let node = world.get(key).unwrap().node();

    let check = |world: &World, alive: bool| {
        assert_eq!(world.is_alive(key), alive);
        assert_eq!(world.physics().is_attached(body), alive);
        assert_eq!(world.physics().shapes_of(body).is_empty(), !alive);
        assert_eq!(world.scene().is_in_scene(node), alive);
    };

    check(&world, false);
    world.register(key);
    check(&world, true);
    world.tick();
    check(&world, true);
    world.unregister(key);
    check(&world, false);
}

// ==================== Transient Timeline ====================

/// Mark at t=10 for 2s with fading at dt=0.01: half faded at t=11, alive
/// until the last tick before t=12, gone from every store afterwards
#[test]
fn test_transient_scenario() {
    let mut world = world_with_step(0.01);
    let key = world.spawn(ball(1.0, Vec2::ZERO)).unwrap();
    let node = world.get(key).unwrap().node();

    run_until(&mut world, 10.0);
    let marked_at = world.clock().time();
    assert!((marked_at - 10.0).abs() < 1e-6);
    world.mark_transient(key, 2.0, true);
    let end = marked_at + 2.0;

    let mut checked_half = false;
    loop {
        let before = world.clock().time();
        world.tick();
        if before >= end {
            assert!(!world.contains(key), "entity should be gone at t={}", before);
            break;
        }
        assert!(world.is_alive(key), "entity should be alive at t={}", before);
        if (before - (marked_at + 1.0)).abs() < 0.005 {
            let opacity = world.scene().get(node).unwrap().opacity();
            assert!((opacity - 0.5).abs() < 0.01, "opacity at t=11 was {}", opacity);
            checked_half = true;
        }
    }
    assert!(checked_half);
    assert_eq!(world.physics().body_count(), 0);
    assert_eq!(world.physics().shape_count(), 0);
    assert!(world.scene().get(node).is_none());
    assert!(world.timeline().is_empty());
}

/// Opacity of a fading entity never increases
#[test]
fn test_fade_is_monotonic() {
    let mut world = world_with_step(0.01);
    let key = world.spawn(ball(1.0, Vec2::ZERO)).unwrap();
    let node = world.get(key).unwrap().node();
    world.mark_transient(key, 1.0, true);

    let mut last = 1.0;
    while world.contains(key) {
        world.tick();
        if let Some(n) = world.scene().get(node) {
            assert!(n.opacity() <= last);
            assert!((0.0..=1.0).contains(&n.opacity()));
            last = n.opacity();
        }
    }
}

/// A group marked together is removed in the same tick; re-marking replaces
#[test]
fn test_group_expiry_and_remark() {
    let mut world = world_with_step(0.01);
    let a = world.spawn(ball(1.0, Vec2::new(0.0, 0.0))).unwrap();
    let b = world.spawn(ball(1.0, Vec2::new(10.0, 0.0))).unwrap();
    let c = world.spawn(ball(1.0, Vec2::new(20.0, 0.0))).unwrap();
    world.mark_group_transient(vec![a, b, c], 0.5, false);
    world.mark_transient(c, 5.0, false);
    assert_eq!(world.timeline().len(), 2);

    run_until(&mut world, 0.6);
    assert!(!world.contains(a));
    assert!(!world.contains(b));
    assert!(world.is_alive(c));
}

// ==================== Central Gravity ====================

/// Acceleration just inside and just outside the radius agree
#[test]
fn test_gravity_continuous_at_radius() {
    let radius = 50.0;
    let mut world = world_with_step(0.01);
    let planet = world
        .spawn(EntityDesc::new(ShapeDescriptor::circle(radius).airy()).with_kind(BodyKind::Static))
        .unwrap();
    let inside = world.spawn(EntityDesc::new(ShapeDescriptor::circle(1.0).airy()).at(Vec2::new(radius - 1e-3, 0.0))).unwrap();
    let outside = world.spawn(EntityDesc::new(ShapeDescriptor::circle(1.0).airy()).at(Vec2::new(-(radius + 1e-3), 0.0))).unwrap();
    world.set_central_gravity(planet, 1e6, radius).unwrap();

    world.tick();
    let v_in = world.body(inside).unwrap().velocity;
    let v_out = world.body(outside).unwrap().velocity;
    assert!(v_in.x < 0.0, "inside probe pulled toward the planet");
    assert!(v_out.x > 0.0, "outside probe pulled toward the planet");
    assert!((v_in.length() - v_out.length()).abs() / v_out.length() < 1e-3);
    assert_eq!(world.body(planet).unwrap().velocity, Vec2::ZERO);
}

/// Entities registered after the field is set are bound; unbound ones use world gravity
#[test]
fn test_gravity_binding_on_register() {
    let mut world = World::with_config(WorldConfig::default(), PhysicsConfig::new(Vec2::new(0.0, 10.0)));
    let planet = world.spawn(EntityDesc::new(ShapeDescriptor::circle(5.0).airy()).with_kind(BodyKind::Static)).unwrap();
    world.set_central_gravity(planet, 1e4, 5.0).unwrap();

    let late = world.spawn(EntityDesc::new(ShapeDescriptor::circle(1.0).airy()).at(Vec2::new(100.0, 0.0))).unwrap();
    let late_body = world.get(late).unwrap().body();
    assert!(world.physics().has_velocity_hook(late_body));

    world.clear_central_gravity();
    assert!(!world.physics().has_velocity_hook(late_body));
    world.tick();
    assert!(world.body(late).unwrap().velocity.y > 0.0);
}

// ==================== Decomposition ====================

/// Each piece moves with the velocity of the point it occupied
#[test]
fn test_decomposition_preserves_momentum() {
    let velocity = Vec2::new(3.0, -1.0);
    let omega = 0.7;
    let desc = EntityDesc::new(ShapeDescriptor::compound(vec![
        CompoundPart::new(ShapeDescriptor::circle(2.0).with_density(1.0), Vec2::new(0.0, -10.0)),
        CompoundPart::new(ShapeDescriptor::circle(2.0).with_density(1.0), Vec2::new(0.0, 10.0)),
    ]))
    .at(Vec2::new(40.0, 40.0))
    .with_angle(0.3)
    .with_velocity(velocity)
    .with_angular_velocity(omega)
    .decomposable();

    let mut world = World::new();
    let ship = world.spawn(desc).unwrap();
    for _ in 0..20 {
        world.tick();
    }
    let compound: RigidBody2D = world.body(ship).unwrap().clone();
    let total_before = compound.velocity * compound.mass;

    let pieces = world.decompose(ship, false).unwrap();
    let mut total_after = Vec2::ZERO;
    for &piece in &pieces {
        let body = world.body(piece).unwrap();
        let r = body.position - compound.position;
        let expected = compound.velocity + Vec2::cross_scalar(compound.angular_velocity, r);
        assert!((body.velocity - expected).length() < 1e-4);
        assert_eq!(body.angular_velocity, compound.angular_velocity);
        assert!((r.length() - 10.0).abs() < 1e-3, "piece keeps its distance from the origin");
        total_after += body.velocity * body.mass;
    }
    assert!((total_before - total_after).length() < 1e-2);
}

// ==================== Lifecycle ====================

/// Redundant calls change nothing
#[test]
fn test_idempotent_lifecycle() {
    let mut world = World::new();
    let key = world.spawn(ball(1.0, Vec2::ZERO)).unwrap();
    assert!(!world.register(key));
    assert_eq!(world.physics().shape_count(), 1);

    world.declare_kinematic(key);
    world.declare_kinematic(key);
    world.queue_removal(key);
    world.queue_removal(key);
    world.tick();
    assert!(!world.is_alive(key));
    assert!(!world.unregister(key));

    world.declare_kinematic(key);
    world.tick();
    assert_eq!(world.physics().shape_count(), 0);
}

// ==================== Kinematic Conversion ====================

struct Slide {
    speed: f32,
}

impl Behavior for Slide {
    fn update_velocity(&mut self, body: &mut RigidBody2D, clock: &Clock) -> Result<(), BehaviorError> {
        body.velocity = Vec2::new(self.speed * (clock.time() as f32).cos(), 0.0);
        Ok(())
    }
}

struct Broken;

impl Behavior for Broken {
    fn update_velocity(&mut self, _body: &mut RigidBody2D, _clock: &Clock) -> Result<(), BehaviorError> {
        Err(BehaviorError::new("actuator jammed"))
    }
}

/// Conversion is deferred to the next tick, strips shapes and hands the body to the behavior
#[test]
fn test_kinematic_conversion() {
    let mut world = World::new();
    let key = world.spawn(ball(1.0, Vec2::ZERO).with_behavior(Slide { speed: 4.0 })).unwrap();
    world.declare_kinematic(key);
    assert_eq!(world.physics().shape_count(), 1, "conversion waits for the tick boundary");

    world.tick();
    let entity = world.get(key).unwrap();
    assert!(!entity.is_collidable());
    assert!(entity.shape_keys().is_empty());
    assert_eq!(world.body(key).unwrap().kind, BodyKind::Kinematic);
    assert_eq!(world.kinematic_entities(), &[key]);
    assert!((world.body(key).unwrap().velocity.x - 4.0).abs() < 1e-3);

    world.unregister(key);
    assert!(world.kinematic_entities().is_empty());
    world.register(key);
    assert_eq!(world.physics().shape_count(), 0, "converted entities stay without shapes");
    assert_eq!(world.kinematic_entities(), &[key]);
}

/// Kinematic entities created as such are driven from their first tick
#[test]
fn test_kinematic_at_creation() {
    let mut world = World::new();
    let key = world
        .spawn(ball(1.0, Vec2::ZERO).with_kind(BodyKind::Kinematic).with_behavior(Slide { speed: 2.0 }))
        .unwrap();
    assert_eq!(world.physics().shape_count(), 1, "kinematic bodies created as such collide");
    world.tick();
    assert!(world.body(key).unwrap().position.x > 0.0);
}

/// A failing behavior removes its entity without stopping the tick
#[test]
fn test_failing_behavior_is_contained() {
    let mut world = World::new();
    let broken = world.spawn(ball(1.0, Vec2::ZERO).with_kind(BodyKind::Kinematic).with_behavior(Broken)).unwrap();
    let other = world.spawn(ball(1.0, Vec2::new(10.0, 0.0)).with_velocity(Vec2::X)).unwrap();
    world.tick();
    assert!(!world.is_alive(broken));
    assert!(world.is_alive(other));
    assert!(world.body(other).unwrap().position.x > 10.0);
}

// ==================== Callbacks ====================

const BULLET: CollisionClass = CollisionClass::named("bullet");

/// A hit demotes the target and schedules it; the bullet is removed
#[test]
fn test_collision_handler_defers_mutations() {
    let mut world = World::new();
    world.set_collision_handler(BULLET, |event: &CollisionEvent, commands: &mut Commands| {
        commands.mark_transient(event.other, 0.25, true);
        commands.declare_kinematic(event.other);
        commands.remove(event.entity);
        true
    });

    let target = world.spawn(ball(2.0, Vec2::ZERO)).unwrap();
    let bullet = world
        .spawn(ball(1.0, Vec2::new(-10.0, 0.0)).with_velocity(Vec2::new(1000.0, 0.0)).with_class(BULLET))
        .unwrap();

    for _ in 0..5 {
        world.tick();
    }
    assert!(!world.is_alive(bullet));
    assert!(world.get(target).unwrap().transience().is_some());
    assert_eq!(world.body(target).unwrap().kind, BodyKind::Kinematic);
}

struct Bomb {
    debris: usize,
}

impl Behavior for Bomb {
    fn on_finalize(&mut self, ctx: &FinalizeContext, commands: &mut Commands) {
        for i in 0..self.debris {
            let direction = Vec2::from_angle(i as f32 * std::f32::consts::TAU / self.debris as f32);
            let desc = EntityDesc::new(ShapeDescriptor::circle(0.2))
                .at(ctx.position + direction * 2.0)
                .with_velocity(direction * 50.0);
            commands.spawn_transient(desc, 1.0, true);
        }
    }
}

/// Finalize hooks spawn follow-on entities right after the removal
#[test]
fn test_finalize_spawns_debris() {
    let mut world = World::new();
    let bomb = world.spawn(ball(1.0, Vec2::new(5.0, 5.0)).with_behavior(Bomb { debris: 6 })).unwrap();
    world.queue_removal(bomb);
    world.tick();

    assert!(!world.is_alive(bomb));
    let debris: Vec<EntityKey> = world.keys().filter(|&k| k != bomb).collect();
    assert_eq!(debris.len(), 6);
    assert!(debris.iter().all(|&k| world.is_alive(k)));
    assert_eq!(world.timeline().len(), 6);
}
