//! DemoBuilder - Declarative demo construction
//!
//! Provides a fluent API for populating a world with the demo's content and
//! the `DemoGame` that reacts to the bound actions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rust2d_core::{
    Behavior, BehaviorError, BodyKind, Clock, CollisionClass, CollisionEvent, CollisionFilter, Commands,
    CompoundPart, EntityDesc, EntityError, EntityKey, FinalizeContext, Game, MarchStyle, Material,
    PhysicsConfig, PhysicsMaterial, RigidBody2D, Scene, SceneLoadError, ShapeDescriptor, Vec2, World,
    WorldConfig,
};

use crate::input::DemoAction;

pub const PLANET: CollisionClass = CollisionClass::named("planet");
pub const SHIP: CollisionClass = CollisionClass::named("ship");
pub const BULLET: CollisionClass = CollisionClass::named("bullet");
pub const TARGET: CollisionClass = CollisionClass::named("target");

/// Name given to the player's ship
pub const SHIP_NAME: &str = "ship";

const BULLET_SPEED: f32 = 300.0;
const BULLET_LIFETIME: f64 = 2.0;
const THRUST: f32 = 80.0;
const TURN_STEP: f32 = 0.03;
const BOMB_FUSE: f64 = 1.0;
const BOMB_DEBRIS: usize = 8;
const DEBRIS_SPEED: f32 = 60.0;
const DEBRIS_LIFETIME: f64 = 1.5;
const HIT_FADE: f64 = 0.25;

/// Default ground for the terrain level; `#` cells are rock
pub const TERRAIN_ROWS: &[&str] = &[
    "..........................",
    "...........####...........",
    "..........######..........",
    "..........................",
    "....##..............###...",
    "...####............#####..",
    "##########################",
];

/// Error building the demo
#[derive(Debug)]
pub enum DemoError {
    /// A level entity could not be created
    Entity(EntityError),
    /// A scene file could not be loaded
    Scene(SceneLoadError),
    /// The configured level name is not one of the built-in levels
    UnknownLevel(String),
}

impl From<EntityError> for DemoError {
    fn from(e: EntityError) -> Self {
        DemoError::Entity(e)
    }
}

impl From<SceneLoadError> for DemoError {
    fn from(e: SceneLoadError) -> Self {
        DemoError::Scene(e)
    }
}

impl std::fmt::Display for DemoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DemoError::Entity(e) => write!(f, "Failed to build entity: {}", e),
            DemoError::Scene(e) => write!(f, "Failed to load scene: {}", e),
            DemoError::UnknownLevel(name) => write!(f, "Unknown level '{}'", name),
        }
    }
}

impl std::error::Error for DemoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DemoError::Entity(e) => Some(e),
            DemoError::Scene(e) => Some(e),
            DemoError::UnknownLevel(_) => None,
        }
    }
}

/// Kinematic platform moving back and forth along an axis
pub struct Oscillate {
    pub axis: Vec2,
    pub amplitude: f32,
    pub frequency: f32,
}

impl Behavior for Oscillate {
    fn update_velocity(&mut self, body: &mut RigidBody2D, clock: &Clock) -> Result<(), BehaviorError> {
        if self.frequency <= 0.0 {
            return Err(BehaviorError::new("oscillation frequency must be positive"));
        }
        let omega = std::f32::consts::TAU * self.frequency;
        let t = clock.time() as f32;
        body.velocity = self.axis * (self.amplitude * omega * (omega * t).cos());
        Ok(())
    }
}

/// Bomb that scatters debris when it is removed
pub struct Fuse {
    pub debris: usize,
    pub seed: u64,
}

impl Behavior for Fuse {
    fn on_finalize(&mut self, ctx: &FinalizeContext, commands: &mut Commands) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let offset: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
        let count = self.debris.max(1);
        for i in 0..count {
            let direction = Vec2::from_angle(offset + i as f32 * std::f32::consts::TAU / count as f32);
            let speed = DEBRIS_SPEED * rng.gen_range(0.5..1.5);
            let desc = EntityDesc::new(
                ShapeDescriptor::rect(1.5, 1.5)
                    .with_density(1.0)
                    .with_filter(CollisionFilter::debris())
                    .with_material(Material::YELLOW),
            )
            .at(ctx.position + direction * 5.0)
            .with_angle(rng.gen_range(0.0..std::f32::consts::TAU))
            .with_velocity(ctx.velocity + direction * speed)
            .with_angular_velocity(rng.gen_range(-5.0..5.0));
            commands.spawn_transient(desc, DEBRIS_LIFETIME, true);
        }
        log::debug!("bomb {:?} burst into {} pieces", ctx.entity, count);
    }
}

/// Bullets demote what they hit and vanish; hit targets fade out
fn bullet_hit(event: &CollisionEvent, commands: &mut Commands) -> bool {
    if event.other_class == TARGET {
        commands.mark_transient(event.other, HIT_FADE, true);
        commands.declare_kinematic(event.other);
    }
    commands.remove(event.entity);
    true
}

/// Game content reacting to the demo's actions
pub struct DemoGame {
    ship: Option<EntityKey>,
    cursor: Vec2,
    seed: u64,
    bombs: u64,
    quit: bool,
}

impl DemoGame {
    pub fn new(seed: u64) -> Self {
        Self {
            ship: None,
            cursor: Vec2::ZERO,
            seed,
            bombs: 0,
            quit: false,
        }
    }

    /// Entity currently steered by the controls
    pub fn ship(&self) -> Option<EntityKey> {
        self.ship
    }

    pub fn set_ship(&mut self, ship: Option<EntityKey>) {
        self.ship = ship;
    }

    /// Scene position where bombs are dropped
    pub fn set_cursor(&mut self, cursor: Vec2) {
        self.cursor = cursor;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Body state of the ship, if it is still alive
    fn ship_state(&self, world: &World) -> Option<(EntityKey, Vec2, Vec2, f32)> {
        let ship = self.ship?;
        let body = world.body(ship).filter(|_| world.is_alive(ship))?;
        Some((ship, body.position, body.velocity, body.angle))
    }

    fn fire(&mut self, world: &mut World) {
        let Some((_, position, velocity, angle)) = self.ship_state(world) else {
            return;
        };
        let forward = heading(angle);
        let desc = EntityDesc::new(ShapeDescriptor::circle(1.5).with_density(1.0).with_material(Material::RED))
            .at(position + forward * 25.0)
            .with_velocity(velocity + forward * BULLET_SPEED)
            .with_class(BULLET);
        match world.spawn(desc) {
            Ok(bullet) => world.mark_transient(bullet, BULLET_LIFETIME, false),
            Err(e) => log::warn!("Failed to fire: {}", e),
        }
    }

    fn drop_bomb(&mut self, world: &mut World) {
        self.bombs += 1;
        let fuse = Fuse {
            debris: BOMB_DEBRIS,
            seed: self.seed.wrapping_add(self.bombs),
        };
        let desc = EntityDesc::new(ShapeDescriptor::circle(4.0).with_density(2.0).with_material(Material::GRAY))
            .at(self.cursor)
            .with_behavior(fuse);
        match world.spawn(desc) {
            Ok(bomb) => world.mark_transient(bomb, BOMB_FUSE, false),
            Err(e) => log::warn!("Failed to drop bomb: {}", e),
        }
    }

    fn thrust(&mut self, world: &mut World) {
        let dt = world.clock().dt() as f32;
        let Some((ship, _, _, angle)) = self.ship_state(world) else {
            return;
        };
        if let Some(body) = world.body_mut(ship) {
            body.velocity += heading(angle) * (THRUST * dt);
        }
    }

    fn rotate(&mut self, world: &mut World, step: f32) {
        let Some((ship, ..)) = self.ship_state(world) else {
            return;
        };
        if let Some(body) = world.body_mut(ship) {
            body.angle += step;
        }
    }

    /// Break the ship apart and keep steering its first part
    fn split_ship(&mut self, world: &mut World) {
        let Some(ship) = self.ship else {
            return;
        };
        match world.decompose(ship, false) {
            Ok(parts) => {
                log::info!("ship split into {} parts", parts.len());
                self.ship = parts.first().copied();
            }
            Err(e) => log::warn!("Cannot split ship: {}", e),
        }
    }
}

/// Nose of the ship points along local -y
fn heading(angle: f32) -> Vec2 {
    Vec2::new(0.0, -1.0).rotated(angle)
}

impl Game for DemoGame {
    type Action = DemoAction;

    fn on_action(&mut self, action: DemoAction, world: &mut World) {
        match action {
            DemoAction::Fire => self.fire(world),
            DemoAction::Bomb => self.drop_bomb(world),
            DemoAction::Thrust => self.thrust(world),
            DemoAction::RotateLeft => self.rotate(world, -TURN_STEP),
            DemoAction::RotateRight => self.rotate(world, TURN_STEP),
            DemoAction::Decompose => self.split_ship(world),
            DemoAction::ToggleTrace => {
                if let Some(ship) = self.ship {
                    let tracing = world.toggle_trace(ship);
                    log::info!("trail {}", if tracing { "on" } else { "off" });
                }
            }
            DemoAction::SpeedUp => world.clock_mut().speed_up(),
            DemoAction::SlowDown => world.clock_mut().slow_down(),
            DemoAction::Quit => self.quit = true,
        }
    }

    fn on_tick(&mut self, world: &mut World) {
        if let Some(ship) = self.ship {
            if !world.contains(ship) {
                log::info!("ship left the universe");
                self.ship = None;
            }
        }
    }
}

/// Builder for the demo world and its game content
///
/// # Example
/// ```ignore
/// let (world, game) = DemoBuilder::new(WorldConfig::default(), PhysicsConfig::default(), 7)
///     .add_planet(Vec2::ZERO, 50.0, 1.5e6)?
///     .add_ship(Vec2::new(0.0, -150.0), Vec2::new(100.0, 0.0))?
///     .build();
/// ```
pub struct DemoBuilder {
    world: World,
    game: DemoGame,
}

impl DemoBuilder {
    /// Create a builder around an empty world
    pub fn new(config: WorldConfig, physics: PhysicsConfig, seed: u64) -> Self {
        let mut world = World::with_config(config, physics);
        world.set_collision_handler(BULLET, bullet_hit);
        Self {
            world,
            game: DemoGame::new(seed),
        }
    }

    /// Add a static planet that attracts every dynamic entity
    pub fn add_planet(mut self, position: Vec2, radius: f32, force: f32) -> Result<Self, DemoError> {
        let desc = EntityDesc::new(
            ShapeDescriptor::circle(radius)
                .with_physics_material(PhysicsMaterial::ROCK)
                .with_material(Material::BLUE),
        )
        .at(position)
        .with_kind(BodyKind::Static)
        .with_class(PLANET)
        .named("planet");
        let planet = self.world.spawn(desc)?;
        self.world.set_central_gravity(planet, force, radius)?;
        Ok(self)
    }

    /// Add the player's two-part ship; it can be split with the decompose action
    pub fn add_ship(mut self, position: Vec2, velocity: Vec2) -> Result<Self, DemoError> {
        let nose = CompoundPart::new(
            ShapeDescriptor::polygon(&[Vec2::new(0.0, -10.0), Vec2::new(6.0, 10.0), Vec2::new(-6.0, 10.0)])
                .map_err(EntityError::from)?
                .with_material(Material::GREEN),
            Vec2::new(0.0, -10.0),
        )
        .with_mass(1.0)
        .with_class(SHIP)
        .named("nose");
        let hull = CompoundPart::new(ShapeDescriptor::rect(12.0, 20.0).with_material(Material::WHITE), Vec2::new(0.0, 10.0))
            .with_mass(2.0)
            .with_class(SHIP)
            .named("hull");
        let desc = EntityDesc::new(ShapeDescriptor::compound(vec![nose, hull]))
            .at(position)
            .with_velocity(velocity)
            .with_mass(3.0)
            .with_class(SHIP)
            .named(SHIP_NAME)
            .decomposable();
        let ship = self.world.spawn(desc)?;
        self.game.set_ship(Some(ship));
        Ok(self)
    }

    /// Add a dynamic target that fades out when shot
    pub fn add_target(mut self, position: Vec2, velocity: Vec2, radius: f32) -> Result<Self, DemoError> {
        let desc = EntityDesc::new(
            ShapeDescriptor::circle(radius)
                .with_density(0.5)
                .with_physics_material(PhysicsMaterial::RUBBER)
                .with_material(Material::from_rgb(0.8, 0.4, 0.1)),
        )
        .at(position)
        .with_velocity(velocity)
        .with_class(TARGET);
        self.world.spawn(desc)?;
        Ok(self)
    }

    /// Add a kinematic platform oscillating along `axis`
    pub fn add_platform(mut self, position: Vec2, width: f32, axis: Vec2, amplitude: f32) -> Result<Self, DemoError> {
        let desc = EntityDesc::new(ShapeDescriptor::rect(width, 4.0).with_material(Material::GRAY))
            .at(position)
            .with_kind(BodyKind::Kinematic)
            .with_behavior(Oscillate {
                axis: axis.normalized(),
                amplitude,
                frequency: 0.25,
            });
        self.world.spawn(desc)?;
        Ok(self)
    }

    /// Add static rock built from a character grid; `#` cells are solid
    pub fn add_terrain(mut self, origin: Vec2, rows: &[&str], block_size: f32) -> Result<Self, DemoError> {
        let pieces = ShapeDescriptor::polygons_from_matrix(rows, '#', block_size, MarchStyle::Soft)
            .map_err(EntityError::from)?;
        for piece in pieces {
            let desc = EntityDesc::new(piece.with_physics_material(PhysicsMaterial::ROCK).with_material(Material::GRAY))
                .at(origin)
                .with_kind(BodyKind::Static);
            self.world.spawn(desc)?;
        }
        Ok(self)
    }

    /// Add a static label that takes no part in collisions
    pub fn add_label(mut self, position: Vec2, text: &str) -> Result<Self, DemoError> {
        let desc = EntityDesc::new(ShapeDescriptor::text(text, 16.0).airy())
            .at(position)
            .with_kind(BodyKind::Static);
        self.world.spawn(desc)?;
        Ok(self)
    }

    /// Instantiate a saved scene; a `ship` entity in it becomes the player's
    pub fn add_scene(mut self, scene: &Scene) -> Result<Self, DemoError> {
        scene.instantiate(&mut self.world)?;
        if let Some(ship) = self.world.find_by_name(SHIP_NAME) {
            self.game.set_ship(Some(ship));
        }
        Ok(self)
    }

    /// Finish building and return the world and game
    pub fn build(self) -> (World, DemoGame) {
        log::info!("demo built with {} entities", self.world.entity_count());
        (self.world, self.game)
    }

    /// Planet, ship in orbit, a few targets and a platform
    pub fn orbit(config: WorldConfig, physics: PhysicsConfig, seed: u64) -> Result<(World, DemoGame), DemoError> {
        let force = 1.5e6;
        let orbit_speed = |r: f32| (force / r).sqrt();
        Ok(Self::new(config, physics, seed)
            .add_planet(Vec2::ZERO, 50.0, force)?
            .add_ship(Vec2::new(0.0, -150.0), Vec2::new(orbit_speed(150.0), 0.0))?
            .add_target(Vec2::new(200.0, 0.0), Vec2::new(0.0, orbit_speed(200.0)), 6.0)?
            .add_target(Vec2::new(-250.0, 0.0), Vec2::new(0.0, -orbit_speed(250.0)), 8.0)?
            .add_platform(Vec2::new(0.0, 300.0), 60.0, Vec2::X, 80.0)?
            .add_label(Vec2::new(0.0, -380.0), "rust2d")?
            .build())
    }

    /// Rocky ground under uniform gravity with a platform and targets
    pub fn terrain(config: WorldConfig, mut physics: PhysicsConfig, seed: u64) -> Result<(World, DemoGame), DemoError> {
        if physics.gravity == Vec2::ZERO {
            physics.gravity = Vec2::new(0.0, 50.0);
        }
        Ok(Self::new(config, physics, seed)
            .add_terrain(Vec2::ZERO, TERRAIN_ROWS, 20.0)?
            .add_ship(Vec2::new(100.0, 60.0), Vec2::ZERO)?
            .add_target(Vec2::new(300.0, 30.0), Vec2::ZERO, 6.0)?
            .add_target(Vec2::new(420.0, 30.0), Vec2::ZERO, 6.0)?
            .add_platform(Vec2::new(260.0, 130.0), 60.0, Vec2::X, 20.0)?
            .build())
    }

    /// Build a built-in level by name
    pub fn level(name: &str, config: WorldConfig, physics: PhysicsConfig, seed: u64) -> Result<(World, DemoGame), DemoError> {
        match name {
            "orbit" => Self::orbit(config, physics, seed),
            "terrain" => Self::terrain(config, physics, seed),
            other => Err(DemoError::UnknownLevel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orbit() -> (World, DemoGame) {
        DemoBuilder::orbit(WorldConfig::default(), PhysicsConfig::default(), 7).unwrap()
    }

    #[test]
    fn test_orbit_level() {
        let (world, game) = orbit();
        let planet = world.find_by_name("planet").unwrap();
        assert_eq!(world.central_gravity().map(|(k, _, _)| k), Some(planet));
        let ship = game.ship().unwrap();
        assert!(world.is_alive(ship));
        assert_eq!(world.get(ship).unwrap().children().len(), 2);
    }

    #[test]
    fn test_unknown_level() {
        let result = DemoBuilder::level("moon", WorldConfig::default(), PhysicsConfig::default(), 7);
        assert!(matches!(result, Err(DemoError::UnknownLevel(name)) if name == "moon"));
    }

    #[test]
    fn test_terrain_level_uses_gravity() {
        let (world, game) = DemoBuilder::terrain(WorldConfig::default(), PhysicsConfig::default(), 7).unwrap();
        assert_eq!(world.physics().config.gravity, Vec2::new(0.0, 50.0));
        assert!(game.ship().is_some());
        assert!(world.physics().shape_count() > 0);
    }

    #[test]
    fn test_fire_spawns_transient_bullet() {
        let (mut world, mut game) = orbit();
        let before = world.entity_count();
        game.on_action(DemoAction::Fire, &mut world);
        assert_eq!(world.entity_count(), before + 1);
        assert_eq!(world.timeline().len(), 1);
    }

    #[test]
    fn test_split_ship_steers_first_part() {
        let (mut world, mut game) = orbit();
        let ship = game.ship().unwrap();
        game.on_action(DemoAction::Decompose, &mut world);
        let part = game.ship().unwrap();
        assert_ne!(part, ship);
        assert!(world.is_alive(part));
        assert!(!world.is_alive(ship));

        // A second split has nothing to break
        game.on_action(DemoAction::Decompose, &mut world);
        assert_eq!(game.ship(), Some(part));
    }

    #[test]
    fn test_bomb_bursts_after_fuse() {
        let (mut world, mut game) = orbit();
        game.set_cursor(Vec2::new(0.0, 400.0));
        game.on_action(DemoAction::Bomb, &mut world);
        let bomb = world.keys().last().unwrap();
        let before = world.entity_count();

        world.clock_mut().set_dt(0.1);
        for _ in 0..12 {
            world.tick();
        }
        assert!(!world.contains(bomb));
        assert!(world.entity_count() >= before - 1 + BOMB_DEBRIS);
    }

    #[test]
    fn test_debris_is_deterministic() {
        let ctx = FinalizeContext {
            entity: EntityKey::default(),
            position: Vec2::ZERO,
            angle: 0.0,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            time: 0.0,
        };
        let burst = |seed| {
            let mut commands = Commands::new();
            Fuse { debris: 4, seed }.on_finalize(&ctx, &mut commands);
            commands.iter().map(|c| format!("{:?}", c)).collect::<Vec<_>>()
        };
        assert_eq!(burst(3), burst(3));
        assert_eq!(burst(3).len(), 4);
    }

    #[test]
    fn test_thrust_accelerates_along_heading() {
        let (mut world, mut game) = DemoBuilder::new(WorldConfig::default(), PhysicsConfig::default(), 1)
            .add_ship(Vec2::ZERO, Vec2::ZERO)
            .unwrap()
            .build();
        let ship = game.ship().unwrap();
        game.on_action(DemoAction::Thrust, &mut world);
        let v = world.body(ship).unwrap().velocity;
        assert!(v.y < 0.0);
        assert!(v.x.abs() < 1e-6);
    }

    #[test]
    fn test_speed_actions_change_time_step() {
        let (mut world, mut game) = orbit();
        let dt = world.clock().dt();
        game.on_action(DemoAction::SpeedUp, &mut world);
        assert!(world.clock().dt() > dt);
        game.on_action(DemoAction::SlowDown, &mut world);
        game.on_action(DemoAction::SlowDown, &mut world);
        assert!(world.clock().dt() < dt);
    }

    #[test]
    fn test_quit_action() {
        let (mut world, mut game) = orbit();
        assert!(!game.quit_requested());
        game.on_action(DemoAction::Quit, &mut world);
        assert!(game.quit_requested());
    }
}
