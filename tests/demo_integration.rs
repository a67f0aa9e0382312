//! Integration tests for the demo content
//!
//! Drives the demo through the simulation with the real key bindings.

use rust2d::config::AppConfig;
use rust2d::input::bindings;
use rust2d::scene::{DemoBuilder, DemoGame, TARGET};
use rust2d::systems::StatsView;
use rust2d_core::{BodyKind, Key, PhysicsConfig, Scene, Simulation, Vec2, WorldConfig};

fn shooting_range() -> Simulation<DemoGame> {
    let (world, game) = DemoBuilder::new(WorldConfig::default(), PhysicsConfig::default(), 1)
        .add_ship(Vec2::ZERO, Vec2::ZERO)
        .unwrap()
        .add_target(Vec2::new(0.0, -80.0), Vec2::ZERO, 6.0)
        .unwrap()
        .build();
    Simulation::new(world, game, bindings())
}

// ==================== Shooting ====================

/// A bullet fired at a target demotes it, fades it out and disappears itself
#[test]
fn test_shot_target_fades_out() {
    let mut sim = shooting_range();
    let target = sim
        .world()
        .keys()
        .find(|&k| sim.world().get(k).is_some_and(|e| e.class() == TARGET))
        .unwrap();

    sim.input_mut().press(Key::Space);
    sim.tick();
    assert_eq!(sim.world().timeline().len(), 1, "bullet is transient");

    for _ in 0..60 {
        sim.tick();
    }
    assert_eq!(sim.world().body(target).unwrap().kind, BodyKind::Kinematic);
    assert!(sim.world().get(target).unwrap().transience().unwrap().fading);

    for _ in 0..60 {
        sim.tick();
    }
    assert!(!sim.world().contains(target));
    assert!(sim.game().ship().is_some_and(|s| sim.world().is_alive(s)));
}

// ==================== Ship Controls ====================

/// Splitting hands control to a part that keeps the ship's motion
#[test]
fn test_decompose_keeps_motion() {
    let (world, game) = DemoBuilder::new(WorldConfig::default(), PhysicsConfig::default(), 1)
        .add_ship(Vec2::ZERO, Vec2::new(10.0, 0.0))
        .unwrap()
        .build();
    let mut sim = Simulation::new(world, game, bindings());
    let ship = sim.game().ship().unwrap();

    sim.input_mut().press(Key::char('d'));
    sim.tick();

    let part = sim.game().ship().unwrap();
    assert_ne!(part, ship);
    let v = sim.world().body(part).unwrap().velocity;
    assert!((v.x - 10.0).abs() < 1e-3);
}

/// The trail key records segments behind the moving ship
#[test]
fn test_trail_toggle() {
    let (world, game) = DemoBuilder::new(WorldConfig::default(), PhysicsConfig::default(), 1)
        .add_ship(Vec2::ZERO, Vec2::new(50.0, 0.0))
        .unwrap()
        .build();
    let mut sim = Simulation::new(world, game, bindings());

    sim.input_mut().press(Key::char('t'));
    for _ in 0..100 {
        sim.tick();
    }
    assert!(sim.world().trace().segment_count() > 0);

    sim.input_mut().release(Key::char('t'));
    sim.input_mut().press(Key::char('t'));
    sim.tick();
    assert_eq!(sim.world().trace().segment_count(), 0);
}

// ==================== Levels ====================

/// Every built-in level survives a stretch of simulation
#[test]
fn test_levels_run() {
    for level in ["orbit", "terrain"] {
        let config = AppConfig::default();
        let (world, game) = DemoBuilder::level(
            level,
            config.to_world_config(),
            config.physics.to_physics_config(),
            config.demo.seed,
        )
        .unwrap();
        let mut sim = Simulation::new(world, game, bindings());
        sim.add_view(StatsView::new(100));
        for _ in 0..200 {
            sim.tick();
        }
        assert!(sim.game().ship().is_some(), "ship lost in level {}", level);
    }
}

/// A saved scene with a named ship is steerable after loading
#[test]
fn test_scene_file_provides_ship() {
    let path = std::env::temp_dir().join("rust2d_demo_scene.ron");
    let source = r#"
        Scene(
            name: "saved",
            entities: [
                EntityTemplate(
                    name: Some("ship"),
                    shape: Rect(width: 10.0, height: 20.0),
                    position: (0.0, 0.0),
                ),
            ],
        )
    "#;
    std::fs::write(&path, source).unwrap();
    let scene = Scene::load(&path).unwrap();
    let (world, game) = DemoBuilder::new(WorldConfig::default(), PhysicsConfig::default(), 1)
        .add_scene(&scene)
        .unwrap()
        .build();
    let ship = game.ship().unwrap();
    assert_eq!(world.get(ship).unwrap().name(), Some("ship"));
    std::fs::remove_file(&path).ok();
}

/// The bundled orbit scene loads with its attractor and a steerable ship
#[test]
fn test_bundled_scene() {
    let scene = Scene::load("scenes/orbit.ron").unwrap();
    let (world, game) = DemoBuilder::new(WorldConfig::default(), PhysicsConfig::default(), 1)
        .add_scene(&scene)
        .unwrap()
        .build();
    let planet = world.find_by_name("planet").unwrap();
    assert_eq!(world.central_gravity().map(|(k, _, _)| k), Some(planet));
    assert!(game.ship().is_some());
    assert!(world.keys().any(|k| world.get(k).is_some_and(|e| e.class() == TARGET)));
}
