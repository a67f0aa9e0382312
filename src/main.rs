//! rust2d - 2D physics sandbox
//!
//! Runs the demo headless: the configured level is simulated at a fixed
//! wall-clock rate while a scripted pilot presses the bound keys.

use rust2d::config::AppConfig;
use rust2d::input::bindings;
use rust2d::scene::{DemoBuilder, DemoError, DemoGame};
use rust2d::systems::{StatsView, TickDriver};
use rust2d_core::{InputState, Key, Modifiers, MouseButton, Scene, Simulation, Vec2, World};

/// Main application state
struct App {
    simulation: Simulation<DemoGame>,
    driver: TickDriver,
    tick_budget: u64,
}

impl App {
    fn new(config: &AppConfig) -> Result<Self, DemoError> {
        let (world, game) = build_world(config)?;
        let actions = bindings();
        if config.debug.print_help {
            for line in actions.help_lines() {
                log::info!("  {}", line);
            }
        }

        let mut simulation = Simulation::new(world, game, actions);
        // Log about once per simulated second
        let every = (1.0 / config.simulation.timer_elapse.max(1e-3)).round() as u64;
        simulation.add_view(StatsView::new(every));

        Ok(Self {
            simulation,
            driver: TickDriver::new(config.simulation.timer_elapse, config.simulation.max_catch_up),
            tick_budget: config.simulation.tick_budget,
        })
    }

    fn finished(&self) -> bool {
        self.simulation.game().quit_requested()
            || (self.tick_budget > 0 && self.simulation.ticks() >= self.tick_budget)
    }

    fn run(&mut self) {
        while !self.finished() {
            let ticks = self.simulation.ticks();
            pilot(ticks, self.simulation.input_mut());
            if ticks % 400 == 0 {
                self.simulation.game_mut().set_cursor(Vec2::new(0.0, 250.0));
            }
            self.driver.update(&mut self.simulation);
            self.driver.wait();
        }
        log::info!(
            "Stopped after {} ticks ({:.2}s simulated, {} ticks dropped)",
            self.simulation.ticks(),
            self.simulation.world().clock().time(),
            self.driver.dropped()
        );
    }
}

/// Built-in level, or the configured RON scene
fn build_world(config: &AppConfig) -> Result<(World, DemoGame), DemoError> {
    let world_config = config.to_world_config();
    let physics = config.physics.to_physics_config();
    match &config.demo.scene_path {
        Some(path) => {
            let scene = Scene::load(path)?;
            log::info!("Loaded scene '{}' from {}", scene.name, path);
            Ok(DemoBuilder::new(world_config, physics, config.demo.seed)
                .add_scene(&scene)?
                .build())
        }
        None => DemoBuilder::level(&config.demo.level, world_config, physics, config.demo.seed),
    }
}

/// Scripted key presses standing in for a player
fn pilot(tick: u64, input: &mut InputState) {
    input.set_modifiers(Modifiers::NONE);
    match tick % 400 {
        0 => input.press(MouseButton::Left),
        50 => input.press(Key::Space),
        100 => input.press(Key::char('t')),
        120..=160 => input.press(Key::Up),
        161 => input.release(Key::Up),
        200..=220 => input.press(Key::Left),
        221 => input.release(Key::Left),
        _ => {}
    }
    if tick == 1000 {
        input.press(Key::char('d'));
    }
}

fn init_logging(level: &str) {
    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let config = AppConfig::load();
    let level = config
        .as_ref()
        .map(|c| c.debug.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(&level);
    log::info!("Starting rust2d");

    let config = config.unwrap_or_else(|e| {
        log::warn!("Failed to load config: {}. Using defaults.", e);
        AppConfig::default()
    });

    let mut app = match App::new(&config) {
        Ok(app) => app,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    app.run();
}
