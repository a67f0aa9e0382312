//! Application configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`R2D_SECTION__KEY`)

use figment::{Figment, providers::{Format, Toml, Env}};
use serde::{Serialize, Deserialize};
use std::path::Path;

use rust2d_core::{Vec2, WorldConfig};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tick timing
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Physics configuration
    #[serde(default)]
    pub physics: PhysicsConfig,
    /// World bounds and trail drawing
    #[serde(default)]
    pub world: WorldSettings,
    /// Demo content selection
    #[serde(default)]
    pub demo: DemoConfig,
    /// Debug configuration
    #[serde(default)]
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`R2D_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }

        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // R2D_DEBUG__LOG_LEVEL=trace -> debug.log_level = "trace"
        figment = figment.merge(Env::prefixed("R2D_").split("__"));

        figment.extract().map_err(ConfigError::from)
    }

    /// World settings for the core crate
    pub fn to_world_config(&self) -> WorldConfig {
        WorldConfig {
            universe_size: self.world.universe_size,
            trace_length: self.world.trace_length,
            trace_max_segments: self.world.trace_max_segments,
            time_step: self.simulation.time_step,
            speed_delta: self.simulation.speed_delta,
        }
    }
}

/// Tick timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulation time advanced per tick
    pub time_step: f64,
    /// Wall-clock period between ticks, in seconds
    pub timer_elapse: f64,
    /// Time step change on speed up / slow down
    pub speed_delta: f64,
    /// Most ticks run to catch up after a stall
    pub max_catch_up: u32,
    /// Ticks to run before exiting; 0 runs forever
    pub tick_budget: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_step: 5e-3,
            timer_elapse: 10e-3,
            speed_delta: 1e-3,
            max_catch_up: 5,
            tick_budget: 0,
        }
    }
}

/// Physics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Uniform gravity [x, y]; +y is down
    pub gravity: [f32; 2],
    /// Fraction of velocity kept per second
    pub damping: f32,
    /// Sub-steps per tick
    pub substeps: u32,
    /// Solver iterations per sub-step
    pub iterations: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 0.0],
            damping: 1.0,
            substeps: 1,
            iterations: 10,
        }
    }
}

impl PhysicsConfig {
    /// Convert to the physics engine's config type
    pub fn to_physics_config(&self) -> rust2d_core::PhysicsConfig {
        rust2d_core::PhysicsConfig {
            gravity: Vec2::from(self.gravity),
            damping: self.damping,
            iterations: self.iterations.max(1),
            substeps: self.substeps.max(1),
        }
    }
}

/// World bounds and trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSettings {
    /// Entities beyond this distance on either axis are removed
    pub universe_size: f32,
    /// Ticks between trail points
    pub trace_length: u32,
    /// Trail segments kept
    pub trace_max_segments: usize,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            universe_size: 100_000.0,
            trace_length: 10,
            trace_max_segments: 1000,
        }
    }
}

/// Demo content configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Built-in level: "orbit" or "terrain"
    pub level: String,
    /// Optional RON scene loaded instead of the built-in level
    pub scene_path: Option<String>,
    /// Seed of the debris pattern
    pub seed: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            level: "orbit".to_string(),
            scene_path: None,
            seed: 7,
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Log the key bindings at startup
    pub print_help: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            print_help: true,
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError {
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}
