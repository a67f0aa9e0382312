//! Demo content
//!
//! This module provides a declarative API for building the demo's levels.

mod scene_builder;

pub use scene_builder::{DemoBuilder, DemoError, DemoGame, Fuse, Oscillate, BULLET, PLANET, SHIP, SHIP_NAME, TARGET, TERRAIN_ROWS};
