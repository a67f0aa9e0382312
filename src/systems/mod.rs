//! Application systems
//!
//! Tick pacing and render views, kept out of main.rs for testability.

mod render;
mod simulation;

pub use render::{FrameStats, StatsView};
pub use simulation::TickDriver;
