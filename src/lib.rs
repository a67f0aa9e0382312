//! rust2d - 2D physics sandbox
//!
//! Configuration, key bindings, demo content and tick pacing around the
//! `rust2d_core` engine.

pub mod config;
pub mod input;
pub mod scene;
pub mod systems;
