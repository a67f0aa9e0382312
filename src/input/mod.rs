//! Input handling module
//!
//! Provides the demo's key bindings from raw buttons to semantic actions.

mod input_mapper;

pub use input_mapper::{bindings, DemoAction};
