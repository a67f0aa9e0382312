//! 2D Mathematics Library
//!
//! This crate provides the vector and polygon types for the rust2d engine.
//!
//! ## Core Types
//!
//! - [`Vec2`] - 2D vector with x, y components
//!
//! ## Geometry
//!
//! - [`polygon`] - loop closing, winding, area/moment and convex decomposition
//! - [`march`] - marching squares contour extraction over a sample lattice

mod vec2;
pub mod polygon;
pub mod march;

pub use vec2::Vec2;
pub use polygon::{convex_decomposition, GeometryError};
pub use march::{march, MarchStyle};
