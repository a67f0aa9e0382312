//! Surface response of shapes at a contact

use serde::{Serialize, Deserialize};

/// How a shape grips and bounces when it touches another
///
/// The default surface is frictionless and perfectly inelastic: a body
/// landing on it stops along the normal and keeps sliding along the tangent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicsMaterial {
    /// Tangential impulse limit as a fraction of the normal impulse
    pub friction: f32,
    /// Share of the approach speed returned along the normal
    pub elasticity: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl PhysicsMaterial {
    /// Bouncy, grippy surface used for bumpers
    pub const RUBBER: Self = Self { friction: 0.9, elasticity: 0.8 };

    /// Terrain surface that holds objects and absorbs most impacts
    pub const ROCK: Self = Self { friction: 0.7, elasticity: 0.1 };

    /// Both coefficients are kept within [0, 1]
    pub fn new(friction: f32, elasticity: f32) -> Self {
        Self {
            friction: friction.clamp(0.0, 1.0),
            elasticity: elasticity.clamp(0.0, 1.0),
        }
    }

    /// Surface seen by a contact between `self` and `other`
    ///
    /// A frictionless side makes the whole contact frictionless; the bouncier
    /// side decides the elasticity.
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            friction: (self.friction * other.friction).sqrt(),
            elasticity: self.elasticity.max(other.elasticity),
        }
    }
}
