//! 2D Transform (position, rotation about a pivot)
//!
//! A Transform2D places a scene node inside its parent: the node's content is
//! rotated about `pivot` (in local coordinates), then translated by `position`.

use rust2d_math::Vec2;
use serde::{Serialize, Deserialize};

/// A 2D transform with position, rotation and rotation pivot
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    /// Translation applied after rotation
    pub position: Vec2,
    /// Rotation in radians
    pub rotation: f32,
    /// Local point the rotation turns about
    pub pivot: Vec2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2D {
    /// Create an identity transform
    pub fn identity() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            pivot: Vec2::ZERO,
        }
    }

    /// Create a transform with just a position
    pub fn from_position(position: Vec2) -> Self {
        Self { position, ..Self::identity() }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec2, rotation: f32) -> Self {
        Self { position, rotation, pivot: Vec2::ZERO }
    }

    /// Transform a point from local space to parent space
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        self.position + self.pivot + (p - self.pivot).rotated(self.rotation)
    }

    /// Transform a point from parent space to local space
    pub fn inverse_transform_point(&self, p: Vec2) -> Vec2 {
        self.pivot + (p - self.position - self.pivot).rotated(-self.rotation)
    }

    /// Position that makes the local origin land on `origin` for the current
    /// rotation and pivot
    pub fn position_for_origin(&self, origin: Vec2) -> Vec2 {
        origin - self.pivot + self.pivot.rotated(self.rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 0.0001
    }

    #[test]
    fn test_identity_transform() {
        let t = Transform2D::identity();
        assert_eq!(t.transform_point(Vec2::new(3.0, 4.0)), Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_translation_and_rotation() {
        let t = Transform2D::from_position_rotation(Vec2::new(10.0, 0.0), FRAC_PI_2);
        assert!(approx(t.transform_point(Vec2::X), Vec2::new(10.0, 1.0)));
    }

    #[test]
    fn test_pivot_rotation_keeps_pivot_fixed() {
        let t = Transform2D {
            position: Vec2::ZERO,
            rotation: FRAC_PI_2,
            pivot: Vec2::new(2.0, 1.0),
        };
        assert!(approx(t.transform_point(Vec2::new(2.0, 1.0)), Vec2::new(2.0, 1.0)));
    }

    #[test]
    fn test_inverse() {
        let t = Transform2D {
            position: Vec2::new(5.0, -2.0),
            rotation: 0.7,
            pivot: Vec2::new(1.0, 1.0),
        };
        let p = Vec2::new(3.0, 8.0);
        assert!(approx(t.inverse_transform_point(t.transform_point(p)), p));
    }

    #[test]
    fn test_position_for_origin() {
        let mut t = Transform2D {
            position: Vec2::ZERO,
            rotation: 1.2,
            pivot: Vec2::new(4.0, 2.0),
        };
        let target = Vec2::new(7.0, 7.0);
        t.position = t.position_for_origin(target);
        assert!(approx(t.transform_point(Vec2::ZERO), target));
    }
}
