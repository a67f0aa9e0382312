//! Collision shapes for 2D physics
//!
//! Shape geometry is stored in body-local coordinates. The world transforms it
//! through the owning body every time contacts are computed.

use rust2d_math::{polygon, Vec2};
use serde::{Serialize, Deserialize};
use slotmap::new_key_type;

use crate::body::{BodyKey, RigidBody2D};
use crate::collision::{CollisionClass, CollisionFilter};
use crate::material::PhysicsMaterial;

new_key_type! {
    /// Key to a collision shape in the physics world
    pub struct ShapeKey;
}

/// Local geometry of a collision shape
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ShapeGeometry {
    /// Disc of `radius` centred at `offset`
    Circle { radius: f32, offset: Vec2 },
    /// Convex counter-clockwise polygon
    Polygon { vertices: Vec<Vec2> },
    /// Capsule around the segment `a`–`b`
    Segment { a: Vec2, b: Vec2, radius: f32 },
}

impl ShapeGeometry {
    /// Disc centred on the body origin
    pub fn circle(radius: f32) -> Self {
        ShapeGeometry::Circle { radius, offset: Vec2::ZERO }
    }

    /// Axis-aligned box of `width × height` centred at `center`
    pub fn rect(width: f32, height: f32, center: Vec2) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        ShapeGeometry::Polygon {
            vertices: vec![
                center + Vec2::new(-hw, -hh),
                center + Vec2::new(hw, -hh),
                center + Vec2::new(hw, hh),
                center + Vec2::new(-hw, hh),
            ],
        }
    }

    /// Area of the shape
    pub fn area(&self) -> f32 {
        match self {
            ShapeGeometry::Circle { radius, .. } => std::f32::consts::PI * radius * radius,
            ShapeGeometry::Polygon { vertices } => polygon::area(vertices),
            ShapeGeometry::Segment { a, b, radius } => {
                2.0 * radius * a.distance(*b) + std::f32::consts::PI * radius * radius
            }
        }
    }

    /// Moment of inertia about the body origin for a given mass
    pub fn moment(&self, mass: f32) -> f32 {
        match self {
            ShapeGeometry::Circle { radius, offset } => {
                mass * (radius * radius * 0.5 + offset.length_squared())
            }
            ShapeGeometry::Polygon { vertices } => polygon::polygon_moment(mass, vertices),
            ShapeGeometry::Segment { a, b, radius } => {
                let length = a.distance(*b) + 2.0 * radius;
                let center = a.lerp(*b, 0.5);
                mass * ((length * length + 4.0 * radius * radius) / 12.0 + center.length_squared())
            }
        }
    }

    /// Same geometry placed with an extra rotation and offset
    ///
    /// Used to express a child part's shapes in its parent's frame.
    pub fn placed(&self, offset: Vec2, angle: f32) -> Self {
        let map = |p: Vec2| offset + p.rotated(angle);
        match self {
            ShapeGeometry::Circle { radius, offset: o } => ShapeGeometry::Circle {
                radius: *radius,
                offset: map(*o),
            },
            ShapeGeometry::Polygon { vertices } => ShapeGeometry::Polygon {
                vertices: vertices.iter().map(|&v| map(v)).collect(),
            },
            ShapeGeometry::Segment { a, b, radius } => ShapeGeometry::Segment {
                a: map(*a),
                b: map(*b),
                radius: *radius,
            },
        }
    }

    /// Core points and rounding radius in world space
    pub fn world_hull(&self, body: &RigidBody2D) -> (Vec<Vec2>, f32) {
        match self {
            ShapeGeometry::Circle { radius, offset } => (vec![body.local_to_world(*offset)], *radius),
            ShapeGeometry::Polygon { vertices } => {
                (vertices.iter().map(|&v| body.local_to_world(v)).collect(), 0.0)
            }
            ShapeGeometry::Segment { a, b, radius } => {
                (vec![body.local_to_world(*a), body.local_to_world(*b)], *radius)
            }
        }
    }
}

/// Axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Bounding box of a set of points, inflated by `radius`
    pub fn from_points(points: &[Vec2], radius: f32) -> Self {
        let mut min = Vec2::new(f32::INFINITY, f32::INFINITY);
        let mut max = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for &p in points {
            min = min.min_components(p);
            max = max.max_components(p);
        }
        let r = Vec2::new(radius, radius);
        Self { min: min - r, max: max + r }
    }

    /// Check overlap with another box
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// A collision shape attached to a body
#[derive(Clone, Debug)]
pub struct Shape {
    /// Local geometry
    pub geometry: ShapeGeometry,
    /// Surface properties
    pub material: PhysicsMaterial,
    /// Collision class reported to contact listeners
    pub collision_class: CollisionClass,
    /// Layer filtering
    pub filter: CollisionFilter,
    /// Owning body, bound when the shape is added to the world
    pub(crate) body: Option<BodyKey>,
}

impl Shape {
    /// Create a shape with default material, class and filter
    pub fn new(geometry: ShapeGeometry) -> Self {
        Self {
            geometry,
            material: PhysicsMaterial::default(),
            collision_class: CollisionClass::DEFAULT,
            filter: CollisionFilter::default(),
            body: None,
        }
    }

    /// Set the surface material
    pub fn with_material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    /// Set the collision class
    pub fn with_class(mut self, class: CollisionClass) -> Self {
        self.collision_class = class;
        self
    }

    /// Set the layer filter
    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The body this shape is bound to
    pub fn body(&self) -> Option<BodyKey> {
        self.body
    }
}
