//! Collision detection for 2D shapes
//!
//! Every shape is reduced to a *rounded hull*: a convex set of core points
//! inflated by a radius (circle = one point, capsule = two points, polygon =
//! its vertices with radius zero). A single separating-axis test covers all
//! shape pairs.
//!
//! Also provides collision classes for contact listeners and layer filtering.

use std::any::TypeId;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use bitflags::bitflags;
use rust2d_math::Vec2;
use serde::{Serialize, Deserialize};

/// Identifies what kind of object a shape belongs to
///
/// Contact listeners are keyed by class. Classes are derived either from a
/// Rust type (one class per entity type) or from a stable name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollisionClass(pub u64);

impl CollisionClass {
    /// Class of shapes nobody registered a class for
    pub const DEFAULT: Self = Self(0);

    /// Class derived from a type's identity
    pub fn of<T: 'static>() -> Self {
        let mut hasher = DefaultHasher::new();
        TypeId::of::<T>().hash(&mut hasher);
        Self(hasher.finish() | 1)
    }

    /// Class derived from a name (FNV-1a); stable across runs
    pub const fn named(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            i += 1;
        }
        Self(hash | 1)
    }
}

bitflags! {
    /// Collision layers for filtering which objects can collide
    ///
    /// Each layer is a bit in a 32-bit mask. Objects can belong to multiple layers
    /// and can define which layers they collide with via a collision mask.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CollisionLayer: u32 {
        /// Default layer for most objects
        const DEFAULT = 1 << 0;
        /// Static world geometry (terrain, walls)
        const STATIC = 1 << 1;
        /// Projectiles (bullets, bombs)
        const PROJECTILE = 1 << 2;
        /// Short-lived fragments
        const DEBRIS = 1 << 3;
        /// All layers (collide with everything)
        const ALL = 0xFFFFFFFF;
    }
}

/// Collision filter determining what an object collides with
///
/// Two objects A and B collide if:
/// - (A.layer & B.mask) != 0, AND
/// - (B.layer & A.mask) != 0
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionFilter {
    /// Which layer(s) this object belongs to
    pub layer: CollisionLayer,
    /// Which layer(s) this object can collide with
    pub mask: CollisionLayer,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            layer: CollisionLayer::DEFAULT,
            mask: CollisionLayer::ALL,
        }
    }
}

impl CollisionFilter {
    /// Create a new collision filter with specified layer and mask
    pub fn new(layer: CollisionLayer, mask: CollisionLayer) -> Self {
        Self { layer, mask }
    }

    /// Check if this filter allows collision with another filter
    pub fn collides_with(&self, other: &Self) -> bool {
        self.layer.intersects(other.mask) && other.layer.intersects(self.mask)
    }

    /// Debris hits the world but not other debris
    pub fn debris() -> Self {
        Self {
            layer: CollisionLayer::DEBRIS,
            mask: CollisionLayer::ALL & !CollisionLayer::DEBRIS,
        }
    }
}

/// Contact information from a collision
#[derive(Clone, Copy, Debug)]
pub struct Contact {
    /// Contact point in world space
    pub point: Vec2,
    /// Unit normal pointing from shape A toward shape B
    pub normal: Vec2,
    /// Overlap depth along the normal
    pub penetration: f32,
}

impl Contact {
    /// Create a new contact
    pub fn new(point: Vec2, normal: Vec2, penetration: f32) -> Self {
        Self { point, normal, penetration }
    }

    /// Check if this contact represents an actual collision (positive penetration)
    #[inline]
    pub fn is_colliding(&self) -> bool {
        self.penetration > 0.0
    }
}

fn average(points: &[Vec2]) -> Vec2 {
    if points.is_empty() {
        return Vec2::ZERO;
    }
    points.iter().fold(Vec2::ZERO, |s, &p| s + p) / points.len() as f32
}

fn project(points: &[Vec2], axis: Vec2) -> (f32, f32) {
    points.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

fn support(points: &[Vec2], dir: Vec2) -> Vec2 {
    let mut best = points.first().copied().unwrap_or(Vec2::ZERO);
    let mut best_d = best.dot(dir);
    for &p in points.iter().skip(1) {
        let d = p.dot(dir);
        if d > best_d {
            best = p;
            best_d = d;
        }
    }
    best
}

fn closest_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest point on the boundary of a point set's hull (points, edges)
fn closest_on_hull(p: Vec2, points: &[Vec2]) -> Vec2 {
    match points.len() {
        0 => p,
        1 => points[0],
        n => {
            let mut best = points[0];
            let mut best_d = f32::INFINITY;
            for i in 0..n {
                let q = closest_on_segment(p, points[i], points[(i + 1) % n]);
                let d = (q - p).length_squared();
                if d < best_d {
                    best = q;
                    best_d = d;
                }
            }
            best
        }
    }
}

fn edge_normals(points: &[Vec2], axes: &mut Vec<Vec2>) {
    match points.len() {
        0 | 1 => {}
        2 => axes.push((points[1] - points[0]).perp().normalized()),
        n => {
            for i in 0..n {
                axes.push((points[(i + 1) % n] - points[i]).perp().normalized());
            }
        }
    }
}

/// Separating-axis test between two rounded convex hulls
///
/// Returns the minimum-overlap contact with its normal pointing from A to B,
/// or `None` when some axis separates the hulls.
pub fn rounded_hull_contact(a: &[Vec2], radius_a: f32, b: &[Vec2], radius_b: f32) -> Option<Contact> {
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let mut axes = Vec::with_capacity(a.len() + b.len() + 4);
    edge_normals(a, &mut axes);
    edge_normals(b, &mut axes);
    if radius_a > 0.0 {
        for &p in a {
            axes.push((closest_on_hull(p, b) - p).normalized());
        }
    }
    if radius_b > 0.0 {
        for &q in b {
            axes.push((q - closest_on_hull(q, a)).normalized());
        }
    }
    axes.retain(|axis| axis.length_squared() > 0.5);
    if axes.is_empty() {
        axes.push(Vec2::X);
    }

    let center_delta = average(b) - average(a);
    let mut best_axis = Vec2::X;
    let mut best_overlap = f32::INFINITY;
    for axis in axes {
        let (min_a, max_a) = project(a, axis);
        let (min_b, max_b) = project(b, axis);
        let overlap = (max_a + radius_a - (min_b - radius_b)).min(max_b + radius_b - (min_a - radius_a));
        if overlap <= 0.0 {
            return None;
        }
        if overlap < best_overlap {
            best_overlap = overlap;
            best_axis = if center_delta.dot(axis) < 0.0 { -axis } else { axis };
        }
    }

    // Deepest point of B inside A, moved back to the middle of the overlap
    let deepest = support(b, -best_axis) - best_axis * radius_b;
    let point = deepest + best_axis * (best_overlap * 0.5);
    Some(Contact::new(point, best_axis, best_overlap))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(center: Vec2) -> Vec<Vec2> {
        vec![
            center + Vec2::new(-0.5, -0.5),
            center + Vec2::new(0.5, -0.5),
            center + Vec2::new(0.5, 0.5),
            center + Vec2::new(-0.5, 0.5),
        ]
    }

    #[test]
    fn test_circle_vs_circle() {
        let c = rounded_hull_contact(&[Vec2::ZERO], 1.0, &[Vec2::new(1.5, 0.0)], 1.0).unwrap();
        assert!((c.penetration - 0.5).abs() < 0.0001);
        assert!((c.normal.x - 1.0).abs() < 0.0001);
        assert!(rounded_hull_contact(&[Vec2::ZERO], 1.0, &[Vec2::new(2.5, 0.0)], 1.0).is_none());
    }

    #[test]
    fn test_box_vs_box() {
        let a = unit_box(Vec2::ZERO);
        let b = unit_box(Vec2::new(0.0, 0.8));
        let c = rounded_hull_contact(&a, 0.0, &b, 0.0).unwrap();
        assert!((c.penetration - 0.2).abs() < 0.0001);
        assert!((c.normal.y - 1.0).abs() < 0.0001);

        let far = unit_box(Vec2::new(3.0, 0.0));
        assert!(rounded_hull_contact(&a, 0.0, &far, 0.0).is_none());
    }

    #[test]
    fn test_circle_vs_box_corner_separated() {
        // Inside both AABB projections but outside the rounded corner
        let a = unit_box(Vec2::ZERO);
        let circle = [Vec2::new(1.2, 1.2)];
        assert!(rounded_hull_contact(&a, 0.0, &circle, 0.9).is_none());
        assert!(rounded_hull_contact(&a, 0.0, &circle, 1.0).is_some());
    }

    #[test]
    fn test_capsule_vs_circle() {
        let capsule = [Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0)];
        let c = rounded_hull_contact(&capsule, 0.5, &[Vec2::new(2.0, 1.0)], 0.75).unwrap();
        assert!((c.penetration - 0.25).abs() < 0.0001);
        assert!((c.normal.y - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_collision_class_identity() {
        struct Bullet;
        struct Target;
        assert_eq!(CollisionClass::of::<Bullet>(), CollisionClass::of::<Bullet>());
        assert_ne!(CollisionClass::of::<Bullet>(), CollisionClass::of::<Target>());
        assert_ne!(CollisionClass::of::<Bullet>(), CollisionClass::DEFAULT);
        assert_eq!(CollisionClass::named("bullet"), CollisionClass::named("bullet"));
        assert_ne!(CollisionClass::named("bullet"), CollisionClass::named("bomb"));
    }

    #[test]
    fn test_collision_filter_debris() {
        let debris = CollisionFilter::debris();
        assert!(!debris.collides_with(&CollisionFilter::debris()));
        assert!(debris.collides_with(&CollisionFilter::default()));
    }
}
