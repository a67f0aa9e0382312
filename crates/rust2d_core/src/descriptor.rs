//! Shape descriptors
//!
//! A [`ShapeDescriptor`] pairs the collision geometry of an entity with the
//! render node that draws it. Geometry is expressed in the entity's local
//! frame; the body origin is the point the entity rotates about.

use rust2d_math::{march, polygon, GeometryError, MarchStyle, Vec2};
use rust2d_physics::{CollisionClass, CollisionFilter, PhysicsMaterial, Shape, ShapeGeometry};

use crate::scene_graph::{Material, Node, NodeKey, NodeKind, SceneGraph};

/// Default font size for text descriptors
pub const DEFAULT_FONT_SIZE: f32 = 12.0;
/// Average glyph advance as a fraction of the font size
const GLYPH_ASPECT: f32 = 0.6;

/// One collision shape of a descriptor, not yet bound to a body
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeDef {
    pub geometry: ShapeGeometry,
    pub material: PhysicsMaterial,
    /// Mass per unit area; `None` leaves mass to the entity
    pub density: Option<f32>,
    pub filter: CollisionFilter,
}

impl ShapeDef {
    /// Same definition expressed in a parent frame
    pub fn placed(&self, offset: Vec2, angle: f32) -> Self {
        Self { geometry: self.geometry.placed(offset, angle), ..self.clone() }
    }

    /// Build the physics shape for a given collision class
    pub fn to_shape(&self, class: CollisionClass) -> Shape {
        Shape::new(self.geometry.clone())
            .with_material(self.material)
            .with_filter(self.filter)
            .with_class(class)
    }
}

/// Physical properties shared by every shape of a descriptor
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeProps {
    pub density: Option<f32>,
    pub material: PhysicsMaterial,
    /// Visual only: no collision shapes are emitted
    pub airy: bool,
    pub filter: CollisionFilter,
}

impl Default for ShapeProps {
    fn default() -> Self {
        Self {
            density: None,
            material: PhysicsMaterial::default(),
            airy: false,
            filter: CollisionFilter::default(),
        }
    }
}

/// A placed child of a compound descriptor
#[derive(Clone, Debug, PartialEq)]
pub struct CompoundPart {
    pub descriptor: ShapeDescriptor,
    /// Placement of the child's origin in the compound frame
    pub offset: Vec2,
    /// Rotation of the child relative to the compound
    pub angle: f32,
    /// Mass of the child once decomposed
    pub mass: Option<f32>,
    /// Collision class of the child once decomposed
    pub class: CollisionClass,
    pub name: Option<String>,
    /// A nested compound part that can itself be split off
    pub decomposable: bool,
}

impl CompoundPart {
    pub fn new(descriptor: ShapeDescriptor, offset: Vec2) -> Self {
        Self {
            descriptor,
            offset,
            angle: 0.0,
            mass: None,
            class: CollisionClass::DEFAULT,
            name: None,
            decomposable: false,
        }
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn with_class(mut self, class: CollisionClass) -> Self {
        self.class = class;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn decomposable(mut self) -> Self {
        self.decomposable = true;
        self
    }
}

/// Geometry variants
#[derive(Clone, Debug, PartialEq)]
pub enum DescriptorKind {
    Circle { radius: f32, offset: Vec2 },
    Rect { size: Vec2, offset: Vec2 },
    /// `outline` is the closed loop drawn; `pieces` its convex decomposition
    Polygon { outline: Vec<Vec2>, pieces: Vec<Vec<Vec2>> },
    /// Capsule from `a` to `b`
    Segment { a: Vec2, b: Vec2, thickness: f32 },
    /// Text box centred on the origin
    Text { text: String, font_size: f32, size: Vec2 },
    /// Image centred on the origin; `rounded` gives it a capsule outline
    Pixmap { source: String, size: Vec2, rounded: bool },
    Compound { parts: Vec<CompoundPart> },
}

/// Collision shapes plus render node of one entity
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeDescriptor {
    pub kind: DescriptorKind,
    pub props: ShapeProps,
    /// Paint of the render node
    pub material: Material,
}

impl ShapeDescriptor {
    fn from_kind(kind: DescriptorKind) -> Self {
        Self { kind, props: ShapeProps::default(), material: Material::default() }
    }

    /// Disc centred on the origin
    pub fn circle(radius: f32) -> Self {
        Self::from_kind(DescriptorKind::Circle { radius, offset: Vec2::ZERO })
    }

    /// Disc centred on `offset`
    pub fn circle_at(radius: f32, offset: Vec2) -> Self {
        Self::from_kind(DescriptorKind::Circle { radius, offset })
    }

    /// Box centred on the origin
    pub fn rect(width: f32, height: f32) -> Self {
        Self::rect_at(width, height, Vec2::ZERO)
    }

    /// Box centred on `offset`
    pub fn rect_at(width: f32, height: f32, offset: Vec2) -> Self {
        Self::from_kind(DescriptorKind::Rect { size: Vec2::new(width, height), offset })
    }

    /// Polygon from an outline, open or closed.
    ///
    /// The loop is closed and split into convex pieces. A clockwise outline is
    /// retried reversed with the same zero tolerance, so both windings keep
    /// every vertex; if that fails too, the geometry error is returned.
    pub fn polygon(points: &[Vec2]) -> Result<Self, GeometryError> {
        let outline = polygon::close_loop(points);
        let pieces = match polygon::convex_decomposition(&outline, 0.0) {
            Ok(pieces) => pieces,
            Err(_) => {
                let mut reversed = outline.clone();
                reversed.reverse();
                polygon::convex_decomposition(&reversed, 0.0)?
            }
        };
        Ok(Self::from_kind(DescriptorKind::Polygon { outline, pieces }))
    }

    /// One polygon per contour of the `marker` cells of a character grid.
    ///
    /// The grid is padded with one empty cell on every side before marching,
    /// so coordinates are those of the padded grid scaled by `block_size`.
    pub fn polygons_from_matrix<S: AsRef<str>>(
        rows: &[S],
        marker: char,
        block_size: f32,
        style: MarchStyle,
    ) -> Result<Vec<Self>, GeometryError> {
        let cells: Vec<Vec<bool>> = rows
            .iter()
            .map(|row| row.as_ref().chars().map(|c| c == marker).collect())
            .collect();
        let width = cells.iter().map(Vec::len).max().unwrap_or(0);
        let height = cells.len();

        let solid = |x: usize, y: usize| {
            if x == 0 || y == 0 || x > width || y > height {
                return false;
            }
            cells[y - 1].get(x - 1).copied().unwrap_or(false)
        };

        march(width + 2, height + 2, style, solid)
            .into_iter()
            .map(|contour| {
                let scaled: Vec<Vec2> = contour.into_iter().map(|p| p * block_size).collect();
                Self::polygon(&scaled)
            })
            .collect()
    }

    /// Capsule of `length` along x, centred on the origin
    pub fn segment(length: f32, thickness: f32) -> Self {
        let half = length * 0.5;
        Self::from_kind(DescriptorKind::Segment {
            a: Vec2::new(-half, 0.0),
            b: Vec2::new(half, 0.0),
            thickness,
        })
    }

    /// Capsule of `length` along x, starting at the origin
    pub fn segment_from_start(length: f32, thickness: f32) -> Self {
        Self::from_kind(DescriptorKind::Segment {
            a: Vec2::ZERO,
            b: Vec2::new(length, 0.0),
            thickness,
        })
    }

    /// Text box sized from an average glyph advance
    pub fn text(text: impl Into<String>, font_size: f32) -> Self {
        let text = text.into();
        let size = Vec2::new(GLYPH_ASPECT * font_size * text.chars().count() as f32, font_size);
        Self::from_kind(DescriptorKind::Text { text, font_size, size })
    }

    /// Image of the given size
    pub fn pixmap(source: impl Into<String>, width: f32, height: f32, rounded: bool) -> Self {
        Self::from_kind(DescriptorKind::Pixmap {
            source: source.into(),
            size: Vec2::new(width, height),
            rounded,
        })
    }

    /// Rigid aggregate of child descriptors
    pub fn compound(parts: Vec<CompoundPart>) -> Self {
        Self::from_kind(DescriptorKind::Compound { parts })
    }

    /// Set the mass per unit area
    pub fn with_density(mut self, density: f32) -> Self {
        self.props.density = Some(density);
        self
    }

    pub fn with_elasticity(mut self, elasticity: f32) -> Self {
        self.props.material.elasticity = elasticity;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.props.material.friction = friction;
        self
    }

    pub fn with_physics_material(mut self, material: PhysicsMaterial) -> Self {
        self.props.material = material;
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.props.filter = filter;
        self
    }

    /// Visual only
    pub fn airy(mut self) -> Self {
        self.props.airy = true;
        self
    }

    /// Paint of the render node
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn is_airy(&self) -> bool {
        self.props.airy
    }

    fn def(&self, geometry: ShapeGeometry) -> ShapeDef {
        ShapeDef {
            geometry,
            material: self.props.material,
            density: self.props.density,
            filter: self.props.filter,
        }
    }

    /// Collision shapes in the local frame; empty when airy
    pub fn shape_defs(&self) -> Vec<ShapeDef> {
        if self.props.airy {
            return Vec::new();
        }
        match &self.kind {
            DescriptorKind::Circle { radius, offset } => {
                vec![self.def(ShapeGeometry::Circle { radius: *radius, offset: *offset })]
            }
            DescriptorKind::Rect { size, offset } => {
                vec![self.def(ShapeGeometry::rect(size.x, size.y, *offset))]
            }
            DescriptorKind::Polygon { pieces, .. } => pieces
                .iter()
                .map(|piece| self.def(ShapeGeometry::Polygon { vertices: piece.clone() }))
                .collect(),
            DescriptorKind::Segment { a, b, thickness } => {
                vec![self.def(ShapeGeometry::Segment { a: *a, b: *b, radius: thickness * 0.5 })]
            }
            DescriptorKind::Text { size, .. } => {
                vec![self.def(ShapeGeometry::rect(size.x, size.y, Vec2::ZERO))]
            }
            DescriptorKind::Pixmap { size, rounded, .. } => {
                let geometry = if *rounded {
                    let half_w = size.x * 0.5;
                    let half_h = size.y * 0.5;
                    ShapeGeometry::Segment {
                        a: Vec2::new(-half_w + half_h, 0.0),
                        b: Vec2::new(half_w - half_h, 0.0),
                        radius: half_h,
                    }
                } else {
                    ShapeGeometry::rect(size.x, size.y, Vec2::ZERO)
                };
                vec![self.def(geometry)]
            }
            DescriptorKind::Compound { parts } => parts
                .iter()
                .flat_map(|part| {
                    part.descriptor
                        .shape_defs()
                        .into_iter()
                        .map(move |def| def.placed(part.offset, part.angle))
                })
                .collect(),
        }
    }

    /// Mass and moment about the origin from shape densities, if any shape has one
    pub fn mass_properties(&self) -> Option<(f32, f32)> {
        let defs = self.shape_defs();
        let mut found = false;
        let (mut mass, mut moment) = (0.0, 0.0);
        for def in &defs {
            if let Some(density) = def.density {
                let m = def.geometry.area() * density;
                mass += m;
                moment += def.geometry.moment(m);
                found = true;
            }
        }
        found.then_some((mass, moment))
    }

    /// Moment about the origin for a given total mass spread by area
    pub fn moment_for_mass(&self, mass: f32) -> f32 {
        let defs = self.shape_defs();
        let total_area: f32 = defs.iter().map(|d| d.geometry.area()).sum();
        if defs.is_empty() || total_area <= 0.0 {
            return f32::INFINITY;
        }
        defs.iter()
            .map(|d| d.geometry.moment(mass * d.geometry.area() / total_area))
            .sum()
    }

    /// Render node without any compound children; compound parts are attached
    /// by the caller so they can become entities of their own
    pub fn node(&self) -> Node {
        let kind = match &self.kind {
            DescriptorKind::Circle { radius, offset } => {
                if *offset == Vec2::ZERO {
                    NodeKind::Ellipse { width: radius * 2.0, height: radius * 2.0 }
                } else {
                    NodeKind::Polygon { points: circle_outline(*radius, *offset) }
                }
            }
            DescriptorKind::Rect { size, offset } => NodeKind::Rect {
                origin: *offset - *size * 0.5,
                size: *size,
            },
            DescriptorKind::Polygon { outline, .. } => NodeKind::Polygon { points: outline.clone() },
            DescriptorKind::Segment { a, b, thickness } => NodeKind::Line {
                from: *a,
                to: *b,
                width: *thickness,
            },
            DescriptorKind::Text { text, font_size, size } => NodeKind::Text {
                text: text.clone(),
                font_size: *font_size,
                size: *size,
            },
            DescriptorKind::Pixmap { source, size, .. } => NodeKind::Pixmap {
                source: source.clone(),
                size: *size,
            },
            DescriptorKind::Compound { .. } => NodeKind::Group,
        };
        let node = Node::new(kind).with_material(self.material);
        match &self.kind {
            // Text is laid out from its top-left corner and turns about its centre
            DescriptorKind::Text { size, .. } => node.with_pivot(*size * 0.5),
            _ => node,
        }
    }

    /// Build the full node tree, including compound children, into `scene`
    pub fn build_node(&self, scene: &mut SceneGraph) -> NodeKey {
        let key = scene.insert(self.node());
        if let DescriptorKind::Compound { parts } = &self.kind {
            for part in parts {
                let child = part.descriptor.build_node(scene);
                place_child(scene, child, part);
                scene.add_to_group(key, child);
            }
        }
        key
    }
}

/// Position a compound child's node so its origin lands on the part offset
pub(crate) fn place_child(scene: &mut SceneGraph, child: NodeKey, part: &CompoundPart) {
    let pivot = scene.get(child).map_or(Vec2::ZERO, |n| n.transform().pivot);
    scene.set_rotation(child, part.angle);
    scene.set_position(child, part.offset - pivot);
}

fn circle_outline(radius: f32, offset: Vec2) -> Vec<Vec2> {
    const SEGMENTS: usize = 24;
    (0..SEGMENTS)
        .map(|i| offset + Vec2::from_angle(i as f32 / SEGMENTS as f32 * std::f32::consts::TAU) * radius)
        .collect()
}
