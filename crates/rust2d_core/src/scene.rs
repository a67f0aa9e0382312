//! Scene serialization
//!
//! A Scene is a RON description of a level: physics settings, entity
//! templates and an optional central gravity field. Instantiating it fills a
//! [`World`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use rust2d_math::{MarchStyle, Vec2};
use rust2d_physics::{BodyKind, CollisionClass};

use crate::descriptor::ShapeDescriptor;
use crate::entity::{EntityDesc, EntityKey};
use crate::error::EntityError;
use crate::scene_graph::Material;
use crate::world::World;

/// Geometry of an entity template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeTemplate {
    Circle { radius: f32 },
    Rect { width: f32, height: f32 },
    Polygon { points: Vec<[f32; 2]> },
    Segment { length: f32, thickness: f32 },
    /// Capsule between two world points; placement comes from the points
    Line { from: [f32; 2], to: [f32; 2], thickness: f32 },
    Text { text: String, font_size: f32 },
    Pixmap { source: String, width: f32, height: f32, #[serde(default)] rounded: bool },
    /// One entity per contour of the `marker` cells
    Matrix { rows: Vec<String>, marker: char, block_size: f32, #[serde(default)] soft: bool },
}

impl ShapeTemplate {
    /// Descriptors this template expands to
    pub fn descriptors(&self) -> Result<Vec<ShapeDescriptor>, EntityError> {
        let single = match self {
            ShapeTemplate::Circle { radius } => ShapeDescriptor::circle(*radius),
            ShapeTemplate::Rect { width, height } => ShapeDescriptor::rect(*width, *height),
            ShapeTemplate::Polygon { points } => {
                let points: Vec<Vec2> = points.iter().map(|&p| Vec2::from(p)).collect();
                ShapeDescriptor::polygon(&points)?
            }
            ShapeTemplate::Segment { length, thickness } => ShapeDescriptor::segment(*length, *thickness),
            ShapeTemplate::Line { from, to, thickness } => {
                ShapeDescriptor::segment(Vec2::from(*from).distance(Vec2::from(*to)), *thickness)
            }
            ShapeTemplate::Text { text, font_size } => ShapeDescriptor::text(text.clone(), *font_size),
            ShapeTemplate::Pixmap { source, width, height, rounded } => {
                ShapeDescriptor::pixmap(source.clone(), *width, *height, *rounded)
            }
            ShapeTemplate::Matrix { rows, marker, block_size, soft } => {
                let style = if *soft { MarchStyle::Soft } else { MarchStyle::Hard };
                return Ok(ShapeDescriptor::polygons_from_matrix(rows.as_slice(), *marker, *block_size, style)?);
            }
        };
        Ok(vec![single])
    }
}

/// Scheduled removal of a template's entities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransientTemplate {
    pub duration: f64,
    #[serde(default)]
    pub fading: bool,
}

/// Serializable description of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTemplate {
    #[serde(default)]
    pub name: Option<String>,
    pub shape: ShapeTemplate,
    #[serde(default)]
    pub kind: BodyKind,
    #[serde(default)]
    pub position: [f32; 2],
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub velocity: [f32; 2],
    #[serde(default)]
    pub angular_velocity: f32,
    #[serde(default)]
    pub mass: Option<f32>,
    #[serde(default)]
    pub density: Option<f32>,
    #[serde(default)]
    pub elasticity: f32,
    #[serde(default)]
    pub friction: f32,
    #[serde(default)]
    pub airy: bool,
    /// Collision class by name
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub material: Option<Material>,
    #[serde(default)]
    pub transient: Option<TransientTemplate>,
}

impl EntityTemplate {
    pub fn new(shape: ShapeTemplate) -> Self {
        Self {
            name: None,
            shape,
            kind: BodyKind::Dynamic,
            position: [0.0, 0.0],
            angle: 0.0,
            velocity: [0.0, 0.0],
            angular_velocity: 0.0,
            mass: None,
            density: None,
            elasticity: 0.0,
            friction: 0.0,
            airy: false,
            class: None,
            material: None,
            transient: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_kind(mut self, kind: BodyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    pub fn with_velocity(mut self, x: f32, y: f32) -> Self {
        self.velocity = [x, y];
        self
    }

    /// Entity descriptions, one per descriptor the shape expands to
    pub fn to_descs(&self) -> Result<Vec<EntityDesc>, EntityError> {
        let descriptors = self.shape.descriptors()?;
        let (position, angle) = match &self.shape {
            ShapeTemplate::Line { from, to, .. } => {
                let (from, to) = (Vec2::from(*from), Vec2::from(*to));
                ((from + to) * 0.5, (to - from).angle())
            }
            _ => (Vec2::from(self.position), self.angle),
        };

        Ok(descriptors
            .into_iter()
            .map(|descriptor| {
                let mut descriptor = descriptor.with_elasticity(self.elasticity).with_friction(self.friction);
                if let Some(density) = self.density {
                    descriptor = descriptor.with_density(density);
                }
                if let Some(material) = self.material {
                    descriptor = descriptor.with_material(material);
                }
                if self.airy {
                    descriptor = descriptor.airy();
                }
                let mut desc = EntityDesc::new(descriptor)
                    .at(position)
                    .with_angle(angle)
                    .with_kind(self.kind);
                // A zero velocity in a scene file means none was given
                if self.velocity != [0.0, 0.0] {
                    desc = desc.with_velocity(Vec2::from(self.velocity));
                }
                if self.angular_velocity != 0.0 {
                    desc = desc.with_angular_velocity(self.angular_velocity);
                }
                desc.mass = self.mass;
                desc.name = self.name.clone();
                if let Some(class) = &self.class {
                    desc.class = CollisionClass::named(class);
                }
                desc
            })
            .collect())
    }
}

/// Central gravity around a named entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralGravityTemplate {
    pub attractor: String,
    pub force: f32,
    pub radius: f32,
}

/// A serializable scene containing entity templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene name (for display/debugging)
    pub name: String,
    pub entities: Vec<EntityTemplate>,
    /// Uniform gravity [x, y]; +y is down
    #[serde(default)]
    pub gravity: Option<[f32; 2]>,
    #[serde(default)]
    pub central_gravity: Option<CentralGravityTemplate>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
            gravity: None,
            central_gravity: None,
        }
    }

    /// Load a scene from a RON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SceneLoadError> {
        let contents = fs::read_to_string(path)?;
        let scene = ron::from_str(&contents)?;
        Ok(scene)
    }

    /// Save a scene to a RON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SceneSaveError> {
        let pretty = ron::ser::PrettyConfig::new()
            .struct_names(true)
            .enumerate_arrays(false);
        let contents = ron::ser::to_string_pretty(self, pretty)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn add_entity(&mut self, entity: EntityTemplate) {
        self.entities.push(entity);
    }

    pub fn with_gravity(mut self, x: f32, y: f32) -> Self {
        self.gravity = Some([x, y]);
        self
    }

    pub fn with_central_gravity(mut self, attractor: impl Into<String>, force: f32, radius: f32) -> Self {
        self.central_gravity = Some(CentralGravityTemplate { attractor: attractor.into(), force, radius });
        self
    }

    /// Create and register every template's entities in `world`.
    ///
    /// Entities created before a failing template stay in the world.
    pub fn instantiate(&self, world: &mut World) -> Result<Vec<EntityKey>, EntityError> {
        if let Some([x, y]) = self.gravity {
            world.physics_mut().config.gravity = Vec2::new(x, y);
        }

        let mut keys = Vec::new();
        for template in &self.entities {
            for desc in template.to_descs()? {
                let key = world.spawn(desc)?;
                if let Some(transient) = template.transient {
                    world.mark_transient(key, transient.duration, transient.fading);
                }
                keys.push(key);
            }
        }

        if let Some(field) = &self.central_gravity {
            let attractor = world
                .find_by_name(&field.attractor)
                .ok_or_else(|| EntityError::NameNotFound(field.attractor.clone()))?;
            world.set_central_gravity(attractor, field.force, field.radius)?;
        }
        log::info!("instantiated scene '{}' with {} entities", self.name, keys.len());
        Ok(keys)
    }
}

/// Error loading a scene
#[derive(Debug)]
pub enum SceneLoadError {
    /// IO error (file not found, permission denied, etc.)
    Io(io::Error),
    /// Parse error (invalid RON syntax)
    Parse(ron::error::SpannedError),
}

impl From<io::Error> for SceneLoadError {
    fn from(e: io::Error) -> Self {
        SceneLoadError::Io(e)
    }
}

impl From<ron::error::SpannedError> for SceneLoadError {
    fn from(e: ron::error::SpannedError) -> Self {
        SceneLoadError::Parse(e)
    }
}

impl std::fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneLoadError::Io(e) => write!(f, "IO error: {}", e),
            SceneLoadError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for SceneLoadError {}

/// Error saving a scene
#[derive(Debug)]
pub enum SceneSaveError {
    /// IO error (permission denied, disk full, etc.)
    Io(io::Error),
    /// Serialization error
    Serialize(ron::Error),
}

impl From<io::Error> for SceneSaveError {
    fn from(e: io::Error) -> Self {
        SceneSaveError::Io(e)
    }
}

impl From<ron::Error> for SceneSaveError {
    fn from(e: ron::Error) -> Self {
        SceneSaveError::Serialize(e)
    }
}

impl std::fmt::Display for SceneSaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneSaveError::Io(e) => write!(f, "IO error: {}", e),
            SceneSaveError::Serialize(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

impl std::error::Error for SceneSaveError {}
