//! Error types for entity construction and behaviors

use rust2d_math::GeometryError;

/// Error building or manipulating an entity
#[derive(Debug, Clone, PartialEq)]
pub enum EntityError {
    /// A static entity was given a linear or angular velocity
    StaticWithVelocity,
    /// Decomposition requested on something that is not a decomposable compound
    NotDecomposable,
    /// The key does not refer to a stored entity
    UnknownEntity,
    /// No entity carries the given name
    NameNotFound(String),
    /// Shape geometry could not be built
    Geometry(GeometryError),
}

impl From<GeometryError> for EntityError {
    fn from(e: GeometryError) -> Self {
        EntityError::Geometry(e)
    }
}

impl std::fmt::Display for EntityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityError::StaticWithVelocity => write!(f, "static entities cannot have a velocity"),
            EntityError::NotDecomposable => write!(f, "entity is not a decomposable compound"),
            EntityError::UnknownEntity => write!(f, "unknown entity"),
            EntityError::NameNotFound(name) => write!(f, "no entity named '{}'", name),
            EntityError::Geometry(e) => write!(f, "geometry error: {}", e),
        }
    }
}

impl std::error::Error for EntityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EntityError::Geometry(e) => Some(e),
            _ => None,
        }
    }
}

/// Failure reported by an entity behavior during the tick
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorError {
    message: String,
}

impl BehaviorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for BehaviorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "behavior error: {}", self.message)
    }
}

impl std::error::Error for BehaviorError {}
