//! Compound decomposition
//!
//! Splits a decomposable compound into its parts. Each part keeps its world
//! placement and the velocity of the point it sat on.

use rust2d_math::Vec2;

use crate::entity::EntityKey;
use crate::error::EntityError;
use crate::world::World;

impl World {
    /// Replace a compound by its registered parts, returning the alive pieces.
    ///
    /// With `recursive`, nested decomposable parts are split too. The compound
    /// stays stored, dead and without parts; there is no way back.
    pub fn decompose(&mut self, key: EntityKey, recursive: bool) -> Result<Vec<EntityKey>, EntityError> {
        let entity = self.entities.get(key).ok_or(EntityError::UnknownEntity)?;
        if !entity.decomposable || entity.children.is_empty() {
            return Err(EntityError::NotDecomposable);
        }
        let children = entity.children.clone();
        let compound = self.physics.get_body(entity.body).cloned().ok_or(EntityError::UnknownEntity)?;

        self.unregister(key);

        let mut pieces = Vec::with_capacity(children.len());
        for child in children {
            let Some(part) = self.entities.get_mut(child) else {
                continue;
            };
            part.parent = None;
            let (node, body, child_angle) = (part.node, part.body, part.child_angle);

            let pivot = self.scene.get(node).map_or(Vec2::ZERO, |n| n.transform().pivot);
            let anchor = self.scene.map_to_scene(node, pivot).unwrap_or(compound.position);
            if let Some(b) = self.physics.get_body_mut(body) {
                b.position = anchor;
                b.angle = compound.angle + child_angle;
                b.velocity = compound.velocity_at_world_point(anchor);
                b.angular_velocity = compound.angular_velocity;
            }

            self.scene.remove_from_group(node);
            self.register(child);

            let nested = recursive && self.entities.get(child).is_some_and(|e| e.decomposable);
            if nested {
                pieces.extend(self.decompose(child, true)?);
            } else {
                pieces.push(child);
            }
        }

        if let Some(entity) = self.entities.get_mut(key) {
            entity.children.clear();
            entity.decomposable = false;
        }
        log::info!("decomposed {:?} into {} pieces", key, pieces.len());
        Ok(pieces)
    }
}
