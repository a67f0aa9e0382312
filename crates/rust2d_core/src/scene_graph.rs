//! Retained render tree
//!
//! Nodes carry a local transform, opacity and stacking order, and may be
//! grouped under a parent. Only nodes added to the scene (directly or through
//! an ancestor) are visible to render views, which consume a flat snapshot of
//! [`NodeInstance`]s plus per-node dirty flags.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use rust2d_math::Vec2;
use serde::{Serialize, Deserialize};
use slotmap::{new_key_type, SlotMap};

use crate::Transform2D;

new_key_type! {
    /// Key to a node in the scene graph
    pub struct NodeKey;
}

bitflags! {
    /// Flags indicating which parts of a node have changed since the last frame
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        /// No changes
        const NONE = 0;
        /// Position, rotation or pivot changed
        const TRANSFORM = 1 << 0;
        /// Opacity changed
        const OPACITY = 1 << 1;
        /// Parent, children or scene membership changed
        const STRUCTURE = 1 << 2;
        /// All flags set
        const ALL = Self::TRANSFORM.bits() | Self::OPACITY.bits() | Self::STRUCTURE.bits();
    }
}

/// A simple material with just a base color
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Base color as RGBA (each component 0.0-1.0)
    pub base_color: [f32; 4],
}

impl Default for Material {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Material {
    /// Create a new material with the given RGBA color
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { base_color: [r, g, b, a] }
    }

    /// Create a new opaque material with the given RGB color
    pub fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub const WHITE: Self = Self { base_color: [1.0, 1.0, 1.0, 1.0] };
    pub const GRAY: Self = Self { base_color: [0.5, 0.5, 0.5, 1.0] };
    pub const RED: Self = Self { base_color: [1.0, 0.0, 0.0, 1.0] };
    pub const GREEN: Self = Self { base_color: [0.0, 1.0, 0.0, 1.0] };
    pub const BLUE: Self = Self { base_color: [0.0, 0.0, 1.0, 1.0] };
    pub const YELLOW: Self = Self { base_color: [1.0, 1.0, 0.0, 1.0] };
}

/// Visual content of a node, in node-local coordinates
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Ellipse centred on the node origin
    Ellipse { width: f32, height: f32 },
    /// Rectangle with its top-left corner at `origin`
    Rect { origin: Vec2, size: Vec2 },
    /// Closed outline
    Polygon { points: Vec<Vec2> },
    /// Stroked line
    Line { from: Vec2, to: Vec2, width: f32 },
    /// Text laid out from the node origin
    Text { text: String, font_size: f32, size: Vec2 },
    /// Image centred on the node origin
    Pixmap { source: String, size: Vec2 },
    /// Container without content of its own
    Group,
}

impl NodeKind {
    /// Small integer tag used by render views
    pub fn tag(&self) -> u32 {
        match self {
            NodeKind::Ellipse { .. } => 0,
            NodeKind::Rect { .. } => 1,
            NodeKind::Polygon { .. } => 2,
            NodeKind::Line { .. } => 3,
            NodeKind::Text { .. } => 4,
            NodeKind::Pixmap { .. } => 5,
            NodeKind::Group => 6,
        }
    }
}

/// A node of the render tree
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub material: Material,
    transform: Transform2D,
    opacity: f32,
    z: f32,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    in_scene: bool,
    dirty: DirtyFlags,
}

impl Node {
    /// Create a detached node
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            material: Material::default(),
            transform: Transform2D::identity(),
            opacity: 1.0,
            z: 0.0,
            parent: None,
            children: Vec::new(),
            in_scene: false,
            dirty: DirtyFlags::ALL,
        }
    }

    /// Set the material
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Set the stacking order
    pub fn with_z(mut self, z: f32) -> Self {
        self.z = z;
        self
    }

    /// Set the rotation pivot
    pub fn with_pivot(mut self, pivot: Vec2) -> Self {
        self.transform.pivot = pivot;
        self
    }

    pub fn transform(&self) -> &Transform2D {
        &self.transform
    }

    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    pub fn rotation(&self) -> f32 {
        self.transform.rotation
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn z(&self) -> f32 {
        self.z
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn is_in_scene(&self) -> bool {
        self.in_scene
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }
}

/// Flat per-node record handed to render views
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct NodeInstance {
    /// Scene position of the node origin
    pub position: [f32; 2],
    /// Scene rotation in radians
    pub rotation: f32,
    /// Effective opacity (product along the parent chain)
    pub opacity: f32,
    pub color: [f32; 4],
    pub z: f32,
    /// [`NodeKind::tag`]
    pub kind: u32,
    pub _padding: [u32; 2],
}

/// The render tree
#[derive(Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, Node>,
    /// Top-level nodes in the scene, in insertion order
    roots: Vec<NodeKey>,
}

impl SceneGraph {
    /// Create an empty scene graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a detached node
    pub fn insert(&mut self, node: Node) -> NodeKey {
        self.nodes.insert(node)
    }

    /// Store a detached node of the given kind
    pub fn create(&mut self, kind: NodeKind) -> NodeKey {
        self.insert(Node::new(kind))
    }

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Number of stored nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes currently in the scene
    pub fn in_scene_count(&self) -> usize {
        self.nodes.values().filter(|n| n.in_scene).count()
    }

    /// Whether a node is in the scene
    pub fn is_in_scene(&self, key: NodeKey) -> bool {
        self.nodes.get(key).map_or(false, |n| n.in_scene)
    }

    /// Top-level nodes in the scene
    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    fn mark(&mut self, key: NodeKey, flags: DirtyFlags) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.dirty |= flags;
        }
    }

    fn set_subtree_in_scene(&mut self, key: NodeKey, in_scene: bool) {
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(k) {
                node.in_scene = in_scene;
                node.dirty |= DirtyFlags::STRUCTURE;
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Put a top-level node (and its subtree) into the scene. No-op for
    /// grouped or already present nodes.
    pub fn add_to_scene(&mut self, key: NodeKey) -> bool {
        match self.nodes.get(key) {
            Some(node) if node.parent.is_none() && !node.in_scene => {}
            _ => return false,
        }
        self.set_subtree_in_scene(key, true);
        self.roots.push(key);
        true
    }

    /// Take a top-level node (and its subtree) out of the scene; it stays stored
    pub fn remove_from_scene(&mut self, key: NodeKey) -> bool {
        match self.nodes.get(key) {
            Some(node) if node.parent.is_none() && node.in_scene => {}
            _ => return false,
        }
        self.set_subtree_in_scene(key, false);
        self.roots.retain(|&k| k != key);
        true
    }

    /// Parent `child` under `group`; the child's transform is read in the group's frame
    pub fn add_to_group(&mut self, group: NodeKey, child: NodeKey) -> bool {
        if group == child || !self.nodes.contains_key(group) {
            return false;
        }
        let in_scene = match self.nodes.get(child) {
            Some(node) if node.parent.is_none() => node.in_scene,
            _ => return false,
        };
        if in_scene {
            self.roots.retain(|&k| k != child);
        }
        let group_in_scene = self.is_in_scene(group);
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(group);
        }
        if let Some(node) = self.nodes.get_mut(group) {
            node.children.push(child);
            node.dirty |= DirtyFlags::STRUCTURE;
        }
        self.set_subtree_in_scene(child, group_in_scene);
        true
    }

    /// Unparent `child`, keeping its scene placement. A child of an in-scene
    /// group stays in the scene as a top-level node.
    pub fn remove_from_group(&mut self, child: NodeKey) -> bool {
        let Some(parent) = self.nodes.get(child).and_then(|n| n.parent) else {
            return false;
        };
        let origin = self.map_to_scene(child, Vec2::ZERO).unwrap_or(Vec2::ZERO);
        let rotation = self.scene_rotation(child).unwrap_or(0.0);

        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|&k| k != child);
            node.dirty |= DirtyFlags::STRUCTURE;
        }
        let Some(node) = self.nodes.get_mut(child) else {
            return false;
        };
        node.parent = None;
        node.transform.rotation = rotation;
        node.transform.position = node.transform.position_for_origin(origin);
        node.dirty |= DirtyFlags::ALL;
        if node.in_scene {
            self.roots.push(child);
        }
        true
    }

    /// Destroy a node and its subtree
    pub fn destroy(&mut self, key: NodeKey) {
        if let Some(parent) = self.nodes.get(key).and_then(|n| n.parent) {
            if let Some(node) = self.nodes.get_mut(parent) {
                node.children.retain(|&k| k != key);
                node.dirty |= DirtyFlags::STRUCTURE;
            }
        }
        self.roots.retain(|&k| k != key);
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.remove(k) {
                stack.extend(node.children);
            }
        }
    }

    /// Set a node's position in its parent's frame
    pub fn set_position(&mut self, key: NodeKey, position: Vec2) {
        if let Some(node) = self.nodes.get_mut(key) {
            if node.transform.position != position {
                node.transform.position = position;
                node.dirty |= DirtyFlags::TRANSFORM;
            }
        }
    }

    /// Set a node's rotation (radians) about its pivot
    pub fn set_rotation(&mut self, key: NodeKey, rotation: f32) {
        if let Some(node) = self.nodes.get_mut(key) {
            if node.transform.rotation != rotation {
                node.transform.rotation = rotation;
                node.dirty |= DirtyFlags::TRANSFORM;
            }
        }
    }

    /// Set the local rotation pivot
    pub fn set_pivot(&mut self, key: NodeKey, pivot: Vec2) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.transform.pivot = pivot;
            node.dirty |= DirtyFlags::TRANSFORM;
        }
    }

    /// Set a node's own opacity, clamped to [0, 1]
    pub fn set_opacity(&mut self, key: NodeKey, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        if let Some(node) = self.nodes.get_mut(key) {
            if node.opacity != opacity {
                node.opacity = opacity;
                node.dirty |= DirtyFlags::OPACITY;
            }
        }
    }

    /// Set a node's stacking order
    pub fn set_z(&mut self, key: NodeKey, z: f32) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.z = z;
        }
        self.mark(key, DirtyFlags::STRUCTURE);
    }

    /// Map a node-local point to scene coordinates through the parent chain
    pub fn map_to_scene(&self, key: NodeKey, local: Vec2) -> Option<Vec2> {
        let mut point = local;
        let mut current = Some(key);
        while let Some(k) = current {
            let node = self.nodes.get(k)?;
            point = node.transform.transform_point(point);
            current = node.parent;
        }
        Some(point)
    }

    /// Scene position of a node's origin
    pub fn scene_position(&self, key: NodeKey) -> Option<Vec2> {
        self.map_to_scene(key, Vec2::ZERO)
    }

    /// Sum of rotations along the parent chain
    pub fn scene_rotation(&self, key: NodeKey) -> Option<f32> {
        let mut rotation = 0.0;
        let mut current = Some(key);
        while let Some(k) = current {
            let node = self.nodes.get(k)?;
            rotation += node.transform.rotation;
            current = node.parent;
        }
        Some(rotation)
    }

    /// Product of opacities along the parent chain
    pub fn effective_opacity(&self, key: NodeKey) -> Option<f32> {
        let mut opacity = 1.0;
        let mut current = Some(key);
        while let Some(k) = current {
            let node = self.nodes.get(k)?;
            opacity *= node.opacity;
            current = node.parent;
        }
        Some(opacity)
    }

    /// Snapshot of every node in the scene, sorted by stacking order
    pub fn instances(&self) -> Vec<NodeInstance> {
        let mut out: Vec<NodeInstance> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.in_scene)
            .filter_map(|(key, node)| {
                Some(NodeInstance {
                    position: self.scene_position(key)?.to_array(),
                    rotation: self.scene_rotation(key)?,
                    opacity: self.effective_opacity(key)?,
                    color: node.material.base_color,
                    z: node.z,
                    kind: node.kind.tag(),
                    _padding: [0; 2],
                })
            })
            .collect();
        out.sort_by(|a, b| a.z.total_cmp(&b.z));
        out
    }

    /// Keys and flags of nodes changed since the last [`clear_dirty`](Self::clear_dirty)
    pub fn dirty_nodes(&self) -> Vec<(NodeKey, DirtyFlags)> {
        self.nodes
            .iter()
            .filter(|(_, n)| !n.dirty.is_empty())
            .map(|(k, n)| (k, n.dirty))
            .collect()
    }

    /// Reset all dirty flags
    pub fn clear_dirty(&mut self) {
        for node in self.nodes.values_mut() {
            node.dirty = DirtyFlags::NONE;
        }
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
    fn test_add_and_remove_from_scene() {
        let mut graph = SceneGraph::new();
        let key = graph.create(NodeKind::Ellipse { width: 2.0, height: 2.0 });
        assert!(!graph.is_in_scene(key));

        assert!(graph.add_to_scene(key));
        assert!(!graph.add_to_scene(key));
        assert!(graph.is_in_scene(key));
        assert_eq!(graph.roots(), &[key]);

        assert!(graph.remove_from_scene(key));
        assert!(!graph.remove_from_scene(key));
        assert_eq!(graph.in_scene_count(), 0);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_group_membership_follows_scene() {
        let mut graph = SceneGraph::new();
        let group = graph.create(NodeKind::Group);
        let child = graph.create(NodeKind::Rect { origin: Vec2::ZERO, size: Vec2::new(1.0, 1.0) });
        graph.add_to_group(group, child);
        graph.add_to_scene(group);
        assert!(graph.is_in_scene(child));

        // Grouped nodes cannot be added on their own
        assert!(!graph.add_to_scene(child));

        graph.remove_from_scene(group);
        assert!(!graph.is_in_scene(child));
    }

    #[test]
    fn test_map_to_scene_through_group() {
        let mut graph = SceneGraph::new();
        let group = graph.create(NodeKind::Group);
        graph.set_position(group, Vec2::new(100.0, 0.0));
        graph.set_rotation(group, FRAC_PI_2);
        let child = graph.create(NodeKind::Group);
        graph.set_position(child, Vec2::new(0.0, 10.0));
        graph.add_to_group(group, child);

        let p = graph.scene_position(child).unwrap();
        assert!(approx(p, Vec2::new(90.0, 0.0)));
        assert!((graph.scene_rotation(child).unwrap() - FRAC_PI_2).abs() < 0.0001);
    }

    #[test]
    fn test_remove_from_group_preserves_placement() {
        let mut graph = SceneGraph::new();
        let group = graph.create(NodeKind::Group);
        graph.set_position(group, Vec2::new(5.0, 5.0));
        graph.set_rotation(group, 0.5);
        let child = graph.insert(Node::new(NodeKind::Group).with_pivot(Vec2::new(1.0, 2.0)));
        graph.set_position(child, Vec2::new(3.0, -1.0));
        graph.set_rotation(child, 0.25);
        graph.add_to_group(group, child);
        graph.add_to_scene(group);

        let before = graph.map_to_scene(child, Vec2::new(4.0, 4.0)).unwrap();
        assert!(graph.remove_from_group(child));
        let after = graph.map_to_scene(child, Vec2::new(4.0, 4.0)).unwrap();
        assert!(approx(before, after));
        assert!(graph.get(child).unwrap().parent().is_none());
        assert!(graph.is_in_scene(child));
        assert!(graph.roots().contains(&child));
        assert!(graph.get(group).unwrap().children().is_empty());
    }

    #[test]
    fn test_effective_opacity_and_instances() {
        let mut graph = SceneGraph::new();
        let group = graph.create(NodeKind::Group);
        let child = graph.insert(Node::new(NodeKind::Ellipse { width: 1.0, height: 1.0 }).with_z(-1.0));
        graph.add_to_group(group, child);
        graph.add_to_scene(group);
        graph.set_opacity(group, 0.5);
        graph.set_opacity(child, 0.5);

        assert!((graph.effective_opacity(child).unwrap() - 0.25).abs() < 0.0001);
        let instances = graph.instances();
        assert_eq!(instances.len(), 2);
        // Sorted by z
        assert_eq!(instances[0].kind, 0);
        assert_eq!(instances[0].z, -1.0);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut graph = SceneGraph::new();
        let key = graph.create(NodeKind::Group);
        graph.clear_dirty();
        assert!(graph.dirty_nodes().is_empty());

        graph.set_position(key, Vec2::new(1.0, 0.0));
        graph.set_opacity(key, 0.3);
        let dirty = graph.dirty_nodes();
        assert_eq!(dirty.len(), 1);
        assert!(dirty[0].1.contains(DirtyFlags::TRANSFORM | DirtyFlags::OPACITY));

        // Unchanged values do not re-mark
        graph.clear_dirty();
        graph.set_position(key, Vec2::new(1.0, 0.0));
        assert!(graph.dirty_nodes().is_empty());
    }

    #[test]
    fn test_destroy_subtree() {
        let mut graph = SceneGraph::new();
        let group = graph.create(NodeKind::Group);
        let child = graph.create(NodeKind::Group);
        graph.add_to_group(group, child);
        graph.add_to_scene(group);
        graph.destroy(group);
        assert_eq!(graph.node_count(), 0);
        assert!(graph.roots().is_empty());
    }
}
