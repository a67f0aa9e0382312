//! Tracked-path drawing
//!
//! Leaves a trail of line nodes behind one entity.

use std::collections::VecDeque;

use rust2d_math::Vec2;

use crate::entity::EntityKey;
use crate::scene_graph::{Material, Node, NodeKey, NodeKind, SceneGraph};

/// Depth of trail segments, below regular content
const TRACE_Z: f32 = -1.0;
const TRACE_WIDTH: f32 = 1.0;

/// Trail state of the traced entity
#[derive(Debug, Default)]
pub struct Trace {
    target: Option<EntityKey>,
    last: Option<Vec2>,
    ticks: u32,
    segments: VecDeque<NodeKey>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<EntityKey> {
        self.target
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn start(&mut self, scene: &mut SceneGraph, target: EntityKey) {
        self.stop(scene);
        self.target = Some(target);
    }

    /// Stop tracing and drop the trail
    pub fn stop(&mut self, scene: &mut SceneGraph) {
        for node in self.segments.drain(..) {
            scene.destroy(node);
        }
        self.target = None;
        self.last = None;
        self.ticks = 0;
    }

    /// Count one tick; every `every` ticks extend the trail to `position`,
    /// keeping at most `max_segments`
    pub fn record(&mut self, scene: &mut SceneGraph, position: Vec2, every: u32, max_segments: usize) {
        self.ticks += 1;
        if self.ticks < every.max(1) {
            return;
        }
        self.ticks = 0;

        if let Some(last) = self.last {
            let node = scene.insert(
                Node::new(NodeKind::Line { from: last, to: position, width: TRACE_WIDTH })
                    .with_material(Material::GRAY)
                    .with_z(TRACE_Z),
            );
            scene.add_to_scene(node);
            self.segments.push_back(node);
            while self.segments.len() > max_segments {
                if let Some(old) = self.segments.pop_front() {
                    scene.destroy(old);
                }
            }
        }
        self.last = Some(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    #[test]
    fn test_trail_every_n_ticks() {
        let mut scene = SceneGraph::new();
        let mut trace = Trace::new();
        trace.start(&mut scene, EntityKey::from(KeyData::from_ffi(1)));

        for i in 0..30 {
            trace.record(&mut scene, Vec2::new(i as f32, 0.0), 10, 100);
        }
        // points at ticks 10, 20, 30 → two segments
        assert_eq!(trace.segment_count(), 2);
        assert_eq!(scene.in_scene_count(), 2);
    }

    #[test]
    fn test_segment_cap_and_stop() {
        let mut scene = SceneGraph::new();
        let mut trace = Trace::new();
        trace.start(&mut scene, EntityKey::from(KeyData::from_ffi(1)));
        for i in 0..20 {
            trace.record(&mut scene, Vec2::new(i as f32, 0.0), 1, 5);
        }
        assert_eq!(trace.segment_count(), 5);
        assert_eq!(scene.node_count(), 5);

        trace.stop(&mut scene);
        assert_eq!(trace.segment_count(), 0);
        assert_eq!(scene.node_count(), 0);
        assert!(trace.target().is_none());
    }
}
