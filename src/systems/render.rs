//! Headless render view
//!
//! Stands in for a drawing backend: after each tick it reads the scene the
//! way a renderer would (instances and dirty nodes) and reports periodically
//! through the log.

use rust2d_core::{RenderView, World};

/// Snapshot of what a renderer would draw
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Nodes in the scene, including group children
    pub instances: usize,
    /// Nodes changed since the previous tick
    pub dirty: usize,
    /// Entities simulated
    pub alive: usize,
    pub time: f64,
}

/// Render view that logs scene statistics every `every` ticks
pub struct StatsView {
    every: u64,
    frames: u64,
    last: FrameStats,
}

impl StatsView {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            frames: 0,
            last: FrameStats::default(),
        }
    }

    /// Statistics of the most recent tick
    pub fn last(&self) -> FrameStats {
        self.last
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl RenderView for StatsView {
    fn on_tick(&mut self, world: &World) {
        let scene = world.scene();
        self.last = FrameStats {
            instances: scene.instances().len(),
            dirty: scene.dirty_nodes().len(),
            alive: world.alive_count(),
            time: world.clock().time(),
        };
        self.frames += 1;
        if self.frames % self.every == 0 {
            log::info!(
                "t={:.2}s: {} entities, {} instances, {} changed",
                self.last.time,
                self.last.alive,
                self.last.instances,
                self.last.dirty
            );
        }
    }
}
