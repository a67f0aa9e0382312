//! Simulation loop
//!
//! One `tick` runs the fixed pipeline: expire transients, commit kinematic
//! conversions, update the trail, dispatch input actions, process removals,
//! advance the clock, step physics, notify render views. Game content gets a
//! callback at the end.

use std::hash::Hash;

use crate::input::{ActionMap, InputState};
use crate::world::World;

/// Game content driven by the simulation
pub trait Game {
    type Action: Copy + Eq + Hash;

    /// Input-bound action triggered this tick
    fn on_action(&mut self, action: Self::Action, world: &mut World);

    /// Called once per tick after render views
    fn on_tick(&mut self, _world: &mut World) {}
}

/// Consumer of the scene after each tick
pub trait RenderView {
    fn on_tick(&mut self, world: &World);
}

/// A world, its content, input bindings and render views
pub struct Simulation<G: Game> {
    world: World,
    game: G,
    actions: ActionMap<G::Action>,
    input: InputState,
    views: Vec<Box<dyn RenderView>>,
    ticks: u64,
}

impl<G: Game> Simulation<G> {
    pub fn new(world: World, game: G, actions: ActionMap<G::Action>) -> Self {
        Self {
            world,
            game,
            actions,
            input: InputState::new(),
            views: Vec::new(),
            ticks: 0,
        }
    }

    pub fn add_view(&mut self, view: impl RenderView + 'static) {
        self.views.push(Box::new(view));
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut G {
        &mut self.game
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn actions(&self) -> &ActionMap<G::Action> {
        &self.actions
    }

    /// Ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one pipeline pass
    pub fn tick(&mut self) {
        self.world.begin_tick();

        for action in self.actions.dispatch(&mut self.input) {
            self.game.on_action(action, &mut self.world);
        }

        self.world.finish_tick();

        for view in &mut self.views {
            view.on_tick(&self.world);
        }
        self.world.scene_mut().clear_dirty();

        self.game.on_tick(&mut self.world);
        self.ticks += 1;
    }
}
