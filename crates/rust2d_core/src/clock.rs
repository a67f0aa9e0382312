//! Virtual simulation clock

/// Default simulation time per tick
pub const DEFAULT_TIME_STEP: f64 = 5e-3;
/// Default change of the time step on speed up / slow down
pub const DEFAULT_SPEED_DELTA: f64 = 1e-3;

/// Simulation time advanced by a fixed, adjustable step per tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Clock {
    time: f64,
    dt: f64,
    delta: f64,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_STEP, DEFAULT_SPEED_DELTA)
    }
}

impl Clock {
    pub fn new(dt: f64, delta: f64) -> Self {
        Self { time: 0.0, dt: dt.max(0.0), delta }
    }

    /// Current simulation time
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Simulation time per tick
    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn set_dt(&mut self, dt: f64) {
        self.dt = dt.max(0.0);
    }

    pub fn advance(&mut self) {
        self.time += self.dt;
    }

    pub fn speed_up(&mut self) {
        self.dt += self.delta;
        log::debug!("time step is now {:.4}", self.dt);
    }

    /// Never goes below a zero step (paused)
    pub fn slow_down(&mut self) {
        self.dt = (self.dt - self.delta).max(0.0);
        log::debug!("time step is now {:.4}", self.dt);
    }
}
