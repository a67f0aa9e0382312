//! Tick pacing
//!
//! Runs the simulation pipeline on a fixed wall-clock period. Ticks missed
//! during a stall are caught up, but never more than a configured number at
//! once, so a long pause does not freeze the loop while it replays.

use std::time::{Duration, Instant};

use rust2d_core::{Game, Simulation};

/// Paces simulation ticks against wall-clock time
pub struct TickDriver {
    period: Duration,
    max_catch_up: u32,
    last_tick: Instant,
    dropped: u64,
}

impl TickDriver {
    /// Create a driver ticking every `period_secs` seconds
    pub fn new(period_secs: f64, max_catch_up: u32) -> Self {
        Self::starting_at(period_secs, max_catch_up, Instant::now())
    }

    fn starting_at(period_secs: f64, max_catch_up: u32, start: Instant) -> Self {
        // Zero or negative periods would make every instant a backlog
        let period = Duration::from_secs_f64(period_secs.max(1e-4));
        Self {
            period,
            max_catch_up: max_catch_up.max(1),
            last_tick: start,
            dropped: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks skipped because the catch-up cap was hit
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Number of ticks due at `now`, capped at the catch-up limit
    pub fn due_at(&mut self, now: Instant) -> u32 {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let due = (elapsed.as_nanos() / self.period.as_nanos()) as u64;
        if due == 0 {
            return 0;
        }
        let run = due.min(self.max_catch_up as u64);
        if due > run {
            self.dropped += due - run;
            log::debug!("Dropping {} ticks after a stall", due - run);
            self.last_tick = now;
        } else {
            self.last_tick += self.period * run as u32;
        }
        run as u32
    }

    /// Time left until the next tick is due
    pub fn time_until_next(&self, now: Instant) -> Duration {
        (self.last_tick + self.period).saturating_duration_since(now)
    }

    /// Run every tick due now and return how many ran
    pub fn update<G: Game>(&mut self, simulation: &mut Simulation<G>) -> u32 {
        let due = self.due_at(Instant::now());
        for _ in 0..due {
            simulation.tick();
        }
        due
    }

    /// Sleep until the next tick is due
    pub fn wait(&self) {
        let remaining = self.time_until_next(Instant::now());
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_nothing_due_before_period() {
        let start = Instant::now();
        let mut driver = TickDriver::starting_at(0.01, 5, start);
        assert_eq!(driver.due_at(start + ms(5)), 0);
        assert_eq!(driver.time_until_next(start + ms(5)), ms(5));
    }

    #[test]
    fn test_one_tick_per_period() {
        let start = Instant::now();
        let mut driver = TickDriver::starting_at(0.01, 5, start);
        assert_eq!(driver.due_at(start + ms(10)), 1);
        assert_eq!(driver.due_at(start + ms(15)), 0);
        // Fractional remainder carries over
        assert_eq!(driver.due_at(start + ms(20)), 1);
    }

    #[test]
    fn test_catch_up_is_capped() {
        let start = Instant::now();
        let mut driver = TickDriver::starting_at(0.01, 5, start);
        assert_eq!(driver.due_at(start + ms(30)), 3);
        assert_eq!(driver.dropped(), 0);

        // Stall of a full second
        assert_eq!(driver.due_at(start + ms(1030)), 5);
        assert_eq!(driver.dropped(), 95);
        // Backlog is forgotten
        assert_eq!(driver.due_at(start + ms(1035)), 0);
        assert_eq!(driver.due_at(start + ms(1040)), 1);
    }

    #[test]
    fn test_degenerate_settings() {
        let start = Instant::now();
        let mut driver = TickDriver::starting_at(0.0, 0, start);
        assert!(driver.period() > Duration::ZERO);
        assert_eq!(driver.due_at(start + ms(10)), 1);
    }
}
