//! Simulation clock.

use serde::{Deserialize, Serialize};

/// Monotonic simulation clock advanced once per tick.
///
/// Time is kept in `f64` seconds so that long runs do not lose the
/// sub-millisecond resolution cooldown comparisons depend on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    now: f64,
    tick: u64,
}

impl SimClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { now: 0.0, tick: 0 }
    }

    /// Advances the clock by `dt` seconds and returns the new time.
    ///
    /// Negative or non-finite deltas advance the tick counter but not time.
    pub fn advance(&mut self, dt: f32) -> f64 {
        if dt.is_finite() && dt > 0.0 {
            self.now += f64::from(dt);
        }
        self.tick += 1;
        self.now
    }

    /// Current simulation time in seconds.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// Number of ticks advanced so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }
}
