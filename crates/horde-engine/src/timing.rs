//! Frame timing and the fixed-timestep accumulator.
//!
//! The simulation always advances in fixed steps. Frames of arbitrary length
//! feed the accumulator, which hands back how many steps to run.

use std::time::{Duration, Instant};

/// Most fixed steps run for a single frame.
const MAX_STEPS_PER_FRAME: u32 = 10;

/// Fixed-timestep accumulator.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    /// Fixed step length in seconds
    fixed_dt: f32,
    /// Unconsumed frame time
    accumulator: f32,
    /// Longest frame accepted before clamping
    max_frame: f32,
}

impl FixedTimestep {
    /// Creates an accumulator stepping at `tick_rate` Hz.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            fixed_dt: 1.0 / tick_rate.max(1) as f32,
            accumulator: 0.0,
            max_frame: 0.25,
        }
    }

    /// Get the fixed timestep value.
    #[must_use]
    pub const fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Accumulate frame time.
    /// Returns the number of fixed steps that should be run.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        if frame_dt.is_finite() && frame_dt > 0.0 {
            self.accumulator += frame_dt.min(self.max_frame);
        }
        let mut count = 0;
        while self.accumulator >= self.fixed_dt && count < MAX_STEPS_PER_FRAME {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind after the cap: drop the backlog
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        count
    }

    /// Fraction of a step left in the accumulator, in `[0, 1)`.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.fixed_dt).clamp(0.0, 1.0)
    }

    /// Discards accumulated time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Wall-clock frame pacing for real-time runs.
#[derive(Debug)]
pub struct FramePacer {
    frame_budget: Duration,
    last_frame: Instant,
}

impl FramePacer {
    /// Paces frames to `fps` frames per second.
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            frame_budget: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
            last_frame: Instant::now(),
        }
    }

    /// Seconds since the previous call.
    pub fn delta_time(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        dt
    }

    /// Sleeps for whatever is left of the current frame budget.
    pub fn sleep_remainder(&self) {
        let elapsed = self.last_frame.elapsed();
        if elapsed < self.frame_budget {
            std::thread::sleep(self.frame_budget - elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestep_creation() {
        let timestep = FixedTimestep::new(60);
        assert!((timestep.fixed_dt() - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(FixedTimestep::new(0).fixed_dt(), 1.0);
    }

    #[test]
    fn test_fixed_steps_per_frame() {
        let mut timestep = FixedTimestep::new(50);
        assert_eq!(timestep.accumulate(0.01), 0);
        assert_eq!(timestep.accumulate(0.01), 1);
        assert_eq!(timestep.accumulate(0.05), 2);
    }

    #[test]
    fn test_remainder_carries_over() {
        let mut timestep = FixedTimestep::new(10);
        assert_eq!(timestep.accumulate(0.15), 1);
        assert!((timestep.alpha() - 0.5).abs() < 1e-4);
        assert_eq!(timestep.accumulate(0.06), 1);
    }

    #[test]
    fn test_accumulate_spiral_prevention() {
        let mut timestep = FixedTimestep::new(1000);
        let updates = timestep.accumulate(1.0);
        assert!(updates <= MAX_STEPS_PER_FRAME);
        assert!(timestep.alpha() < 1.0);
    }

    #[test]
    fn test_invalid_frame_ignored() {
        let mut timestep = FixedTimestep::new(60);
        assert_eq!(timestep.accumulate(f32::NAN), 0);
        assert_eq!(timestep.accumulate(-1.0), 0);
        assert_eq!(timestep.alpha(), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut timestep = FixedTimestep::new(10);
        timestep.accumulate(0.05);
        timestep.reset();
        assert_eq!(timestep.alpha(), 0.0);
    }

    #[test]
    fn test_frame_pacer_delta() {
        let mut pacer = FramePacer::new(60);
        std::thread::sleep(Duration::from_millis(5));
        let dt = pacer.delta_time();
        assert!(dt >= 0.004);
    }
}
