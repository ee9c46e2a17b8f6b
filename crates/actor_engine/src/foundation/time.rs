//! Time management utilities

use std::time::{Duration, Instant};

/// Frame clock for the fixed-step simulation loop
///
/// Simulation time advances by a constant step every frame, independent of
/// wall-clock time. Wall time is tracked only for reporting.
pub struct FrameClock {
    started: Instant,
    fixed_step: f32,
    simulated_time: f64,
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

impl FrameClock {
    /// Create a new clock advancing `fixed_step` seconds per frame
    pub fn new(fixed_step: f32) -> Self {
        Self {
            started: Instant::now(),
            fixed_step,
            simulated_time: 0.0,
            frame_count: 0,
        }
    }

    /// Advance by one frame (should be called once per frame)
    pub fn tick(&mut self) {
        self.frame_count += 1;
        self.simulated_time += f64::from(self.fixed_step);
    }

    /// Seconds of simulated time per frame
    pub fn fixed_step(&self) -> f32 {
        self.fixed_step
    }

    /// Number of completed frames
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Total simulated time in seconds
    pub fn simulated_time(&self) -> f64 {
        self.simulated_time
    }

    /// Wall-clock time since the clock was created
    pub fn wall_time(&self) -> Duration {
        self.started.elapsed()
    }

    /// Average frames per wall-clock second
    pub fn average_fps(&self) -> f32 {
        let secs = self.wall_time().as_secs_f32();
        if secs > 0.0 {
            self.frame_count as f32 / secs
        } else {
            0.0
        }
    }
}
