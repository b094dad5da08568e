//! Time utilities for the tick loop

use std::time::{Duration, Instant};

/// Tick rate configuration. Both sides run at this nominal rate independently.
pub const SIMULATION_TPS: u32 = 60;
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;

/// Delta time for one tick (in seconds). Not measured: the loop assumes a
/// stable frame rate.
pub fn tick_delta() -> f32 {
    1.0 / SIMULATION_TPS as f32
}

/// Wall-clock length of one tick
pub fn tick_duration() -> Duration {
    Duration::from_micros(TICK_DURATION_MICROS)
}

/// Number of whole ticks covering `secs` at the nominal rate
pub fn ticks_for_secs(secs: f32) -> u32 {
    (secs * SIMULATION_TPS as f32).round() as u32
}

/// Wall-clock time since a level started
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
