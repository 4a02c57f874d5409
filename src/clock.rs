//! Frame timestamps.
//!
//! The controllers only ever see the `Instant` they are handed, so the frame
//! loop can run on wall time or on a fixed per-frame step for replays.

use std::time::{Duration, Instant};

pub trait Clock {
    /// Timestamp for the frame about to be processed.
    fn now(&mut self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&mut self) -> Instant {
        Instant::now()
    }
}

/// Returns `start`, then advances by `step` on every call.
#[derive(Clone, Copy, Debug)]
pub struct SteppedClock {
    next: Instant,
    step: Duration,
}

impl SteppedClock {
    pub fn new(start: Instant, step: Duration) -> Self {
        Self { next: start, step }
    }

    /// Step matching a frame rate; zero fps is treated as one frame per second.
    pub fn from_fps(start: Instant, fps: u32) -> Self {
        Self::new(start, Duration::from_secs(1) / fps.max(1))
    }

    pub fn step(&self) -> Duration {
        self.step
    }
}

impl Clock for SteppedClock {
    fn now(&mut self) -> Instant {
        let now = self.next;
        self.next += self.step;
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepped_clock_advances_per_call() {
        let start = Instant::now();
        let mut clock = SteppedClock::from_fps(start, 20);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + Duration::from_millis(50));
        assert_eq!(clock.now(), start + Duration::from_millis(100));
    }
}
