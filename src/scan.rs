//! Scan cycle timing.
//!
//! While the workflow sits in SCAN the controller counts down a fixed delay
//! and then runs detection exactly once. It does not hold a reference to the
//! workflow: the owner passes the current state in and, on
//! [`ScanStep::Complete`], forwards [`WorkflowInput::ScanComplete`] to the FSM.
//!
//! [`WorkflowInput::ScanComplete`]: crate::workflow::WorkflowInput::ScanComplete

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::detect::DetectionResult;
use crate::workflow::WorkflowState;

pub const DEFAULT_SCAN_COUNTDOWN: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanConfig {
    pub countdown: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            countdown: DEFAULT_SCAN_COUNTDOWN,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScanStep {
    /// Countdown still running; detection must not run this frame.
    Counting { seconds_left: u64 },
    /// Detection ran; the workflow should now be advanced.
    Complete(DetectionResult),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSessionState {
    pub countdown_deadline: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct ScanCycleController {
    config: ScanConfig,
    session: ScanSessionState,
    cycles: u64,
}

impl ScanCycleController {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            session: ScanSessionState::default(),
            cycles: 0,
        }
    }

    /// Advance the scan cycle by one frame.
    ///
    /// Returns `None` when the workflow is not scanning. `run_detection` is
    /// only called on the frame the countdown elapses; a failing detector is
    /// logged and reported as an empty result so the scan still terminates.
    pub fn on_frame<F>(
        &mut self,
        now: Instant,
        state: WorkflowState,
        run_detection: F,
    ) -> Option<ScanStep>
    where
        F: FnOnce() -> Result<DetectionResult>,
    {
        if state != WorkflowState::Scan {
            if self.session.countdown_deadline.take().is_some() {
                log::debug!("scan: countdown abandoned (state {})", state);
            }
            return None;
        }

        let deadline = *self
            .session
            .countdown_deadline
            .get_or_insert_with(|| {
                log::info!(
                    "scan: countdown started ({}s)",
                    self.config.countdown.as_secs_f64()
                );
                now + self.config.countdown
            });

        let remaining = deadline.saturating_duration_since(now);
        if !remaining.is_zero() {
            return Some(ScanStep::Counting {
                seconds_left: ceil_secs(remaining),
            });
        }

        let result = match run_detection() {
            Ok(result) => result,
            Err(err) => {
                log::warn!("scan: detection failed, continuing with no objects: {:#}", err);
                DetectionResult::default()
            }
        };
        self.session.countdown_deadline = None;
        self.cycles += 1;
        log::info!(
            "scan: cycle {} complete, {} object(s)",
            self.cycles,
            result.len()
        );
        Some(ScanStep::Complete(result))
    }

    pub fn session(&self) -> ScanSessionState {
        self.session
    }

    /// Number of completed scan cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
