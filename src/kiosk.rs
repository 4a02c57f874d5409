//! Per-frame composition of the interaction controllers.
//!
//! [`Kiosk`] owns the layout, workflow and the hover/scan/telemetry state and
//! advances all of them for one frame at a time. It does no I/O: the caller
//! supplies the timestamp, the mapped pointer and a detection closure, and
//! gets back everything that happened on that frame.

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::config::KioskConfig;
use crate::detect::DetectionResult;
use crate::hover::{HoverActivationController, HoverConfig};
use crate::layout::{ButtonRegistry, UiPoint};
use crate::render::{flash_phase, RenderView};
use crate::scan::{ScanConfig, ScanCycleController, ScanStep};
use crate::telemetry::{TelemetrySnapshot, TelemetrySnapshotBuilder};
use crate::workflow::{WorkflowFsm, WorkflowInput, WorkflowState};

/// What a single frame produced.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// Button activated by hover on this frame.
    pub activation: Option<String>,
    pub scan: Option<ScanStep>,
    /// Snapshot due for publishing.
    pub snapshot: Option<TelemetrySnapshot>,
    pub view: RenderView,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KioskTiming {
    pub hover: HoverConfig,
    pub scan: ScanConfig,
    pub telemetry_rate: Duration,
}

impl Default for KioskTiming {
    fn default() -> Self {
        Self {
            hover: HoverConfig::default(),
            scan: ScanConfig::default(),
            telemetry_rate: Duration::from_millis(100),
        }
    }
}

#[derive(Debug)]
pub struct Kiosk {
    registry: ButtonRegistry,
    fsm: WorkflowFsm,
    hover: HoverActivationController,
    scan: ScanCycleController,
    telemetry_rate: Duration,
    last_sent: Instant,
    last_detection: Option<DetectionResult>,
    frame_count: u64,
}

impl Kiosk {
    /// `start` seeds the telemetry timer, so the first snapshot goes out one
    /// period after it.
    pub fn new(
        registry: ButtonRegistry,
        fsm: WorkflowFsm,
        timing: KioskTiming,
        start: Instant,
    ) -> Self {
        Self {
            registry,
            fsm,
            hover: HoverActivationController::new(timing.hover),
            scan: ScanCycleController::new(timing.scan),
            telemetry_rate: timing.telemetry_rate,
            last_sent: start,
            last_detection: None,
            frame_count: 0,
        }
    }

    pub fn from_config(cfg: &KioskConfig, start: Instant) -> Result<Self> {
        let registry = cfg.registry()?;
        let fsm = cfg.workflow_fsm(&registry);
        let timing = KioskTiming {
            hover: cfg.hover,
            scan: cfg.scan,
            telemetry_rate: cfg.telemetry.rate,
        };
        Ok(Self::new(registry, fsm, timing, start))
    }

    /// Advance one frame.
    ///
    /// Order: scan cycle, then hover (skipped while the countdown runs), then
    /// telemetry. `detect` is only called on the frame a scan completes.
    pub fn process_frame<F>(&mut self, now: Instant, pointer: Option<UiPoint>, detect: F) -> FrameReport
    where
        F: FnOnce() -> Result<DetectionResult>,
    {
        let scan = self.scan.on_frame(now, self.fsm.current_state(), detect);

        let counting = match &scan {
            Some(ScanStep::Counting { .. }) => true,
            Some(ScanStep::Complete(result)) => {
                self.last_detection = Some(result.clone());
                self.fsm.handle(WorkflowInput::ScanComplete);
                false
            }
            None => false,
        };

        let activation = if counting {
            None
        } else {
            self.hover
                .on_frame(pointer, now, &self.registry, &mut self.fsm)
        };

        if self.fsm.current_state() == WorkflowState::Start {
            self.last_detection = None;
        }

        let snapshot = TelemetrySnapshotBuilder::maybe_build(
            now,
            self.last_sent,
            self.telemetry_rate,
            &self.fsm,
            self.last_detection.as_ref(),
        );
        if snapshot.is_some() {
            self.last_sent = now;
        }

        let view = self.view(pointer, &scan);
        self.frame_count += 1;

        FrameReport {
            activation,
            scan,
            snapshot,
            view,
        }
    }

    fn view(&self, pointer: Option<UiPoint>, scan: &Option<ScanStep>) -> RenderView {
        let state = self.fsm.current_state();
        RenderView {
            state,
            selected_set: self.fsm.current_selection().map(str::to_string),
            step: (state == WorkflowState::Assembly).then(|| self.fsm.current_step() + 1),
            pointer,
            hovered: self.hover.hovered().map(str::to_string),
            scan_countdown: match scan {
                Some(ScanStep::Counting { seconds_left }) => Some(*seconds_left),
                _ => None,
            },
            flash: flash_phase(self.frame_count),
        }
    }

    pub fn registry(&self) -> &ButtonRegistry {
        &self.registry
    }

    pub fn workflow(&self) -> &WorkflowFsm {
        &self.fsm
    }

    pub fn hover(&self) -> &HoverActivationController {
        &self.hover
    }

    pub fn scan(&self) -> &ScanCycleController {
        &self.scan
    }

    pub fn last_detection(&self) -> Option<&DetectionResult> {
        self.last_detection.as_ref()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Centroid;

    const FRAME: Duration = Duration::from_millis(100);

    fn kiosk(start: Instant) -> Kiosk {
        let registry = ButtonRegistry::default();
        let fsm = WorkflowFsm::with_sets(registry.set_names());
        Kiosk::new(registry, fsm, KioskTiming::default(), start)
    }

    fn at(kiosk: &Kiosk, name: &str) -> Option<UiPoint> {
        kiosk
            .registry()
            .get(name)
            .map(|button| UiPoint::new(button.x, button.y))
    }

    fn no_detection() -> Result<DetectionResult> {
        panic!("detector must not run")
    }

    #[test]
    fn scan_flow_reaches_choose_with_detections() {
        let t0 = Instant::now();
        let mut kiosk = kiosk(t0);
        let mut now = t0;
        let scan = at(&kiosk, "SCAN");

        for _ in 0..7 {
            kiosk.process_frame(now, scan, no_detection);
            now += FRAME;
        }
        assert_eq!(kiosk.workflow().current_state(), WorkflowState::Scan);

        // pointer stays on NEXT through the countdown; hover is suspended
        let next = at(&kiosk, "NEXT");
        let mut complete = None;
        for _ in 0..60 {
            let report = kiosk.process_frame(now, next, || {
                Ok(DetectionResult::from_centroids(vec![Centroid::new(0.5, 0.5)]))
            });
            now += FRAME;
            if let Some(ScanStep::Complete(result)) = report.scan {
                complete = Some(result);
                break;
            }
            assert_eq!(report.activation, None);
        }
        assert_eq!(complete.map(|r| r.len()), Some(1));
        assert_eq!(kiosk.workflow().current_state(), WorkflowState::Choose);
        assert_eq!(kiosk.last_detection().map(DetectionResult::len), Some(1));
        assert_eq!(kiosk.scan().cycles(), 1);
    }

    #[test]
    fn countdown_is_visible_in_the_view() {
        let t0 = Instant::now();
        let mut kiosk = kiosk(t0);
        let scan = at(&kiosk, "SCAN");
        let mut now = t0;
        let mut last = None;
        for _ in 0..8 {
            last = Some(kiosk.process_frame(now, scan, no_detection));
            now += FRAME;
        }
        let view = last.map(|r| r.view).expect("report");
        assert_eq!(view.state, WorkflowState::Scan);
        assert_eq!(view.scan_countdown, Some(5));
        assert_eq!(view.step, None);
    }

    #[test]
    fn telemetry_is_rate_limited() {
        let t0 = Instant::now();
        let mut kiosk = kiosk(t0);
        let step = Duration::from_millis(40);
        let mut sent = Vec::new();
        for i in 1..=10u32 {
            let now = t0 + step * i;
            if kiosk.process_frame(now, None, no_detection).snapshot.is_some() {
                sent.push(i);
            }
        }
        // strictly more than 100ms between snapshots at 40ms frames
        assert_eq!(sent, vec![3, 6, 9]);
    }

    #[test]
    fn returning_to_start_forgets_detections() {
        let t0 = Instant::now();
        let mut kiosk = kiosk(t0);
        kiosk.fsm.handle_input("SCAN");
        kiosk.last_detection = Some(DetectionResult::from_centroids(vec![Centroid::new(
            0.1, 0.2,
        )]));
        kiosk.fsm.handle_input("anything");
        kiosk.fsm.handle_input("SET 2");
        for _ in 0..5 {
            kiosk.fsm.handle_input("NEXT");
        }
        assert_eq!(kiosk.workflow().current_state(), WorkflowState::Finish);

        let retry = at(&kiosk, "RETRY");
        let mut now = t0;
        for _ in 0..7 {
            kiosk.process_frame(now, retry, no_detection);
            now += FRAME;
        }
        assert_eq!(kiosk.workflow().current_state(), WorkflowState::Start);
        assert!(kiosk.last_detection().is_none());
    }
}
