//! The kiosk frame loop.
//!
//! Capture, track, advance the controllers, publish, render; one frame at a
//! time until the stop flag is raised or the camera stops producing.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::capture::CameraSource;
use crate::clock::Clock;
use crate::config::{KioskConfig, TelemetrySettings, TrackerSettings};
use crate::detect::{build_detector, DetectorBackend, NullBackend};
use crate::kiosk::Kiosk;
use crate::layout::{DEFAULT_UI_HEIGHT, DEFAULT_UI_WIDTH};
use crate::render::{LogRenderer, Renderer};
use crate::scan::ScanStep;
use crate::telemetry::{publish_logged, DiscardSink, TelemetrySink, UdpPublisher};
use crate::tracking::{HandTracker, NoHandTracker, PointerMapper, ScriptedHandTracker};
use crate::workflow::WorkflowState;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitReason {
    StopSignal,
    /// The camera returned an error; the message is kept for the summary.
    CaptureEnded(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub activations: u64,
    pub scans: u64,
    pub snapshots: u64,
    pub publish_failures: u64,
    pub final_state: WorkflowState,
    pub exit: ExitReason,
}

pub struct KioskRuntime<C: Clock> {
    kiosk: Kiosk,
    camera: CameraSource,
    clock: C,
    tracker: Box<dyn HandTracker>,
    detector: Box<dyn DetectorBackend>,
    sink: Box<dyn TelemetrySink>,
    renderer: Box<dyn Renderer>,
    mapper: PointerMapper,
    frame_interval: Option<Duration>,
    closed: bool,
}

impl<C: Clock> KioskRuntime<C> {
    /// Runtime with no hand tracking, no detector, telemetry discarded and
    /// views logged. Swap the collaborators in with the `with_*` methods.
    pub fn new(kiosk: Kiosk, camera: CameraSource, clock: C) -> Self {
        Self {
            kiosk,
            camera,
            clock,
            tracker: Box::new(NoHandTracker),
            detector: Box::new(NullBackend),
            sink: Box::new(DiscardSink),
            renderer: Box::new(LogRenderer::new()),
            mapper: PointerMapper::new(DEFAULT_UI_WIDTH, DEFAULT_UI_HEIGHT),
            frame_interval: None,
            closed: false,
        }
    }

    /// Wire every collaborator from configuration and connect the camera.
    pub fn from_config(cfg: &KioskConfig, mut clock: C) -> Result<Self> {
        let mut camera = CameraSource::new(cfg.camera.clone())?;
        camera.connect()?;

        let mut detector = build_detector(&cfg.detector, cfg.layout.capture_region)?;
        detector.warm_up()?;

        let kiosk = Kiosk::from_config(cfg, clock.now())?;
        Ok(Self::new(kiosk, camera, clock)
            .with_tracker(build_tracker(&cfg.tracker)?)
            .with_detector(detector)
            .with_sink(open_telemetry(&cfg.telemetry)?)
            .with_mapper(PointerMapper::new(cfg.ui_width, cfg.ui_height)))
    }

    pub fn with_tracker(mut self, tracker: Box<dyn HandTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_detector(mut self, detector: Box<dyn DetectorBackend>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_mapper(mut self, mapper: PointerMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Sleep so frames are at least `1 / fps` apart. Without it the loop runs
    /// as fast as the camera delivers.
    pub fn with_pacing(mut self, fps: u32) -> Self {
        self.frame_interval = (fps > 0).then(|| Duration::from_secs(1) / fps);
        self
    }

    /// Run until `stop` is set or capture fails. Resources are released on
    /// both paths.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<RunSummary> {
        log::info!(
            "kiosk running: tracker={} detector={} device={}",
            self.tracker.name(),
            self.detector.name(),
            self.camera.config().device
        );

        let mut frames = 0u64;
        let mut activations = 0u64;
        let mut scans = 0u64;
        let mut snapshots = 0u64;
        let mut publish_failures = 0u64;
        let mut last_health_log: Option<Instant> = None;

        let exit = loop {
            if stop.load(Ordering::SeqCst) {
                log::info!("stop requested, leaving frame loop");
                break ExitReason::StopSignal;
            }
            let loop_start = Instant::now();

            let frame = match self.camera.next_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("capture ended: {:#}", err);
                    break ExitReason::CaptureEnded(err.to_string());
                }
            };
            let now = self.clock.now();
            frames += 1;

            let pointer = match self.tracker.fingertip(&frame) {
                Ok(landmark) => landmark.and_then(|landmark| self.mapper.map(landmark, &frame)),
                Err(err) => {
                    log::warn!("hand tracker failed on frame {}: {:#}", frame.sequence(), err);
                    None
                }
            };

            let detector = &mut self.detector;
            let report = self
                .kiosk
                .process_frame(now, pointer, || detector.detect(&frame));

            if report.activation.is_some() {
                activations += 1;
            }
            if matches!(report.scan, Some(ScanStep::Complete(_))) {
                scans += 1;
            }
            if let Some(snapshot) = &report.snapshot {
                snapshots += 1;
                if !publish_logged(self.sink.as_mut(), snapshot) {
                    publish_failures += 1;
                }
            }
            self.renderer.render(&report.view);

            if last_health_log.map_or(true, |last| {
                now.saturating_duration_since(last) >= HEALTH_LOG_INTERVAL
            }) {
                let stats = self.camera.stats();
                log::info!(
                    "camera health={} frames={} device={} state={}",
                    self.camera.is_healthy(),
                    stats.frames_captured,
                    stats.device,
                    self.kiosk.workflow().current_state()
                );
                last_health_log = Some(now);
            }

            if let Some(interval) = self.frame_interval {
                let spent = loop_start.elapsed();
                if spent < interval {
                    std::thread::sleep(interval - spent);
                }
            }
        };

        self.close();
        let summary = RunSummary {
            frames,
            activations,
            scans,
            snapshots,
            publish_failures,
            final_state: self.kiosk.workflow().current_state(),
            exit,
        };
        log::info!(
            "kiosk stopped after {} frames ({} activations, {} scans)",
            summary.frames,
            summary.activations,
            summary.scans
        );
        Ok(summary)
    }

    /// Release the camera and the telemetry sink. Safe to call twice.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.camera.close();
        self.sink.close();
        self.closed = true;
    }

    pub fn kiosk(&self) -> &Kiosk {
        &self.kiosk
    }
}

impl<C: Clock> Drop for KioskRuntime<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Scripted tracker when a script is configured, otherwise no tracking.
pub fn build_tracker(settings: &TrackerSettings) -> Result<Box<dyn HandTracker>> {
    match &settings.script {
        Some(path) => {
            let tracker = ScriptedHandTracker::from_path(path)?;
            log::info!(
                "pointer script {} loaded ({} segments)",
                path.display(),
                tracker.segments().len()
            );
            Ok(Box::new(tracker))
        }
        None => Ok(Box::new(NoHandTracker)),
    }
}

/// UDP publisher when telemetry is enabled, otherwise a discarding sink.
pub fn open_telemetry(settings: &TelemetrySettings) -> Result<Box<dyn TelemetrySink>> {
    if !settings.enabled {
        log::info!("telemetry disabled");
        return Ok(Box::new(DiscardSink));
    }
    let mut publisher = UdpPublisher::new(&settings.addr)?;
    publisher.connect()?;
    Ok(Box::new(publisher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CameraConfig;
    use crate::clock::SteppedClock;
    use crate::layout::ButtonRegistry;
    use crate::telemetry::MemorySink;
    use crate::workflow::WorkflowFsm;

    fn small_camera(frames: u64) -> Result<CameraSource> {
        let mut camera = CameraSource::new(CameraConfig {
            device: "stub://runtime-test".to_string(),
            width: 117,
            height: 88,
            target_fps: 10,
            flip: false,
            crop: None,
            frame_limit: Some(frames),
        })?;
        camera.connect()?;
        Ok(camera)
    }

    #[test]
    fn capture_end_stops_the_loop_and_closes() -> Result<()> {
        let start = Instant::now();
        let registry = ButtonRegistry::default();
        let fsm = WorkflowFsm::with_sets(registry.set_names());
        let kiosk = Kiosk::new(registry, fsm, Default::default(), start);
        let sink = MemorySink::new();
        let mut runtime = KioskRuntime::new(
            kiosk,
            small_camera(25)?,
            SteppedClock::new(start + Duration::from_millis(100), Duration::from_millis(100)),
        )
        .with_sink(Box::new(sink.clone()));

        let summary = runtime.run(&AtomicBool::new(false))?;
        assert_eq!(summary.frames, 25);
        assert!(matches!(summary.exit, ExitReason::CaptureEnded(_)));
        assert_eq!(summary.final_state, WorkflowState::Start);
        assert_eq!(summary.activations, 0);
        // frames at 0.1s steps, strictly more than 0.1s apart: every other frame
        assert_eq!(sink.snapshots().len() as u64, summary.snapshots);
        assert_eq!(summary.snapshots, 12);
        runtime.close();
        Ok(())
    }

    #[test]
    fn stop_flag_exits_before_capturing() -> Result<()> {
        let start = Instant::now();
        let registry = ButtonRegistry::default();
        let fsm = WorkflowFsm::with_sets(registry.set_names());
        let kiosk = Kiosk::new(registry, fsm, Default::default(), start);
        let mut runtime = KioskRuntime::new(kiosk, small_camera(5)?, SteppedClock::new(start, Duration::from_millis(50)));
        let summary = runtime.run(&AtomicBool::new(true))?;
        assert_eq!(summary.exit, ExitReason::StopSignal);
        assert_eq!(summary.frames, 0);
        Ok(())
    }

    #[test]
    fn disabled_telemetry_discards() -> Result<()> {
        let settings = TelemetrySettings {
            enabled: false,
            addr: "not an address".to_string(),
            rate: Duration::from_millis(100),
        };
        assert!(open_telemetry(&settings).is_ok());
        Ok(())
    }
}
