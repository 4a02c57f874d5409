//! Touchless kiosk controller
//!
//! Drives a guided-assembly kiosk from a camera: a fingertip hovering over an
//! on-screen button activates it, the workflow walks the visitor through
//! scanning the tray, picking a set and stepping through its assembly, and a
//! compact state snapshot is broadcast to a companion display.
//!
//! # Module Structure
//!
//! - `layout`: Button registry, hit testing and UI geometry
//! - `workflow`: START / SCAN / CHOOSE / ASSEMBLY / FINISH state machine
//! - `hover`: Dwell and cooldown activation
//! - `scan`: Countdown then one-shot detection while scanning
//! - `telemetry`: Rate-limited snapshots and their sinks (UDP, memory)
//! - `kiosk`: Per-frame composition of the controllers
//! - `runtime`: Camera-driven frame loop
//! - `capture`, `tracking`, `detect`: Camera, hand tracking and object detection collaborators
//! - `config`: File and environment configuration

pub mod capture;
pub mod clock;
pub mod config;
pub mod detect;
pub mod hover;
pub mod kiosk;
pub mod layout;
pub mod render;
pub mod runtime;
pub mod scan;
pub mod telemetry;
pub mod tracking;
pub mod workflow;

pub use capture::{CameraConfig, CameraSource, CropRect, Frame};
pub use clock::{Clock, SteppedClock, WallClock};
pub use config::KioskConfig;
pub use detect::{Centroid, DetectionResult, DetectorBackend};
pub use hover::{HoverActivationController, HoverConfig, HoverTrackingState};
pub use kiosk::{FrameReport, Kiosk, KioskTiming};
pub use layout::{Button, ButtonGroup, ButtonRegistry, CaptureRegion, UiPoint};
pub use render::{LogRenderer, RenderView, Renderer};
pub use runtime::{ExitReason, KioskRuntime, RunSummary};
pub use scan::{ScanConfig, ScanCycleController, ScanStep};
pub use telemetry::{
    MemorySink, TelemetrySink, TelemetrySnapshot, TelemetrySnapshotBuilder, UdpPublisher,
};
pub use tracking::{HandTracker, Landmark, PointerMapper, PointerSegment, ScriptedHandTracker};
pub use workflow::{WorkflowFsm, WorkflowInput, WorkflowState};
