use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::{CameraConfig, CropRect};
use crate::hover::HoverConfig;
use crate::layout::{
    default_control_buttons, default_set_buttons, Button, ButtonRegistry, CaptureRegion,
    DEFAULT_UI_HEIGHT, DEFAULT_UI_WIDTH,
};
use crate::scan::ScanConfig;
use crate::workflow::{PerSetSteps, WorkflowFsm, DEFAULT_TOTAL_STEPS};

const DEFAULT_TELEMETRY_ADDR: &str = "127.0.0.1:5005";
const DEFAULT_TELEMETRY_RATE_MS: u64 = 100;
const DEFAULT_DETECTOR: &str = "stub";
const DEFAULT_MODEL_INPUT: u32 = 640;
const DEFAULT_CONFIDENCE: f32 = 0.05;
const DEFAULT_STUB_OBJECTS: usize = 4;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct KioskConfigFile {
    camera: Option<CameraConfigFile>,
    ui: Option<UiConfigFile>,
    layout: Option<LayoutConfigFile>,
    hover: Option<HoverConfigFile>,
    scan: Option<ScanConfigFile>,
    workflow: Option<WorkflowConfigFile>,
    telemetry: Option<TelemetryConfigFile>,
    detector: Option<DetectorConfigFile>,
    tracker: Option<TrackerConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
    flip: Option<bool>,
    crop: Option<CropRect>,
    frame_limit: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct UiConfigFile {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct LayoutConfigFile {
    control_buttons: Option<Vec<Button>>,
    set_buttons: Option<Vec<Button>>,
    capture_region: Option<CaptureRegion>,
}

#[derive(Debug, Deserialize, Default)]
struct HoverConfigFile {
    dwell_ms: Option<u64>,
    cooldown_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ScanConfigFile {
    countdown_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct WorkflowConfigFile {
    total_steps: Option<usize>,
    steps_per_set: Option<HashMap<String, usize>>,
}

#[derive(Debug, Deserialize, Default)]
struct TelemetryConfigFile {
    enabled: Option<bool>,
    addr: Option<String>,
    rate_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence: Option<f32>,
    stub_objects: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackerConfigFile {
    script: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct KioskConfig {
    pub camera: CameraConfig,
    pub ui_width: u32,
    pub ui_height: u32,
    pub layout: LayoutSettings,
    pub hover: HoverConfig,
    pub scan: ScanConfig,
    pub workflow: WorkflowSettings,
    pub telemetry: TelemetrySettings,
    pub detector: DetectorSettings,
    pub tracker: TrackerSettings,
}

#[derive(Debug, Clone)]
pub struct LayoutSettings {
    pub control_buttons: Vec<Button>,
    pub set_buttons: Vec<Button>,
    pub capture_region: CaptureRegion,
}

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub total_steps: usize,
    pub steps_per_set: HashMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub addr: String,
    pub rate: Duration,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub input_size: u32,
    pub confidence: f32,
    pub stub_objects: usize,
    pub seed: Option<u64>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_DETECTOR.to_string(),
            model_path: None,
            input_size: DEFAULT_MODEL_INPUT,
            confidence: DEFAULT_CONFIDENCE,
            stub_objects: DEFAULT_STUB_OBJECTS,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackerSettings {
    pub script: Option<PathBuf>,
}

impl Default for KioskConfig {
    fn default() -> Self {
        // An empty file resolves to the built-in defaults.
        Self::from_file(KioskConfigFile::default())
    }
}

impl KioskConfig {
    /// Load from `KIOSK_CONFIG` (if set), apply env overrides, validate.
    pub fn load() -> Result<Self> {
        let path = std::env::var("KIOSK_CONFIG").ok().map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Like [`KioskConfig::load`] with an explicit file instead of `KIOSK_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => KioskConfigFile::default(),
        };
        if let Some(secs) = file_cfg.scan.as_ref().and_then(|scan| scan.countdown_secs) {
            countdown_from_secs(secs, "scan.countdown_secs")?;
        }
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: KioskConfigFile) -> Self {
        let camera_defaults = CameraConfig::default();
        let camera_file = file.camera.unwrap_or_default();
        let camera = CameraConfig {
            device: camera_file.device.unwrap_or(camera_defaults.device),
            width: camera_file.width.unwrap_or(camera_defaults.width),
            height: camera_file.height.unwrap_or(camera_defaults.height),
            target_fps: camera_file.target_fps.unwrap_or(camera_defaults.target_fps),
            flip: camera_file.flip.unwrap_or(camera_defaults.flip),
            crop: camera_file.crop.or(camera_defaults.crop),
            frame_limit: camera_file.frame_limit,
        };

        let ui = file.ui.unwrap_or_default();
        let layout_file = file.layout.unwrap_or_default();
        let layout = LayoutSettings {
            control_buttons: layout_file
                .control_buttons
                .unwrap_or_else(default_control_buttons),
            set_buttons: layout_file.set_buttons.unwrap_or_else(default_set_buttons),
            capture_region: layout_file.capture_region.unwrap_or_default(),
        };

        let hover_defaults = HoverConfig::default();
        let hover_file = file.hover.unwrap_or_default();
        let hover = HoverConfig {
            dwell: hover_file
                .dwell_ms
                .map(Duration::from_millis)
                .unwrap_or(hover_defaults.dwell),
            cooldown: hover_file
                .cooldown_ms
                .map(Duration::from_millis)
                .unwrap_or(hover_defaults.cooldown),
        };

        let scan = ScanConfig {
            countdown: file
                .scan
                .and_then(|scan| scan.countdown_secs)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .unwrap_or(ScanConfig::default().countdown),
        };

        let workflow_file = file.workflow.unwrap_or_default();
        let workflow = WorkflowSettings {
            total_steps: workflow_file.total_steps.unwrap_or(DEFAULT_TOTAL_STEPS),
            steps_per_set: workflow_file.steps_per_set.unwrap_or_default(),
        };

        let telemetry_file = file.telemetry.unwrap_or_default();
        let telemetry = TelemetrySettings {
            enabled: telemetry_file.enabled.unwrap_or(true),
            addr: telemetry_file
                .addr
                .unwrap_or_else(|| DEFAULT_TELEMETRY_ADDR.to_string()),
            rate: Duration::from_millis(
                telemetry_file.rate_ms.unwrap_or(DEFAULT_TELEMETRY_RATE_MS),
            ),
        };

        let detector_defaults = DetectorSettings::default();
        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector_file.backend.unwrap_or(detector_defaults.backend),
            model_path: detector_file.model_path,
            input_size: detector_file
                .input_size
                .unwrap_or(detector_defaults.input_size),
            confidence: detector_file
                .confidence
                .unwrap_or(detector_defaults.confidence),
            stub_objects: detector_file
                .stub_objects
                .unwrap_or(detector_defaults.stub_objects),
            seed: detector_file.seed,
        };

        Self {
            camera,
            ui_width: ui.width.unwrap_or(DEFAULT_UI_WIDTH),
            ui_height: ui.height.unwrap_or(DEFAULT_UI_HEIGHT),
            layout,
            hover,
            scan,
            workflow,
            telemetry,
            detector,
            tracker: TrackerSettings {
                script: file.tracker.and_then(|tracker| tracker.script),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("KIOSK_CAMERA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(addr) = std::env::var("KIOSK_TELEMETRY_ADDR") {
            if !addr.trim().is_empty() {
                self.telemetry.addr = addr;
            }
        }
        if let Ok(rate) = std::env::var("KIOSK_TELEMETRY_RATE_MS") {
            let millis: u64 = rate.parse().map_err(|_| {
                anyhow!("KIOSK_TELEMETRY_RATE_MS must be an integer number of milliseconds")
            })?;
            self.telemetry.rate = Duration::from_millis(millis);
        }
        if let Ok(countdown) = std::env::var("KIOSK_SCAN_COUNTDOWN_SECS") {
            let secs: f64 = countdown
                .parse()
                .map_err(|_| anyhow!("KIOSK_SCAN_COUNTDOWN_SECS must be a number of seconds"))?;
            self.scan.countdown = countdown_from_secs(secs, "KIOSK_SCAN_COUNTDOWN_SECS")?;
        }
        if let Ok(backend) = std::env::var("KIOSK_DETECTOR") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend.trim().to_lowercase();
            }
        }
        if let Ok(script) = std::env::var("KIOSK_POINTER_SCRIPT") {
            if !script.trim().is_empty() {
                self.tracker.script = Some(PathBuf::from(script));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        // Builds (and discards) the registry to check names and radii.
        self.registry()?;
        self.layout.capture_region.validate()?;

        if self.ui_width == 0 || self.ui_height == 0 {
            return Err(anyhow!("ui canvas must be non-empty"));
        }
        if let Some(crop) = self.camera.crop {
            if !crop.fits_within(self.camera.width, self.camera.height) {
                return Err(anyhow!(
                    "camera crop {:?} does not fit in {}x{} capture",
                    crop,
                    self.camera.width,
                    self.camera.height
                ));
            }
        }
        if self.telemetry.rate.is_zero() {
            return Err(anyhow!("telemetry rate must be greater than zero"));
        }
        if self.workflow.total_steps == 0 {
            return Err(anyhow!("workflow total_steps must be greater than zero"));
        }
        for (set, steps) in &self.workflow.steps_per_set {
            if *steps == 0 {
                return Err(anyhow!("workflow steps for {} must be greater than zero", set));
            }
            if !self.layout.set_buttons.iter().any(|b| &b.name == set) {
                log::warn!("workflow steps configured for unknown set {}", set);
            }
        }
        if !(0.0..=1.0).contains(&self.detector.confidence) {
            return Err(anyhow!("detector confidence must be within [0, 1]"));
        }
        Ok(())
    }

    pub fn registry(&self) -> Result<ButtonRegistry> {
        ButtonRegistry::new(
            self.layout.control_buttons.clone(),
            self.layout.set_buttons.clone(),
        )
    }

    /// Workflow whose known sets are the registry's set buttons.
    pub fn workflow_fsm(&self, registry: &ButtonRegistry) -> WorkflowFsm {
        WorkflowFsm::new(
            registry.set_names(),
            Box::new(PerSetSteps::new(
                self.workflow.total_steps,
                self.workflow.steps_per_set.clone(),
            )),
        )
    }
}

fn countdown_from_secs(secs: f64, source: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|e| {
        anyhow!(
            "{} must be a non-negative number of seconds ({}): {}",
            source,
            secs,
            e
        )
    })
}

fn read_config_file(path: &Path) -> Result<KioskConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
