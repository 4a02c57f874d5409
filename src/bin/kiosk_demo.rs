//! kiosk_demo - scripted end-to-end run of the kiosk on a synthetic camera
//!
//! A recorded fingertip path presses SCAN, waits out the countdown, picks a
//! set, steps through every assembly step and presses RETRY. Telemetry is
//! kept in memory and the last snapshot is printed as JSON.

use anyhow::{anyhow, Result};
use clap::Parser;
use indicatif::ProgressBar;
use std::io::IsTerminal;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use touchless_kiosk::{
    detect::build_detector, ButtonRegistry, CameraConfig, CameraSource, Kiosk, KioskConfig,
    KioskRuntime, LogRenderer, MemorySink, PointerMapper, PointerSegment, RenderView, Renderer,
    ScriptedHandTracker, SteppedClock,
};

#[path = "../ui.rs"]
mod ui;

/// Synthetic frames are a fifth of the UI canvas; the mapper scales back up.
const FRAME_SCALE: u32 = 5;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Simulated frames per second.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Scan countdown in seconds.
    #[arg(long, default_value_t = 2.0)]
    countdown: f64,
    /// Set button to choose after scanning.
    #[arg(long, default_value = "SET 2")]
    set: String,
    /// Seed for the stub detector.
    #[arg(long)]
    seed: Option<u64>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }
    if !args.countdown.is_finite() || args.countdown < 0.0 {
        return Err(anyhow!("countdown must be a non-negative number of seconds"));
    }
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(&args.ui, is_tty, !stdout_is_tty);

    let mut cfg = KioskConfig::default();
    cfg.scan.countdown = Duration::from_secs_f64(args.countdown);
    cfg.detector.seed = args.seed;

    let registry = cfg.registry()?;
    let script = {
        let _stage = ui.stage("Record pointer script");
        DemoScript::new(&registry, &cfg, args.fps).build(&args.set, cfg.workflow.total_steps)?
    };

    cfg.camera = CameraConfig {
        device: "stub://demo".to_string(),
        width: cfg.ui_width / FRAME_SCALE,
        height: cfg.ui_height / FRAME_SCALE,
        target_fps: args.fps,
        flip: false,
        crop: None,
        frame_limit: Some(script.frames),
    };

    let sink = MemorySink::new();
    let start = Instant::now();
    let mut runtime = {
        let _stage = ui.stage("Assemble kiosk");
        let mut camera = CameraSource::new(cfg.camera.clone())?;
        camera.connect()?;
        let detector = build_detector(&cfg.detector, cfg.layout.capture_region)?;
        let kiosk = Kiosk::from_config(&cfg, start)?;
        KioskRuntime::new(kiosk, camera, SteppedClock::from_fps(start, args.fps))
            .with_tracker(Box::new(ScriptedHandTracker::new(script.segments)?))
            .with_detector(detector)
            .with_sink(Box::new(sink.clone()))
            .with_renderer(Box::new(ProgressRenderer {
                bar: ui.frames(script.frames),
                inner: LogRenderer::new(),
            }))
            .with_mapper(PointerMapper::new(cfg.ui_width, cfg.ui_height))
    };

    let summary = {
        let _stage = ui.stage("Run scripted session");
        runtime.run(&AtomicBool::new(false))?
    };

    let snapshots = sink.snapshots();
    eprintln!(
        "demo: {} frames, {} activations, {} scan(s), {} snapshots, final state {}",
        summary.frames,
        summary.activations,
        summary.scans,
        snapshots.len(),
        summary.final_state
    );
    if let Some(assembled) = snapshots.iter().rev().find(|s| s.step.is_some()) {
        println!("{}", assembled.to_json()?);
    }
    if let Some(last) = snapshots.last() {
        println!("{}", last.to_json()?);
    }
    Ok(())
}

struct ProgressRenderer {
    bar: ProgressBar,
    inner: LogRenderer,
}

impl Renderer for ProgressRenderer {
    fn render(&mut self, view: &RenderView) {
        self.bar.inc(1);
        self.bar.set_message(view.state.to_string());
        self.inner.render(view);
    }
}

impl Drop for ProgressRenderer {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

struct Script {
    segments: Vec<PointerSegment>,
    frames: u64,
}

/// Lays out pointer segments on a frame timeline.
struct DemoScript<'a> {
    registry: &'a ButtonRegistry,
    ui_width: f64,
    ui_height: f64,
    hold: u64,
    gap: u64,
    countdown: u64,
    next_frame: u64,
    segments: Vec<PointerSegment>,
}

impl<'a> DemoScript<'a> {
    fn new(registry: &'a ButtonRegistry, cfg: &KioskConfig, fps: u32) -> Self {
        let frames_for = |d: Duration| (d.as_secs_f64() * fps as f64).ceil() as u64;
        Self {
            registry,
            ui_width: cfg.ui_width as f64,
            ui_height: cfg.ui_height as f64,
            // dwell plus a couple of frames of slack
            hold: frames_for(cfg.hover.dwell) + 3,
            gap: frames_for(cfg.hover.cooldown) + 2,
            countdown: frames_for(cfg.scan.countdown) + 2,
            next_frame: 1,
            segments: Vec::new(),
        }
    }

    fn press(&mut self, name: &str, gap_after: u64) -> Result<()> {
        let button = self
            .registry
            .get(name)
            .ok_or_else(|| anyhow!("no button named {}", name))?;
        let to_frame = self.next_frame + self.hold - 1;
        self.segments.push(PointerSegment {
            from_frame: self.next_frame,
            to_frame,
            x: (button.x + 0.5) / self.ui_width,
            y: (button.y + 0.5) / self.ui_height,
        });
        self.next_frame = to_frame + 1 + gap_after;
        Ok(())
    }

    fn build(mut self, set: &str, steps: usize) -> Result<Script> {
        if !self.registry.set_names().iter().any(|name| name == set) {
            return Err(anyhow!("{} is not a set button", set));
        }
        let countdown_gap = self.countdown + self.gap;
        self.press("SCAN", countdown_gap)?;
        let gap = self.gap;
        self.press(set, gap)?;
        for _ in 0..steps {
            self.press("NEXT", gap)?;
        }
        self.press("RETRY", gap)?;
        Ok(Script {
            frames: self.next_frame,
            segments: self.segments,
        })
    }
}
