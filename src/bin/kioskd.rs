//! kioskd - touchless kiosk controller daemon
//!
//! This daemon:
//! 1. Loads configuration (file via --config / KIOSK_CONFIG, then env overrides)
//! 2. Opens the camera, hand tracker, detector and telemetry socket
//! 3. Runs the frame loop until Ctrl-C or the camera stops

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use touchless_kiosk::{
    detect::build_detector,
    runtime::{build_tracker, open_telemetry},
    CameraSource, ExitReason, Kiosk, KioskConfig, KioskRuntime, LogRenderer, PointerMapper,
    WallClock,
};

#[path = "../ui.rs"]
#[allow(dead_code)]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Configuration file (.toml or .json).
    #[arg(long, env = "KIOSK_CONFIG")]
    config: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(&args.ui, is_tty, !stdout_is_tty);

    let cfg = {
        let _stage = ui.stage("Load configuration");
        KioskConfig::load_from(args.config.as_deref())?
    };
    log::info!(
        "ui {}x{}, dwell={}ms cooldown={}ms countdown={}s",
        cfg.ui_width,
        cfg.ui_height,
        cfg.hover.dwell.as_millis(),
        cfg.hover.cooldown.as_millis(),
        cfg.scan.countdown.as_secs_f64()
    );

    let camera = {
        let _stage = ui.stage("Open camera");
        let mut camera = CameraSource::new(cfg.camera.clone())?;
        camera.connect()?;
        camera
    };

    let detector = {
        let _stage = ui.stage("Load detector");
        let mut detector = build_detector(&cfg.detector, cfg.layout.capture_region)?;
        detector.warm_up()?;
        detector
    };

    let tracker = {
        let _stage = ui.stage("Start hand tracker");
        build_tracker(&cfg.tracker)?
    };

    let sink = {
        let _stage = ui.stage("Open telemetry");
        open_telemetry(&cfg.telemetry)?
    };

    let kiosk = Kiosk::from_config(&cfg, std::time::Instant::now())?;
    let mut runtime = KioskRuntime::new(kiosk, camera, WallClock)
        .with_tracker(tracker)
        .with_detector(detector)
        .with_sink(sink)
        .with_renderer(Box::new(LogRenderer::new()))
        .with_mapper(PointerMapper::new(cfg.ui_width, cfg.ui_height))
        .with_pacing(cfg.camera.target_fps);

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    log::info!("kioskd running. telemetry -> {}", cfg.telemetry.addr);
    let summary = runtime.run(&stop)?;

    match &summary.exit {
        ExitReason::StopSignal => log::info!("shutdown signal received"),
        ExitReason::CaptureEnded(reason) => log::warn!("camera stopped: {}", reason),
    }
    eprintln!(
        "frames={} activations={} scans={} snapshots={} final_state={}",
        summary.frames,
        summary.activations,
        summary.scans,
        summary.snapshots,
        summary.final_state
    );
    Ok(())
}
