//! Hand-tracking adapter.
//!
//! A [`HandTracker`] reports the index fingertip as a landmark normalized to
//! the frame (`0..1` on both axes), or `None` when no hand is visible. The
//! [`PointerMapper`] turns that into frame pixels and then UI pixels, which is
//! what the hover controller hit-tests against.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::capture::Frame;
use crate::layout::UiPoint;

/// Fingertip landmark normalized to the frame.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

/// Position in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramePoint {
    pub x: i64,
    pub y: i64,
}

pub trait HandTracker: Send {
    fn name(&self) -> &'static str;

    /// Locate the fingertip in `frame`.
    fn fingertip(&mut self, frame: &Frame) -> Result<Option<Landmark>>;
}

/// Tracker for kiosks without a hand model: never sees a hand.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHandTracker;

impl HandTracker for NoHandTracker {
    fn name(&self) -> &'static str {
        "none"
    }

    fn fingertip(&mut self, _frame: &Frame) -> Result<Option<Landmark>> {
        Ok(None)
    }
}

/// A fingertip held at one position over an inclusive range of frames.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct PointerSegment {
    pub from_frame: u64,
    pub to_frame: u64,
    pub x: f64,
    pub y: f64,
}

/// Replays a recorded fingertip track keyed by frame sequence number. Frames
/// not covered by any segment have no hand.
#[derive(Clone, Debug, Default)]
pub struct ScriptedHandTracker {
    segments: Vec<PointerSegment>,
}

impl ScriptedHandTracker {
    pub fn new(segments: Vec<PointerSegment>) -> Result<Self> {
        for segment in &segments {
            if segment.to_frame < segment.from_frame {
                return Err(anyhow!(
                    "pointer segment ends before it starts ({} > {})",
                    segment.from_frame,
                    segment.to_frame
                ));
            }
        }
        Ok(Self { segments })
    }

    /// Load a JSON array of segments.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read pointer script {}", path.display()))?;
        let segments: Vec<PointerSegment> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid pointer script {}", path.display()))?;
        Self::new(segments)
    }

    pub fn segments(&self) -> &[PointerSegment] {
        &self.segments
    }
}

impl HandTracker for ScriptedHandTracker {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn fingertip(&mut self, frame: &Frame) -> Result<Option<Landmark>> {
        let seq = frame.sequence();
        Ok(self
            .segments
            .iter()
            .find(|s| (s.from_frame..=s.to_frame).contains(&seq))
            .map(|s| Landmark { x: s.x, y: s.y }))
    }
}

/// Landmark -> frame pixels -> UI pixels, truncating at each step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerMapper {
    pub ui_width: u32,
    pub ui_height: u32,
}

impl PointerMapper {
    pub fn new(ui_width: u32, ui_height: u32) -> Self {
        Self {
            ui_width,
            ui_height,
        }
    }

    pub fn to_frame(&self, landmark: Landmark, frame_width: u32, frame_height: u32) -> FramePoint {
        FramePoint {
            x: (landmark.x * frame_width as f64) as i64,
            y: (landmark.y * frame_height as f64) as i64,
        }
    }

    pub fn to_ui(&self, point: FramePoint, frame_width: u32, frame_height: u32) -> Option<UiPoint> {
        if frame_width == 0 || frame_height == 0 {
            return None;
        }
        let x = point.x * self.ui_width as i64 / frame_width as i64;
        let y = point.y * self.ui_height as i64 / frame_height as i64;
        Some(UiPoint::new(x as f64, y as f64))
    }

    pub fn map(&self, landmark: Landmark, frame: &Frame) -> Option<UiPoint> {
        let point = self.to_frame(landmark, frame.width(), frame.height());
        self.to_ui(point, frame.width(), frame.height())
    }
}
