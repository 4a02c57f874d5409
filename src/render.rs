//! Pull-based rendering model.
//!
//! The controllers never draw. Each frame the loop assembles a [`RenderView`]
//! and hands it to a [`Renderer`]; what the renderer does with it (window,
//! framebuffer, log) is its own business.

use crate::layout::UiPoint;
use crate::workflow::WorkflowState;

/// Frames per half-period of the SCAN button blink.
pub const FLASH_PERIOD_FRAMES: u64 = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct RenderView {
    pub state: WorkflowState,
    pub selected_set: Option<String>,
    /// 1-based step while assembling.
    pub step: Option<usize>,
    pub pointer: Option<UiPoint>,
    pub hovered: Option<String>,
    /// Whole seconds left before the scan runs.
    pub scan_countdown: Option<u64>,
    pub flash: bool,
}

impl RenderView {
    /// Everything except the pointer position, which changes every frame.
    fn same_widgets(&self, other: &RenderView) -> bool {
        self.state == other.state
            && self.selected_set == other.selected_set
            && self.step == other.step
            && self.hovered == other.hovered
            && self.scan_countdown == other.scan_countdown
    }
}

/// Blink phase for a frame number.
pub fn flash_phase(frame_count: u64) -> bool {
    (frame_count / FLASH_PERIOD_FRAMES) % 2 == 0
}

pub trait Renderer: Send {
    fn render(&mut self, view: &RenderView);
}

/// Renderer that logs widget changes at debug level.
#[derive(Debug, Default)]
pub struct LogRenderer {
    last: Option<RenderView>,
    changes: u64,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of views that differed from the previous one.
    pub fn changes(&self) -> u64 {
        self.changes
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, view: &RenderView) {
        if self.last.as_ref().is_some_and(|last| last.same_widgets(view)) {
            return;
        }
        self.changes += 1;
        log::debug!(
            "render: state={} set={} step={:?} hover={} countdown={:?}",
            view.state,
            view.selected_set.as_deref().unwrap_or("-"),
            view.step,
            view.hovered.as_deref().unwrap_or("-"),
            view.scan_countdown
        );
        self.last = Some(view.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> RenderView {
        RenderView {
            state: WorkflowState::Start,
            selected_set: None,
            step: None,
            pointer: None,
            hovered: None,
            scan_countdown: None,
            flash: true,
        }
    }

    #[test]
    fn pointer_motion_is_not_a_change() {
        let mut renderer = LogRenderer::new();
        renderer.render(&view());
        let mut moved = view();
        moved.pointer = Some(UiPoint::new(10.0, 10.0));
        moved.flash = false;
        renderer.render(&moved);
        assert_eq!(renderer.changes(), 1);

        moved.hovered = Some("SCAN".to_string());
        renderer.render(&moved);
        assert_eq!(renderer.changes(), 2);
    }

    #[test]
    fn flash_toggles_every_ten_frames() {
        assert!(flash_phase(0));
        assert!(flash_phase(9));
        assert!(!flash_phase(10));
        assert!(flash_phase(20));
    }
}
