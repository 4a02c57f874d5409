//! Dwell-based hover activation.
//!
//! Converts the per-frame pointer stream into at most one activation per frame.
//! Two windows debounce activations:
//! - dwell: the pointer must stay on the same button longer than `dwell`
//! - cooldown: no activation within `cooldown` of the previous one
//!
//! In addition the same button cannot fire twice without the pointer leaving
//! every button (or the hand being lost) in between. A different button only
//! has to wait out the cooldown.

use std::time::{Duration, Instant};

use crate::layout::{ButtonRegistry, UiPoint};
use crate::workflow::WorkflowFsm;

pub const DEFAULT_DWELL: Duration = Duration::from_millis(500);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HoverConfig {
    pub dwell: Duration,
    pub cooldown: Duration,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            dwell: DEFAULT_DWELL,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HoverTrackingState {
    pub hovered_button: Option<String>,
    pub hover_start_time: Option<Instant>,
    pub last_activation_time: Option<Instant>,
    pub last_activated_button: Option<String>,
}

#[derive(Debug, Default)]
pub struct HoverActivationController {
    config: HoverConfig,
    state: HoverTrackingState,
}

impl HoverActivationController {
    pub fn new(config: HoverConfig) -> Self {
        Self {
            config,
            state: HoverTrackingState::default(),
        }
    }

    /// Process one frame. Returns the activated button name, after it has
    /// been delivered to `fsm`.
    pub fn on_frame(
        &mut self,
        pointer: Option<UiPoint>,
        now: Instant,
        registry: &ButtonRegistry,
        fsm: &mut WorkflowFsm,
    ) -> Option<String> {
        let Some(hit) = pointer.and_then(|point| registry.hit_test(point)) else {
            self.release();
            return None;
        };

        if self.state.hovered_button.as_deref() != Some(hit.name.as_str()) {
            log::debug!("hover: entered {}", hit.name);
            self.state.hovered_button = Some(hit.name.clone());
            self.state.hover_start_time = Some(now);
            return None;
        }

        if !self.can_activate(&hit.name, now) {
            return None;
        }

        let name = hit.name.clone();
        log::info!("hover: activated {}", name);
        fsm.handle_input(&name);
        self.state.last_activation_time = Some(now);
        self.state.last_activated_button = Some(name.clone());
        self.state.hovered_button = None;
        self.state.hover_start_time = None;
        Some(name)
    }

    fn can_activate(&self, name: &str, now: Instant) -> bool {
        let dwelled = self
            .state
            .hover_start_time
            .is_some_and(|start| now.saturating_duration_since(start) > self.config.dwell);
        let cooled = self
            .state
            .last_activation_time
            .map_or(true, |last| now.saturating_duration_since(last) > self.config.cooldown);
        let rearmed = self.state.last_activated_button.as_deref() != Some(name);
        dwelled && cooled && rearmed
    }

    /// Pointer lost or off every button: cancel the hover and re-arm.
    fn release(&mut self) {
        if let Some(name) = self.state.hovered_button.take() {
            log::debug!("hover: left {}", name);
        }
        self.state.hover_start_time = None;
        self.state.last_activated_button = None;
    }

    pub fn hovered(&self) -> Option<&str> {
        self.state.hovered_button.as_deref()
    }

    pub fn state(&self) -> &HoverTrackingState {
        &self.state
    }

    pub fn config(&self) -> HoverConfig {
        self.config
    }
}
