//! Static button layout and UI geometry.
//!
//! The registry is built once at startup and never mutated. Hit testing walks
//! the buttons in registry order (control buttons first, then set buttons) and
//! the first circle containing the pointer wins, so the order doubles as the
//! priority for overlapping controls.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashSet;

/// UI canvas width in pixels.
pub const DEFAULT_UI_WIDTH: u32 = 1170;
/// UI canvas height in pixels.
pub const DEFAULT_UI_HEIGHT: u32 = 884;

/// A point in UI pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UiPoint {
    pub x: f64,
    pub y: f64,
}

impl UiPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonGroup {
    Control,
    SetSelection,
}

/// A circular hit-testable control. Identity is `name`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Button {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Button {
    pub fn new(name: &str, x: f64, y: f64, radius: f64) -> Self {
        Self {
            name: name.to_string(),
            x,
            y,
            radius,
        }
    }

    /// Strict containment: a pointer exactly on the rim is outside.
    pub fn contains(&self, point: UiPoint) -> bool {
        let dx = point.x - self.x;
        let dy = point.y - self.y;
        dx * dx + dy * dy < self.radius * self.radius
    }
}

/// Fixed, ordered set of buttons in two disjoint groups.
#[derive(Clone, Debug)]
pub struct ButtonRegistry {
    buttons: Vec<(ButtonGroup, Button)>,
}

impl ButtonRegistry {
    pub fn new(control: Vec<Button>, sets: Vec<Button>) -> Result<Self> {
        if sets.is_empty() {
            return Err(anyhow!("layout must define at least one set button"));
        }
        let mut seen = HashSet::new();
        for button in control.iter().chain(sets.iter()) {
            if button.name.trim().is_empty() {
                return Err(anyhow!("button names must not be empty"));
            }
            if !button.radius.is_finite() || button.radius <= 0.0 {
                return Err(anyhow!(
                    "button {} must have a positive radius (got {})",
                    button.name,
                    button.radius
                ));
            }
            if !seen.insert(button.name.as_str()) {
                return Err(anyhow!("duplicate button name: {}", button.name));
            }
        }

        let buttons = control
            .into_iter()
            .map(|b| (ButtonGroup::Control, b))
            .chain(sets.into_iter().map(|b| (ButtonGroup::SetSelection, b)))
            .collect();
        Ok(Self { buttons })
    }

    /// First button (in registry order) whose hit circle contains `point`.
    pub fn hit_test(&self, point: UiPoint) -> Option<&Button> {
        self.buttons
            .iter()
            .map(|(_, button)| button)
            .find(|button| button.contains(point))
    }

    pub fn get(&self, name: &str) -> Option<&Button> {
        self.iter().find(|button| button.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Button> {
        self.buttons.iter().map(|(_, button)| button)
    }

    pub fn group(&self, group: ButtonGroup) -> impl Iterator<Item = &Button> {
        self.buttons
            .iter()
            .filter(move |(g, _)| *g == group)
            .map(|(_, button)| button)
    }

    /// Names of the set-selection buttons; these are the workflow's known sets.
    pub fn set_names(&self) -> Vec<String> {
        self.group(ButtonGroup::SetSelection)
            .map(|button| button.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }
}

impl Default for ButtonRegistry {
    fn default() -> Self {
        Self {
            buttons: default_control_buttons()
                .into_iter()
                .map(|b| (ButtonGroup::Control, b))
                .chain(
                    default_set_buttons()
                        .into_iter()
                        .map(|b| (ButtonGroup::SetSelection, b)),
                )
                .collect(),
        }
    }
}

pub fn default_control_buttons() -> Vec<Button> {
    vec![
        Button::new("SCAN", 403.0, 127.0, 40.0),
        Button::new("RETRY", 780.0, 134.0, 40.0),
        Button::new("BACK", 535.0, 129.0, 45.0),
        Button::new("NEXT", 644.0, 129.0, 45.0),
    ]
}

pub fn default_set_buttons() -> Vec<Button> {
    vec![
        Button::new("SET 1", 138.0, 136.0, 70.0),
        Button::new("SET 2", 133.0, 337.0, 70.0),
        Button::new("SET 3", 133.0, 558.0, 70.0),
        Button::new("SET 4", 133.0, 752.0, 70.0),
    ]
}

/// Reference rectangle (in UI/frame pixels) that detection centroids are
/// normalized against.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct CaptureRegion {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl CaptureRegion {
    pub fn validate(&self) -> Result<()> {
        if self.right <= self.left || self.bottom <= self.top {
            return Err(anyhow!(
                "capture region must have right > left and bottom > top (got {:?})",
                self
            ));
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Normalize a pixel position to region-relative coordinates. Positions
    /// outside the region map outside `[0, 1]`; they are not clamped.
    pub fn normalize(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.left) / self.width(), (y - self.top) / self.height())
    }
}

impl Default for CaptureRegion {
    fn default() -> Self {
        Self {
            left: 300.0,
            top: 240.0,
            right: 1096.0,
            bottom: 800.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_test_uses_strict_radius() {
        let button = Button::new("NEXT", 100.0, 100.0, 10.0);
        assert!(button.contains(UiPoint::new(105.0, 105.0)));
        assert!(!button.contains(UiPoint::new(110.0, 100.0)));
    }

    #[test]
    fn overlapping_buttons_resolve_in_registry_order() -> Result<()> {
        let registry = ButtonRegistry::new(
            vec![Button::new("NEXT", 100.0, 100.0, 50.0)],
            vec![Button::new("SET 1", 120.0, 100.0, 50.0)],
        )?;
        let hit = registry.hit_test(UiPoint::new(110.0, 100.0));
        assert_eq!(hit.map(|b| b.name.as_str()), Some("NEXT"));

        let hit = registry.hit_test(UiPoint::new(165.0, 100.0));
        assert_eq!(hit.map(|b| b.name.as_str()), Some("SET 1"));
        assert!(registry.hit_test(UiPoint::new(500.0, 500.0)).is_none());
        Ok(())
    }

    #[test]
    fn registry_rejects_duplicates_and_bad_radius() {
        let dup = ButtonRegistry::new(
            vec![Button::new("SET 1", 0.0, 0.0, 5.0)],
            vec![Button::new("SET 1", 50.0, 0.0, 5.0)],
        );
        assert!(dup.is_err());

        let radius = ButtonRegistry::new(vec![], vec![Button::new("SET 1", 0.0, 0.0, 0.0)]);
        assert!(radius.is_err());

        let no_sets = ButtonRegistry::new(default_control_buttons(), vec![]);
        assert!(no_sets.is_err());
    }

    #[test]
    fn default_layout_lists_four_sets() {
        let registry = ButtonRegistry::default();
        assert_eq!(registry.len(), 8);
        assert_eq!(
            registry.set_names(),
            vec!["SET 1", "SET 2", "SET 3", "SET 4"]
        );
        assert_eq!(registry.group(ButtonGroup::Control).count(), 4);
    }

    #[test]
    fn capture_region_normalizes_corners() {
        let region = CaptureRegion::default();
        assert_eq!(region.normalize(300.0, 240.0), (0.0, 0.0));
        assert_eq!(region.normalize(1096.0, 800.0), (1.0, 1.0));
        let (x, y) = region.normalize(698.0, 520.0);
        assert!((x - 0.5).abs() < 1e-9);
        assert!((y - 0.5).abs() < 1e-9);
    }
}
