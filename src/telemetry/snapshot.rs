use serde::Serialize;
use std::time::{Duration, Instant};

use crate::detect::DetectionResult;
use crate::workflow::{WorkflowFsm, WorkflowState};

/// Externally published view of the kiosk.
///
/// `step` is 1-based and present only while assembling; it serializes as
/// `null` otherwise so consumers can tell "not assembling" from "step 0".
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub state: WorkflowState,
    pub step: Option<usize>,
    pub selected_set: Option<String>,
    pub pos_x: Vec<f64>,
    pub pos_y: Vec<f64>,
}

impl TelemetrySnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub struct TelemetrySnapshotBuilder;

impl TelemetrySnapshotBuilder {
    /// Build a snapshot if more than `rate` has passed since `last_sent`.
    /// The caller resets `last_sent`.
    pub fn maybe_build(
        now: Instant,
        last_sent: Instant,
        rate: Duration,
        fsm: &WorkflowFsm,
        detections: Option<&DetectionResult>,
    ) -> Option<TelemetrySnapshot> {
        if now.saturating_duration_since(last_sent) > rate {
            Some(Self::build(fsm, detections))
        } else {
            None
        }
    }

    pub fn build(fsm: &WorkflowFsm, detections: Option<&DetectionResult>) -> TelemetrySnapshot {
        let state = fsm.current_state();
        TelemetrySnapshot {
            state,
            step: (state == WorkflowState::Assembly).then(|| fsm.current_step() + 1),
            selected_set: fsm.current_selection().map(str::to_string),
            pos_x: detections.map(DetectionResult::pos_x).unwrap_or_default(),
            pos_y: detections.map(DetectionResult::pos_y).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Centroid;
    use crate::workflow::WorkflowInput;
    use serde_json::json;

    fn fsm() -> WorkflowFsm {
        WorkflowFsm::with_sets(["SET 1", "SET 2"])
    }

    #[test]
    fn step_present_only_in_assembly() {
        let mut fsm = fsm();
        assert_eq!(TelemetrySnapshotBuilder::build(&fsm, None).step, None);
        fsm.handle_input("SCAN");
        assert_eq!(TelemetrySnapshotBuilder::build(&fsm, None).step, None);
        fsm.handle(WorkflowInput::ScanComplete);
        assert_eq!(TelemetrySnapshotBuilder::build(&fsm, None).step, None);

        fsm.handle_input("SET 2");
        assert_eq!(TelemetrySnapshotBuilder::build(&fsm, None).step, Some(1));
        fsm.handle_input("NEXT");
        fsm.handle_input("NEXT");
        assert_eq!(TelemetrySnapshotBuilder::build(&fsm, None).step, Some(3));

        for _ in 0..3 {
            fsm.handle_input("NEXT");
        }
        assert_eq!(fsm.current_state(), WorkflowState::Finish);
        assert_eq!(TelemetrySnapshotBuilder::build(&fsm, None).step, None);
    }

    #[test]
    fn serializes_wire_shape() {
        let mut fsm = fsm();
        fsm.handle_input("SCAN");
        fsm.handle(WorkflowInput::ScanComplete);
        fsm.handle_input("SET 1");
        let detections = DetectionResult::from_centroids(vec![
            Centroid::new(0.25, 0.5),
            Centroid::new(0.75, 1.0),
        ]);
        let snapshot = TelemetrySnapshotBuilder::build(&fsm, Some(&detections));
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "state": "assembly",
                "step": 1,
                "selected_set": "SET 1",
                "pos_x": [0.25, 0.75],
                "pos_y": [0.5, 1.0],
            })
        );

        let idle = TelemetrySnapshotBuilder::build(&WorkflowFsm::with_sets(["SET 1"]), None);
        let value: serde_json::Value = serde_json::from_str(&idle.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "state": "start",
                "step": null,
                "selected_set": null,
                "pos_x": [],
                "pos_y": [],
            })
        );
    }

    #[test]
    fn rate_limit_is_strict() {
        let fsm = fsm();
        let t0 = Instant::now();
        let rate = Duration::from_millis(100);
        assert!(TelemetrySnapshotBuilder::maybe_build(t0, t0, rate, &fsm, None).is_none());
        assert!(TelemetrySnapshotBuilder::maybe_build(t0 + rate, t0, rate, &fsm, None).is_none());
        assert!(TelemetrySnapshotBuilder::maybe_build(
            t0 + rate + Duration::from_millis(1),
            t0,
            rate,
            &fsm,
            None
        )
        .is_some());
    }
}
