//! Outbound telemetry.
//!
//! Snapshots are built at a fixed rate from the workflow and the latest scan
//! result, then handed to a [`TelemetrySink`]. Publishing is fire-and-forget:
//! [`publish_logged`] reports a failure and returns, it never retries.

mod snapshot;
mod udp;

use anyhow::Result;
use std::sync::{Arc, Mutex};

pub use snapshot::{TelemetrySnapshot, TelemetrySnapshotBuilder};
pub use udp::UdpPublisher;

pub trait TelemetrySink: Send {
    fn publish(&mut self, snapshot: &TelemetrySnapshot) -> Result<()>;

    fn close(&mut self) {}
}

/// Publish and swallow the error after logging it.
pub fn publish_logged(sink: &mut dyn TelemetrySink, snapshot: &TelemetrySnapshot) -> bool {
    match sink.publish(snapshot) {
        Ok(()) => true,
        Err(err) => {
            log::warn!("telemetry: publish failed: {:#}", err);
            false
        }
    }
}

/// Sink that keeps every snapshot in memory. Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    snapshots: Arc<Mutex<Vec<TelemetrySnapshot>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<TelemetrySnapshot> {
        self.snapshots
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl TelemetrySink for MemorySink {
    fn publish(&mut self, snapshot: &TelemetrySnapshot) -> Result<()> {
        self.snapshots
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink lock poisoned"))?
            .push(snapshot.clone());
        Ok(())
    }
}

/// Sink used when telemetry is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardSink;

impl TelemetrySink for DiscardSink {
    fn publish(&mut self, _snapshot: &TelemetrySnapshot) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::WorkflowState;

    struct FailingSink;

    impl TelemetrySink for FailingSink {
        fn publish(&mut self, _snapshot: &TelemetrySnapshot) -> Result<()> {
            Err(anyhow::anyhow!("network unreachable"))
        }
    }

    fn snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            state: WorkflowState::Start,
            step: None,
            selected_set: None,
            pos_x: vec![],
            pos_y: vec![],
        }
    }

    #[test]
    fn failures_are_swallowed() {
        assert!(!publish_logged(&mut FailingSink, &snapshot()));
    }

    #[test]
    fn memory_sink_clones_share_buffer() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        assert!(publish_logged(&mut writer, &snapshot()));
        assert_eq!(sink.snapshots(), vec![snapshot()]);
    }
}
