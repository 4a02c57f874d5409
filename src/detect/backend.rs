use anyhow::Result;

use crate::capture::Frame;
use crate::detect::result::DetectionResult;

/// Object detector invoked once per scan cycle.
///
/// Implementations receive the pre-processed frame (UI pixel space) and
/// return centroids normalized against the capture region. Finding nothing is
/// an empty result, not an error; errors are reserved for a detector that
/// could not run at all.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult>;

    /// Optional warm-up hook, run once at startup.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
