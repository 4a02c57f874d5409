use anyhow::Result;

use crate::capture::Frame;
use crate::detect::backend::DetectorBackend;
use crate::detect::result::DetectionResult;

/// Detector that never finds anything. Scans still complete and advance.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullBackend;

impl DetectorBackend for NullBackend {
    fn name(&self) -> &'static str {
        "none"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<DetectionResult> {
        Ok(DetectionResult::default())
    }
}
