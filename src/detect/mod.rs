//! Object detection collaborators.
//!
//! Detection runs on demand (once per scan cycle), never every frame. The
//! backend is chosen by name from configuration.

mod backend;
mod backends;
mod result;

use anyhow::{anyhow, Result};

pub use backend::DetectorBackend;
pub use backends::{NullBackend, StubBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{Centroid, DetectionResult, PixelBox};

use crate::config::DetectorSettings;
use crate::layout::CaptureRegion;

/// Build the configured detector backend.
pub fn build_detector(
    settings: &DetectorSettings,
    region: CaptureRegion,
) -> Result<Box<dyn DetectorBackend>> {
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(StubBackend::new(
            region,
            settings.stub_objects,
            settings.seed,
        ))),
        "none" => Ok(Box::new(NullBackend)),
        "tract" => build_tract(settings, region),
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}

#[cfg(feature = "backend-tract")]
fn build_tract(
    settings: &DetectorSettings,
    region: CaptureRegion,
) -> Result<Box<dyn DetectorBackend>> {
    let model_path = settings
        .model_path
        .as_ref()
        .ok_or_else(|| anyhow!("detector.model_path is required for the tract backend"))?;
    let backend = TractBackend::new(model_path, settings.input_size, region)?
        .with_threshold(settings.confidence);
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn build_tract(
    _settings: &DetectorSettings,
    _region: CaptureRegion,
) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!("the tract detector requires the backend-tract feature"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_named_backends() -> Result<()> {
        let mut settings = DetectorSettings::default();
        assert_eq!(build_detector(&settings, CaptureRegion::default())?.name(), "stub");

        settings.backend = "none".to_string();
        assert_eq!(build_detector(&settings, CaptureRegion::default())?.name(), "none");

        settings.backend = "yolo9000".to_string();
        assert!(build_detector(&settings, CaptureRegion::default()).is_err());
        Ok(())
    }
}
