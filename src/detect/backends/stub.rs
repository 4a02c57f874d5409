use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::capture::Frame;
use crate::detect::backend::DetectorBackend;
use crate::detect::result::{DetectionResult, PixelBox};
use crate::layout::CaptureRegion;

/// Half-size of a synthetic object box, in pixels.
const OBJECT_HALF_EXTENT: f64 = 18.0;

/// Stub backend for kiosks without a model. Scatters a fixed number of
/// synthetic objects inside the capture region on every call.
pub struct StubBackend {
    region: CaptureRegion,
    objects: usize,
    rng: StdRng,
}

impl StubBackend {
    pub fn new(region: CaptureRegion, objects: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            region,
            objects,
            rng,
        }
    }

    fn synthetic_box(&mut self) -> PixelBox {
        let cx = self
            .rng
            .gen_range(self.region.left + OBJECT_HALF_EXTENT..self.region.right - OBJECT_HALF_EXTENT);
        let cy = self
            .rng
            .gen_range(self.region.top + OBJECT_HALF_EXTENT..self.region.bottom - OBJECT_HALF_EXTENT);
        PixelBox {
            x1: cx - OBJECT_HALF_EXTENT,
            y1: cy - OBJECT_HALF_EXTENT,
            x2: cx + OBJECT_HALF_EXTENT,
            y2: cy + OBJECT_HALF_EXTENT,
            score: self.rng.gen_range(0.3..0.95),
        }
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult> {
        let fits = self.region.width() > OBJECT_HALF_EXTENT * 2.0
            && self.region.height() > OBJECT_HALF_EXTENT * 2.0;
        if !fits {
            return Ok(DetectionResult::default());
        }
        let boxes: Vec<PixelBox> = (0..self.objects).map(|_| self.synthetic_box()).collect();
        log::debug!(
            "stub detector: {} object(s) on frame #{}",
            boxes.len(),
            frame.sequence()
        );
        Ok(DetectionResult::from_boxes(&boxes, &self.region))
    }
}
