#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::capture::Frame;
use crate::detect::backend::DetectorBackend;
use crate::detect::result::{DetectionResult, PixelBox};
use crate::layout::CaptureRegion;

/// Values per output row: x1, y1, x2, y2, score, class.
const ROW_LEN: usize = 6;

/// Tract-based backend for ONNX object detectors.
///
/// Expects a square-input model exported with NMS, producing rows of
/// `(x1, y1, x2, y2, score, class)` in model input pixels. Frames are resized
/// (nearest neighbour) to the model input and boxes are scaled back to frame
/// pixels before their centres are normalized.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: u32,
    region: CaptureRegion,
    confidence_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32, region: CaptureRegion) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            region,
            confidence_threshold: 0.05,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let (width, height) = (frame.width() as usize, frame.height() as usize);
        if width == 0 || height == 0 {
            return Err(anyhow!("cannot run detection on an empty frame"));
        }
        let pixels = frame.rgb_pixels()?;
        let side = self.input_size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
            let src_x = x * width / side;
            let src_y = y * height / side;
            let idx = (src_y * width + src_x) * 3 + channel;
            pixels[idx] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    fn extract_boxes(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Vec<PixelBox>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let rows = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let values: Vec<f32> = rows.iter().copied().collect();
        if values.len() % ROW_LEN != 0 {
            return Err(anyhow!(
                "model output length {} is not a multiple of {}",
                values.len(),
                ROW_LEN
            ));
        }

        let scale_x = frame.width() as f64 / self.input_size as f64;
        let scale_y = frame.height() as f64 / self.input_size as f64;
        Ok(values
            .chunks_exact(ROW_LEN)
            .filter(|row| row[4] >= self.confidence_threshold)
            .map(|row| PixelBox {
                x1: row[0] as f64 * scale_x,
                y1: row[1] as f64 * scale_y,
                x2: row[2] as f64 * scale_x,
                y2: row[3] as f64 * scale_y,
                score: row[4],
            })
            .collect())
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let boxes = self.extract_boxes(outputs, frame)?;
        Ok(DetectionResult::from_boxes(&boxes, &self.region))
    }
}
