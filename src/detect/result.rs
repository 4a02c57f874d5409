use serde::Serialize;

use crate::layout::CaptureRegion;

/// Object centroid normalized against the capture region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
}

impl Centroid {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned detection box in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub score: f32,
}

impl PixelBox {
    /// Integer pixel centre, truncating the corners first.
    pub fn center(&self) -> (f64, f64) {
        let cx = ((self.x1.trunc() + self.x2.trunc()) / 2.0).floor();
        let cy = ((self.y1.trunc() + self.y2.trunc()) / 2.0).floor();
        (cx, cy)
    }
}

/// Result of one detection pass. An empty result means nothing was found.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    centroids: Vec<Centroid>,
}

impl DetectionResult {
    pub fn from_centroids(centroids: Vec<Centroid>) -> Self {
        Self { centroids }
    }

    /// Normalize box centres against `region`.
    pub fn from_boxes<'a, I>(boxes: I, region: &CaptureRegion) -> Self
    where
        I: IntoIterator<Item = &'a PixelBox>,
    {
        let centroids = boxes
            .into_iter()
            .map(|b| {
                let (cx, cy) = b.center();
                let (x, y) = region.normalize(cx, cy);
                Centroid::new(x, y)
            })
            .collect();
        Self { centroids }
    }

    pub fn centroids(&self) -> &[Centroid] {
        &self.centroids
    }

    pub fn pos_x(&self) -> Vec<f64> {
        self.centroids.iter().map(|c| c.x).collect()
    }

    pub fn pos_y(&self) -> Vec<f64> {
        self.centroids.iter().map(|c| c.y).collect()
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxes_normalize_against_capture_region() {
        let region = CaptureRegion::default();
        let boxes = [
            PixelBox {
                x1: 290.4,
                y1: 230.0,
                x2: 310.9,
                y2: 251.0,
                score: 0.9,
            },
            PixelBox {
                x1: 1090.0,
                y1: 790.0,
                x2: 1102.0,
                y2: 810.0,
                score: 0.4,
            },
        ];
        let result = DetectionResult::from_boxes(&boxes, &region);
        assert_eq!(result.len(), 2);
        // (290 + 310) / 2 = 300, (230 + 251) / 2 = 240.5 -> 240
        assert_eq!(result.centroids()[0], Centroid::new(0.0, 0.0));
        assert_eq!(result.centroids()[1], Centroid::new(1.0, 1.0));
        assert_eq!(result.pos_x(), vec![0.0, 1.0]);
        assert_eq!(result.pos_y(), vec![0.0, 1.0]);
    }

    #[test]
    fn empty_result_is_valid() {
        let result = DetectionResult::default();
        assert!(result.is_empty());
        assert!(result.pos_x().is_empty());
    }
}
