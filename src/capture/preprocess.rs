use anyhow::{anyhow, Result};
use serde::Deserialize;

use super::frame::rgb_len;
use super::Frame;

/// Crop rectangle in camera pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x.checked_add(self.width).is_some_and(|right| right <= width)
            && self.y.checked_add(self.height).is_some_and(|bottom| bottom <= height)
    }
}

/// Rotate by 180 degrees (flip both axes) and then crop.
pub(crate) fn prepare(frame: Frame, flip: bool, crop: Option<CropRect>) -> Result<Frame> {
    let (mut pixels, width, height, sequence) = frame.into_parts();
    let expected = rgb_len(width, height)?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "RGB frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    if flip {
        flip_both(&mut pixels);
    }

    match crop {
        Some(rect) => {
            let cropped = crop_rgb(&pixels, width, height, rect)?;
            Ok(Frame::new(cropped, rect.width, rect.height, sequence))
        }
        None => Ok(Frame::new(pixels, width, height, sequence)),
    }
}

/// Reversing pixel order is a 180 degree rotation.
fn flip_both(pixels: &mut [u8]) {
    let count = pixels.len() / 3;
    for i in 0..count / 2 {
        let j = count - 1 - i;
        for c in 0..3 {
            pixels.swap(i * 3 + c, j * 3 + c);
        }
    }
}

fn crop_rgb(pixels: &[u8], width: u32, height: u32, rect: CropRect) -> Result<Vec<u8>> {
    if !rect.fits_within(width, height) {
        return Err(anyhow!(
            "crop {:?} does not fit in {}x{} frame",
            rect,
            width,
            height
        ));
    }
    let stride = width as usize * 3;
    let row_len = rect.width as usize * 3;
    let mut out = Vec::with_capacity(rgb_len(rect.width, rect.height)?);
    for row in rect.y as usize..(rect.y + rect.height) as usize {
        let start = row * stride + rect.x as usize * 3;
        out.extend_from_slice(&pixels[start..start + row_len]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3x2 frame where each pixel's channels all equal its index.
    fn indexed_frame() -> Frame {
        let pixels = (0u8..6).flat_map(|i| [i, i, i]).collect();
        Frame::new(pixels, 3, 2, 1)
    }

    fn indices(frame: &Frame) -> Vec<u8> {
        frame.pixels().chunks(3).map(|p| p[0]).collect()
    }

    #[test]
    fn flip_rotates_180_degrees() -> Result<()> {
        let frame = prepare(indexed_frame(), true, None)?;
        assert_eq!(indices(&frame), vec![5, 4, 3, 2, 1, 0]);
        assert_eq!((frame.width(), frame.height()), (3, 2));
        Ok(())
    }

    #[test]
    fn crop_after_flip() -> Result<()> {
        let rect = CropRect {
            x: 1,
            y: 0,
            width: 2,
            height: 2,
        };
        let frame = prepare(indexed_frame(), true, Some(rect))?;
        assert_eq!(indices(&frame), vec![4, 3, 1, 0]);
        assert_eq!((frame.width(), frame.height()), (2, 2));
        assert_eq!(frame.sequence(), 1);
        Ok(())
    }

    #[test]
    fn rejects_oversized_crop_and_short_buffers() {
        let rect = CropRect {
            x: 2,
            y: 0,
            width: 2,
            height: 1,
        };
        assert!(prepare(indexed_frame(), false, Some(rect)).is_err());
        assert!(prepare(Frame::new(vec![0; 5], 3, 2, 1), false, None).is_err());
    }
}
