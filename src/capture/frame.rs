use anyhow::{anyhow, Result};

/// One captured RGB24 frame after pre-processing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    sequence: u64,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            sequence,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Capture counter, starting at 1 for the first frame of a source.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel buffer, checked to hold exactly `width * height` RGB triples.
    pub fn rgb_pixels(&self) -> Result<&[u8]> {
        let expected = rgb_len(self.width, self.height)?;
        if self.pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                self.pixels.len()
            ));
        }
        Ok(&self.pixels)
    }

    pub(crate) fn into_parts(self) -> (Vec<u8>, u32, u32, u64) {
        (self.pixels, self.width, self.height, self.sequence)
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_pixels_accepts_exact_buffer() {
        let frame = Frame::new(vec![7; 4 * 2 * 3], 4, 2, 1);
        assert_eq!(frame.rgb_pixels().map(<[u8]>::len).ok(), Some(24));
    }

    #[test]
    fn rgb_pixels_rejects_short_buffer() {
        // claims 640x480 but carries a single pixel
        let frame = Frame::new(vec![0, 0, 0], 640, 480, 1);
        let err = frame.rgb_pixels().unwrap_err();
        assert!(err.to_string().contains("length mismatch"));
    }

    #[test]
    fn rgb_pixels_rejects_padded_buffer() {
        let frame = Frame::new(vec![0; 2 * 2 * 3 + 1], 2, 2, 1);
        assert!(frame.rgb_pixels().is_err());
    }
}
