//! Camera capture and frame pre-processing.
//!
//! `CameraSource` wraps either a synthetic generator (`stub://` devices) or a
//! V4L2 device (feature `camera-v4l2`). Every frame is rotated/cropped into
//! UI pixel space before it is handed to the tracker and detector.

mod frame;
mod preprocess;
#[cfg(feature = "camera-v4l2")]
mod v4l2;

use anyhow::{anyhow, Result};

pub use frame::Frame;
pub use preprocess::CropRect;

#[cfg(feature = "camera-v4l2")]
use v4l2::DeviceCamera;

/// Configuration for a camera source.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    /// Device path (e.g. "/dev/video1") or `stub://name` for synthetic frames.
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    /// Rotate captured frames by 180 degrees.
    pub flip: bool,
    pub crop: Option<CropRect>,
    /// Synthetic sources stop after this many frames.
    pub frame_limit: Option<u64>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "stub://kiosk".to_string(),
            width: 1920,
            height: 1080,
            target_fps: 30,
            flip: true,
            crop: Some(CropRect {
                x: 302,
                y: 129,
                width: 1170,
                height: 884,
            }),
            frame_limit: None,
        }
    }
}

impl CameraConfig {
    pub fn is_synthetic(&self) -> bool {
        self.device.starts_with("stub://")
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

pub struct CameraSource {
    config: CameraConfig,
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "camera-v4l2")]
    Device(DeviceCamera),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if let Some(crop) = config.crop {
            if !crop.fits_within(config.width, config.height) {
                return Err(anyhow!(
                    "camera crop {:?} does not fit in {}x{} capture",
                    crop,
                    config.width,
                    config.height
                ));
            }
        }
        let backend = if config.is_synthetic() {
            CameraBackend::Synthetic(SyntheticCamera::new(config.clone()))
        } else {
            Self::device_backend(&config)?
        };
        Ok(Self { config, backend })
    }

    #[cfg(feature = "camera-v4l2")]
    fn device_backend(config: &CameraConfig) -> Result<CameraBackend> {
        Ok(CameraBackend::Device(DeviceCamera::new(config.clone())))
    }

    #[cfg(not(feature = "camera-v4l2"))]
    fn device_backend(config: &CameraConfig) -> Result<CameraBackend> {
        Err(anyhow!(
            "camera device {} requires the camera-v4l2 feature",
            config.device
        ))
    }

    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(source) => source.connect(),
        }
    }

    /// Capture and pre-process the next frame.
    pub fn next_frame(&mut self) -> Result<Frame> {
        let raw = match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame()?,
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(source) => source.next_frame()?,
        };
        preprocess::prepare(raw, self.config.flip, self.config.crop)
    }

    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(source) => source.is_healthy(),
        }
    }

    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(source) => source.stats(),
        }
    }

    /// Release the device. Safe to call more than once.
    pub fn close(&mut self) {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.close(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(source) => source.close(),
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and demos
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    config: CameraConfig,
    frame_count: u64,
    connected: bool,
}

impl SyntheticCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
            connected: false,
        }
    }

    /// Synthetic cameras are always available.
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!("CameraSource: connected to {} (synthetic)", self.config.device);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        if !self.connected {
            return Err(anyhow!("camera {} is not connected", self.config.device));
        }
        if let Some(limit) = self.config.frame_limit {
            if self.frame_count >= limit {
                return Err(anyhow!(
                    "synthetic stream {} ended after {} frames",
                    self.config.device,
                    limit
                ));
            }
        }
        self.frame_count += 1;
        Ok(Frame::new(
            self.generate_synthetic_pixels(),
            self.config.width,
            self.config.height,
            self.frame_count,
        ))
    }

    /// A slowly drifting gradient so consecutive frames differ.
    fn generate_synthetic_pixels(&self) -> Vec<u8> {
        let pixel_count = self.config.width as usize * self.config.height as usize * 3;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 / 3 + self.frame_count) % 256) as u8;
        }
        pixels
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }

    fn close(&mut self) {
        if self.connected {
            log::info!("CameraSource: closed {}", self.config.device);
        }
        self.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            device: "stub://test".to_string(),
            width: 64,
            height: 48,
            target_fps: 30,
            flip: true,
            crop: Some(CropRect {
                x: 8,
                y: 4,
                width: 32,
                height: 24,
            }),
            frame_limit: Some(2),
        }
    }

    #[test]
    fn synthetic_source_produces_cropped_frames() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.connect()?;

        let frame = source.next_frame()?;
        assert_eq!(frame.width(), 32);
        assert_eq!(frame.height(), 24);
        assert_eq!(frame.pixels().len(), 32 * 24 * 3);
        assert_eq!(frame.sequence(), 1);
        Ok(())
    }

    #[test]
    fn synthetic_source_ends_at_frame_limit() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.connect()?;
        source.next_frame()?;
        source.next_frame()?;
        assert!(source.next_frame().is_err());
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn closed_source_stops_producing() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.connect()?;
        source.close();
        assert!(!source.is_healthy());
        assert!(source.next_frame().is_err());
        Ok(())
    }

    #[test]
    fn rejects_crop_outside_capture() {
        let mut config = stub_config();
        config.crop = Some(CropRect {
            x: 40,
            y: 0,
            width: 32,
            height: 24,
        });
        assert!(CameraSource::new(config).is_err());
    }
}
