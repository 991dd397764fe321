//! Camera video frames

use crate::error::ArError;

/// One RGBA8 frame captured from the camera stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8, `width * height * 4` bytes
    pub rgba: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, ArError> {
        let frame = Self { width, height, rgba };
        frame.check()?;
        Ok(frame)
    }

    /// Uniformly coloured frame
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width as usize) * (height as usize);
        Self {
            width,
            height,
            rgba: rgba.repeat(pixels),
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validate dimensions against the buffer
    pub fn check(&self) -> Result<(), ArError> {
        if self.width == 0 || self.height == 0 {
            return Err(ArError::Heuristic(format!(
                "empty frame ({}x{})",
                self.width, self.height
            )));
        }
        let expected = self.pixel_count() * 4;
        if self.rgba.len() != expected {
            return Err(ArError::Heuristic(format!(
                "frame buffer holds {} bytes, expected {}",
                self.rgba.len(),
                expected
            )));
        }
        Ok(())
    }

    /// Mean over the R, G and B channels of every pixel, in [0, 255]
    pub fn mean_luma(&self) -> Result<f32, ArError> {
        self.check()?;
        let sum: u64 = self
            .rgba
            .chunks_exact(4)
            .map(|px| px[0] as u64 + px[1] as u64 + px[2] as u64)
            .sum();
        Ok(sum as f32 / (self.pixel_count() * 3) as f32)
    }
}
