//! Frame and score data shared by the scorer and the focus search.

use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors raised while building a [`Frame`].
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("frame buffer holds {actual} samples, expected {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),
}

/// Raw sample storage for a grayscale frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PixelData {
    Gray8(Vec<u8>),
    Gray16(Vec<u16>),
}

impl PixelData {
    pub fn len(&self) -> usize {
        match self {
            PixelData::Gray8(data) => data.len(),
            PixelData::Gray16(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bit depth of a single sample
    pub fn bit_depth(&self) -> u8 {
        match self {
            PixelData::Gray8(_) => 8,
            PixelData::Gray16(_) => 16,
        }
    }
}

/// One captured grayscale image, row-major.
///
/// Frames are immutable once built; the constructor guarantees the
/// buffer matches the dimensions, so sample access never goes out of
/// bounds for in-frame coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: PixelData,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: PixelData) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidDimensions { width, height });
        }

        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(FrameError::BufferLength {
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from parts already known to be consistent.
    pub(crate) fn from_trusted(width: u32, height: u32, pixels: PixelData) -> Self {
        debug_assert!(width > 0 && height > 0);
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_gray8(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        Self::new(width, height, PixelData::Gray8(data))
    }

    pub fn from_gray16(width: u32, height: u32, data: Vec<u16>) -> Result<Self, FrameError> {
        Self::new(width, height, PixelData::Gray16(data))
    }

    /// Convert a decoded image to a grayscale frame.
    ///
    /// Images with 16-bit channels keep their depth; everything else is
    /// reduced to 8-bit luma.
    pub fn from_image(image: &DynamicImage) -> Result<Self, FrameError> {
        match image {
            DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_)
            | DynamicImage::ImageRgb16(_)
            | DynamicImage::ImageRgba16(_) => {
                let luma = image.to_luma16();
                let (width, height) = luma.dimensions();
                Self::from_gray16(width, height, luma.into_raw())
            }
            _ => {
                let luma = image.to_luma8();
                let (width, height) = luma.dimensions();
                Self::from_gray8(width, height, luma.into_raw())
            }
        }
    }

    /// Load an image file from disk as a grayscale frame
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FrameError> {
        let image = image::open(path)?;
        Self::from_image(&image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &PixelData {
        &self.pixels
    }

    pub fn bit_depth(&self) -> u8 {
        self.pixels.bit_depth()
    }

    /// Sample at `(x, y)`; coordinates outside the frame are clamped to
    /// the nearest edge pixel.
    pub fn sample_clamped(&self, x: i64, y: i64) -> f64 {
        let cx = x.clamp(0, self.width as i64 - 1) as usize;
        let cy = y.clamp(0, self.height as i64 - 1) as usize;
        let idx = cy * self.width as usize + cx;
        match &self.pixels {
            PixelData::Gray8(data) => data[idx] as f64,
            PixelData::Gray16(data) => data[idx] as f64,
        }
    }
}

/// Which sweep of the search produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPhase {
    Coarse,
    Fine,
}

impl SearchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchPhase::Coarse => "coarse",
            SearchPhase::Fine => "fine",
        }
    }
}

impl std::fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Focus score measured at one axis position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSample {
    pub position: f64,
    pub score: f64,
    pub phase: SearchPhase,
    pub captured_at: DateTime<Utc>,
}

impl ScoreSample {
    pub fn new(position: f64, score: f64, phase: SearchPhase) -> Self {
        Self {
            position,
            score,
            phase,
            captured_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rejects_zero_dimensions() {
        let result = Frame::from_gray8(0, 4, vec![]);
        assert!(matches!(
            result,
            Err(FrameError::InvalidDimensions { width: 0, height: 4 })
        ));
    }

    #[test]
    fn test_frame_rejects_wrong_buffer_length() {
        let result = Frame::from_gray16(4, 4, vec![0; 15]);
        assert!(matches!(
            result,
            Err(FrameError::BufferLength {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn test_sample_clamped_replicates_edges() {
        let frame = Frame::from_gray8(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(frame.sample_clamped(0, 0), 1.0);
        assert_eq!(frame.sample_clamped(-5, -5), 1.0);
        assert_eq!(frame.sample_clamped(9, 0), 2.0);
        assert_eq!(frame.sample_clamped(0, 9), 3.0);
        assert_eq!(frame.sample_clamped(9, 9), 4.0);
    }

    #[test]
    fn test_from_image_keeps_16_bit_depth() {
        let img = image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::from_pixel(
            3,
            2,
            image::Luma([4000u16]),
        );
        let frame = Frame::from_image(&DynamicImage::ImageLuma16(img)).unwrap();
        assert_eq!(frame.bit_depth(), 16);
        assert_eq!(frame.dimensions(), (3, 2));
        assert_eq!(frame.sample_clamped(1, 1), 4000.0);
    }

    #[test]
    fn test_from_image_reduces_rgb8_to_luma() {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([10, 10, 10]));
        let frame = Frame::from_image(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(frame.bit_depth(), 8);
        assert_eq!(frame.sample_clamped(0, 0), 10.0);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SearchPhase::Coarse.to_string(), "coarse");
        assert_eq!(SearchPhase::Fine.to_string(), "fine");
    }
}
