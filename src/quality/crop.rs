//! Centered crop rectangle used for scoring

use super::ScoreError;
use crate::assert_invariant;

/// Pixel rectangle inside a frame, in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Check a crop fraction lies in (0, 1]. NaN is rejected.
pub fn validate_crop_fraction(fraction: f64) -> Result<(), ScoreError> {
    if fraction > 0.0 && fraction <= 1.0 {
        Ok(())
    } else {
        Err(ScoreError::InvalidCropFraction(fraction))
    }
}

impl CropRegion {
    /// Centered region covering `fraction` of each frame dimension.
    ///
    /// Size is `floor(fraction * dim)` (at least one pixel), offset is
    /// `floor((1 - fraction) / 2 * dim)`.
    pub fn centered(
        frame_width: u32,
        frame_height: u32,
        fraction: f64,
    ) -> Result<Self, ScoreError> {
        validate_crop_fraction(fraction)?;

        let (x, width) = centered_span(frame_width, fraction);
        let (y, height) = centered_span(frame_height, fraction);

        let region = Self {
            x,
            y,
            width,
            height,
        };

        assert_invariant!(
            region.lies_within(frame_width, frame_height),
            "Crop region lies inside the frame",
            "quality::crop"
        );

        Ok(region)
    }

    pub fn lies_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x as u64 + self.width as u64 <= frame_width as u64
            && self.y as u64 + self.height as u64 <= frame_height as u64
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn centered_span(dim: u32, fraction: f64) -> (u32, u32) {
    if dim == 0 {
        return (0, 0);
    }
    let len = ((fraction * dim as f64).floor() as u32).clamp(1, dim);
    let offset = (((1.0 - fraction) / 2.0 * dim as f64).floor() as u32).min(dim - len);
    (offset, len)
}
