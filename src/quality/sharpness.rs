//! Image sharpness metrics
//!
//! The edge metric runs a 3x3 median filter over the crop (plus a one
//! pixel halo), correlates the result with a fixed diagonal edge kernel
//! and sums the squared responses. Reads past the frame border replicate
//! the nearest edge pixel.

use super::crop::{validate_crop_fraction, CropRegion};
use super::ScoreError;
use crate::assert_invariant;
use crate::types::Frame;
use serde::{Deserialize, Serialize};

/// Diagonal edge kernel, row-major, applied without flipping.
pub const EDGE_KERNEL: [[f64; 3]; 3] = [[2.0, 1.0, 0.0], [1.0, 0.0, -1.0], [0.0, -1.0, -2.0]];

/// Quantity maximized by the focus search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMethod {
    /// Median filter, edge kernel, sum of squares
    #[default]
    Edges,
    /// Standard deviation of the raw crop pixels
    StDev,
}

impl ScoringMethod {
    pub const ALL: [ScoringMethod; 2] = [ScoringMethod::Edges, ScoringMethod::StDev];

    /// Display label used by the property surface
    pub fn label(&self) -> &'static str {
        match self {
            ScoringMethod::Edges => "Edges",
            ScoringMethod::StDev => "StDev",
        }
    }

    /// Parse a label, case-insensitive
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// Anything that turns a frame into a focus score.
pub trait FocusScorer {
    fn score(&self, frame: &Frame) -> f64;
}

impl<F> FocusScorer for F
where
    F: Fn(&Frame) -> f64,
{
    fn score(&self, frame: &Frame) -> f64 {
        self(frame)
    }
}

/// Stock scorer: centered crop plus a [`ScoringMethod`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharpnessScorer {
    crop_fraction: f64,
    method: ScoringMethod,
}

impl SharpnessScorer {
    pub fn new(crop_fraction: f64, method: ScoringMethod) -> Result<Self, ScoreError> {
        validate_crop_fraction(crop_fraction)?;
        Ok(Self {
            crop_fraction,
            method,
        })
    }

    pub fn crop_fraction(&self) -> f64 {
        self.crop_fraction
    }

    pub fn method(&self) -> ScoringMethod {
        self.method
    }
}

impl FocusScorer for SharpnessScorer {
    fn score(&self, frame: &Frame) -> f64 {
        match CropRegion::centered(frame.width(), frame.height(), self.crop_fraction) {
            Ok(region) => score_region(frame, &region, self.method),
            Err(e) => {
                log::error!("Scorer crop rejected after construction: {}", e);
                assert_invariant!(
                    false,
                    "Scorer crop fraction stays valid after construction",
                    "quality::sharpness"
                );
                0.0
            }
        }
    }
}

/// Edge-metric score of the centered crop.
pub fn score(frame: &Frame, crop_fraction: f64) -> Result<f64, ScoreError> {
    score_with(frame, crop_fraction, ScoringMethod::Edges)
}

pub fn score_with(
    frame: &Frame,
    crop_fraction: f64,
    method: ScoringMethod,
) -> Result<f64, ScoreError> {
    let region = CropRegion::centered(frame.width(), frame.height(), crop_fraction)?;
    Ok(score_region(frame, &region, method))
}

/// Score an explicit region. The region must lie inside the frame.
pub fn score_region(frame: &Frame, region: &CropRegion, method: ScoringMethod) -> f64 {
    match method {
        ScoringMethod::Edges => edge_energy(frame, region),
        ScoringMethod::StDev => standard_deviation(frame, region),
    }
}

fn edge_energy(frame: &Frame, region: &CropRegion) -> f64 {
    // Median grid covers the crop plus a one-pixel halo on every side.
    let grid_w = region.width as usize + 2;
    let grid_h = region.height as usize + 2;
    let origin_x = region.x as i64 - 1;
    let origin_y = region.y as i64 - 1;

    let mut medians = vec![0.0f64; grid_w * grid_h];
    for gy in 0..grid_h {
        for gx in 0..grid_w {
            medians[gy * grid_w + gx] =
                median3x3(frame, origin_x + gx as i64, origin_y + gy as i64);
        }
    }

    let mut energy = 0.0;
    for cy in 1..=region.height as usize {
        for cx in 1..=region.width as usize {
            let mut response = 0.0;
            for (ky, row) in EDGE_KERNEL.iter().enumerate() {
                let gy = cy + ky - 1;
                for (kx, weight) in row.iter().enumerate() {
                    if *weight != 0.0 {
                        response += weight * medians[gy * grid_w + cx + kx - 1];
                    }
                }
            }
            energy += response * response;
        }
    }

    energy
}

fn median3x3(frame: &Frame, x: i64, y: i64) -> f64 {
    let mut window = [0.0f64; 9];
    let mut i = 0;
    for dy in -1..=1 {
        for dx in -1..=1 {
            window[i] = frame.sample_clamped(x + dx, y + dy);
            i += 1;
        }
    }
    window.sort_by(f64::total_cmp);
    window[4]
}

fn standard_deviation(frame: &Frame, region: &CropRegion) -> f64 {
    let n = region.area() as f64;
    if n == 0.0 {
        return 0.0;
    }

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in region.y..region.y + region.height {
        for x in region.x..region.x + region.width {
            let v = frame.sample_clamped(x as i64, y as i64);
            sum += v;
            sum_sq += v * v;
        }
    }

    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "INVARIANT VIOLATION")]
    fn test_invalid_crop_after_construction_is_not_a_zero_score() {
        let scorer = SharpnessScorer {
            crop_fraction: 2.0,
            method: ScoringMethod::Edges,
        };
        let frame = Frame::from_gray8(8, 8, vec![0; 64]).unwrap();
        scorer.score(&frame);
    }

    fn step_frame(width: u32, height: u32, low: u16, high: u16) -> Frame {
        let mut data = vec![low; (width * height) as usize];
        for y in 0..height {
            for x in width / 2..width {
                data[(y * width + x) as usize] = high;
            }
        }
        Frame::from_gray16(width, height, data).unwrap()
    }

    #[test]
    fn test_flat_frame_scores_zero() {
        let frame = Frame::from_gray8(32, 24, vec![77; 32 * 24]).unwrap();
        for crop in [0.1, 0.2, 0.5, 1.0] {
            assert_eq!(score(&frame, crop).unwrap(), 0.0);
            assert_eq!(score_with(&frame, crop, ScoringMethod::StDev).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_step_edge_response() {
        // Vertical edge of contrast c: two columns per row straddle it,
        // each responding with -3c.
        let frame = step_frame(20, 20, 0, 10);
        let region = CropRegion {
            x: 5,
            y: 5,
            width: 10,
            height: 10,
        };
        let energy = score_region(&frame, &region, ScoringMethod::Edges);
        assert_eq!(energy, 10.0 * (9.0 + 9.0) * 100.0);
    }

    #[test]
    fn test_median_removes_isolated_hot_pixel() {
        let mut data = vec![100u8; 16 * 16];
        data[8 * 16 + 8] = 255;
        let frame = Frame::from_gray8(16, 16, data).unwrap();
        assert_eq!(score(&frame, 1.0).unwrap(), 0.0);
    }

    #[test]
    fn test_stdev_of_two_levels() {
        let frame = step_frame(10, 10, 0, 10);
        let value = score_with(&frame, 1.0, ScoringMethod::StDev).unwrap();
        assert!((value - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_crop_fraction() {
        let frame = step_frame(8, 8, 0, 1);
        assert_eq!(score(&frame, 0.0), Err(ScoreError::InvalidCropFraction(0.0)));
        assert_eq!(score(&frame, 1.5), Err(ScoreError::InvalidCropFraction(1.5)));
        assert!(SharpnessScorer::new(0.0, ScoringMethod::Edges).is_err());
    }

    #[test]
    fn test_method_labels() {
        assert_eq!(ScoringMethod::from_label("stdev"), Some(ScoringMethod::StDev));
        assert_eq!(ScoringMethod::from_label(" Edges "), Some(ScoringMethod::Edges));
        assert_eq!(ScoringMethod::from_label("laplace"), None);
    }
}
