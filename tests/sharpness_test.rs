//! Sharpness Scoring Testing
//!
//! Test suite for the focus metrics:
//! - Flat and offset frames
//! - Edge contrast response
//! - Crop fraction validation and frame-edge handling
//! - 8-bit and 16-bit frames

use crabfocus::invariant_ppt::{clear_invariant_log, contract_test};
use crabfocus::quality::{
    score, score_with, CropRegion, FocusScorer, ScoreError, ScoringMethod, SharpnessScorer,
};
use crabfocus::testing::{checkerboard_frame, flat_frame, gaussian_blur, step_edge_frame};
use crabfocus::types::Frame;

/// Add a constant to every pixel of a 16-bit frame
fn offset_frame(frame: &Frame, offset: u16) -> Frame {
    let (w, h) = frame.dimensions();
    let data: Vec<u16> = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .map(|(x, y)| frame.sample_clamped(x as i64, y as i64) as u16 + offset)
        .collect();
    Frame::from_gray16(w, h, data).unwrap()
}

#[test]
fn test_flat_frame_scores_zero_for_any_crop() {
    for value in [0u16, 17, 255, 4095] {
        let frame = flat_frame(40, 30, value);
        for crop in [0.05, 0.2, 0.33, 0.5, 0.9, 1.0] {
            assert_eq!(score(&frame, crop).unwrap(), 0.0, "value {} crop {}", value, crop);
        }
    }
}

#[test]
fn test_score_increases_with_step_contrast() {
    let mut previous = 0.0;
    for contrast in [1u16, 5, 20, 80, 200] {
        let frame = step_edge_frame(40, 40, 10, 10 + contrast);
        let s = score(&frame, 0.5).unwrap();
        assert!(
            s > previous,
            "contrast {} gave {} (previous {})",
            contrast,
            s,
            previous
        );
        previous = s;
    }
}

#[test]
fn test_constant_offset_leaves_score_unchanged() {
    let frame = checkerboard_frame(48, 48, 6, 100, 900);
    let blurred = gaussian_blur(&frame, 1.3);

    for base in [&frame, &blurred] {
        let shifted = offset_frame(base, 1234);
        for crop in [0.2, 0.5, 1.0] {
            assert_eq!(score(base, crop).unwrap(), score(&shifted, crop).unwrap());
        }
    }
}

#[test]
fn test_invalid_crop_fractions_rejected() {
    let frame = checkerboard_frame(16, 16, 4, 0, 255);
    assert_eq!(score(&frame, 0.0), Err(ScoreError::InvalidCropFraction(0.0)));
    assert_eq!(score(&frame, 1.5), Err(ScoreError::InvalidCropFraction(1.5)));
    assert!(score(&frame, -0.2).is_err());
    assert!(score(&frame, f64::NAN).is_err());
    assert!(SharpnessScorer::new(1.5, ScoringMethod::StDev).is_err());
}

#[test]
fn test_full_frame_crop_clamps_at_frame_edges() {
    // Content right at the border; the halo reads must replicate edges
    // rather than wrap or fail.
    let mut data = vec![0u8; 10 * 10];
    for y in 0..10 {
        data[y * 10] = 200;
    }
    let frame = Frame::from_gray8(10, 10, data).unwrap();
    let s = score(&frame, 1.0).unwrap();
    assert!(s > 0.0);
    assert!(s.is_finite());
}

#[test]
fn test_one_pixel_frame() {
    let frame = Frame::from_gray8(1, 1, vec![42]).unwrap();
    assert_eq!(score(&frame, 0.2).unwrap(), 0.0);
    assert_eq!(score_with(&frame, 1.0, ScoringMethod::StDev).unwrap(), 0.0);
}

#[test]
fn test_blur_reduces_both_metrics() {
    let sharp = checkerboard_frame(96, 96, 8, 40, 210);
    let soft = gaussian_blur(&sharp, 2.0);

    for method in ScoringMethod::ALL {
        let scorer = SharpnessScorer::new(0.5, method).unwrap();
        assert!(
            scorer.score(&sharp) > scorer.score(&soft),
            "{:?} did not prefer the sharp frame",
            method
        );
    }
}

#[test]
fn test_sixteen_bit_scales_with_contrast() {
    let low = step_edge_frame(32, 32, 1000, 1100);
    let high = step_edge_frame(32, 32, 1000, 1200);
    let s_low = score(&low, 0.5).unwrap();
    let s_high = score(&high, 0.5).unwrap();
    // Response is linear in contrast, energy quadratic.
    assert!((s_high / s_low - 4.0).abs() < 1e-9);
}

#[test]
fn test_crop_region_matches_scored_area() {
    let region = CropRegion::centered(200, 100, 0.25).unwrap();
    assert_eq!((region.width, region.height), (50, 25));
    assert_eq!((region.x, region.y), (75, 37));
    assert!(region.lies_within(200, 100));
}

#[test]
fn contract_scoring_checks_crop_invariant() {
    clear_invariant_log();
    let frame = checkerboard_frame(20, 20, 4, 0, 255);
    score(&frame, 0.3).unwrap();
    contract_test("scoring", &["Crop region lies inside the frame"]);
}
