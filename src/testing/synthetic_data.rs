//! Synthetic frames for scorer and search tests

use crate::types::{Frame, PixelData};

/// Uniform frame; every pixel equals `value`
pub fn flat_frame(width: u32, height: u32, value: u16) -> Frame {
    build(width, height, |_, _| value as f64, value > u8::MAX as u16)
}

/// Vertical step edge at `width / 2`: `low` on the left, `high` on the right
pub fn step_edge_frame(width: u32, height: u32, low: u16, high: u16) -> Frame {
    let edge = width / 2;
    build(
        width,
        height,
        |x, _| if x < edge { low as f64 } else { high as f64 },
        low.max(high) > u8::MAX as u16,
    )
}

/// Checkerboard of `period`-pixel squares, values `low`/`high`
pub fn checkerboard_frame(width: u32, height: u32, period: u32, low: u16, high: u16) -> Frame {
    let period = period.max(1);
    build(
        width,
        height,
        |x, y| {
            if ((x / period) + (y / period)) % 2 == 0 {
                high as f64
            } else {
                low as f64
            }
        },
        low.max(high) > u8::MAX as u16,
    )
}

/// Separable Gaussian blur with edge replication.
///
/// Attenuation grows monotonically with `sigma` at every spatial
/// frequency, so sharpness falls steadily as the simulated stage moves
/// away from focus. `sigma <= 0` returns an identical frame.
pub fn gaussian_blur(frame: &Frame, sigma: f64) -> Frame {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let mut plane: Vec<f64> = (0..w * h)
        .map(|i| frame.sample_clamped((i % w) as i64, (i / w) as i64))
        .collect();

    if sigma.is_finite() && sigma > 0.0 {
        let kernel = gaussian_kernel(sigma);
        let r = (kernel.len() / 2) as i64;
        let mut tmp = vec![0.0; w * h];

        for y in 0..h {
            for x in 0..w {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = (x as i64 + k as i64 - r).clamp(0, w as i64 - 1) as usize;
                    acc += weight * plane[y * w + sx];
                }
                tmp[y * w + x] = acc;
            }
        }
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = (y as i64 + k as i64 - r).clamp(0, h as i64 - 1) as usize;
                    acc += weight * tmp[sy * w + x];
                }
                plane[y * w + x] = acc;
            }
        }
    }

    from_plane(frame.width(), frame.height(), &plane, frame.bit_depth() == 16)
}

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let r = (3.0 * sigma).ceil().max(1.0) as i64;
    let weights: Vec<f64> = (-r..=r)
        .map(|d| (-((d * d) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|v| v / total).collect()
}

fn build(width: u32, height: u32, pixel: impl Fn(u32, u32) -> f64, sixteen_bit: bool) -> Frame {
    let (width, height) = (width.max(1), height.max(1));
    let plane: Vec<f64> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| pixel(x, y))
        .collect();
    from_plane(width, height, &plane, sixteen_bit)
}

fn from_plane(width: u32, height: u32, plane: &[f64], sixteen_bit: bool) -> Frame {
    let pixels = if sixteen_bit {
        PixelData::Gray16(
            plane
                .iter()
                .map(|v| v.round().clamp(0.0, u16::MAX as f64) as u16)
                .collect(),
        )
    } else {
        PixelData::Gray8(plane.iter().map(|v| v.round().clamp(0.0, u8::MAX as f64) as u8).collect())
    };
    Frame::from_trusted(width, height, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::score;

    #[test]
    fn test_flat_frame_depth_follows_value() {
        assert_eq!(flat_frame(4, 4, 200).bit_depth(), 8);
        assert_eq!(flat_frame(4, 4, 4000).bit_depth(), 16);
    }

    #[test]
    fn test_checkerboard_alternates() {
        let frame = checkerboard_frame(8, 8, 2, 10, 200);
        assert_eq!(frame.sample_clamped(0, 0), 200.0);
        assert_eq!(frame.sample_clamped(2, 0), 10.0);
        assert_eq!(frame.sample_clamped(2, 2), 200.0);
    }

    #[test]
    fn test_blur_lowers_sharpness() {
        let sharp = checkerboard_frame(64, 64, 8, 20, 220);
        let s0 = score(&sharp, 0.5).unwrap();
        let s1 = score(&gaussian_blur(&sharp, 1.0), 0.5).unwrap();
        let s2 = score(&gaussian_blur(&sharp, 2.5), 0.5).unwrap();
        assert!(s0 > s1, "{} <= {}", s0, s1);
        assert!(s1 > s2, "{} <= {}", s1, s2);
    }

    #[test]
    fn test_zero_blur_is_identity() {
        let frame = checkerboard_frame(16, 16, 4, 0, 255);
        assert_eq!(gaussian_blur(&frame, 0.0), frame);
    }
}
