//! Integer-truncated neighborhood mean smoothing.
//!
//! Window sums come from a `u64` integral image, so each output value is the
//! exact `floor(sum / window^2)` of the brute-force window sum. No
//! floating-point rounding is involved at any frame size.

use image::GrayImage;

use crate::config::BorderPolicy;
use crate::error::PipelineError;

/// Summed-area table with a zero top row and left column.
///
/// `sums[(y + 1) * stride + (x + 1)]` holds the sum of all pixels at or
/// above-left of `(x, y)`, with `stride = w + 1`.
fn integral(frame: &GrayImage) -> Vec<u64> {
    let (w, h) = frame.dimensions();
    let w = w as usize;
    let h = h as usize;
    let raw = frame.as_raw();
    let stride = w + 1;
    let mut sums = vec![0u64; stride * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        let src_row = y * w;
        let prev_row = y * stride;
        let dst_row = (y + 1) * stride;
        for x in 0..w {
            row_sum += u64::from(raw[src_row + x]);
            sums[dst_row + x + 1] = sums[prev_row + x + 1] + row_sum;
        }
    }
    sums
}

/// Sum of the `k x k` window whose top-left corner is `(x0, y0)`.
#[inline]
fn window_sum(sums: &[u64], stride: usize, x0: usize, y0: usize, k: usize) -> u64 {
    let x1 = x0 + k;
    let y1 = y0 + k;
    sums[y1 * stride + x1] + sums[y0 * stride + x0]
        - sums[y0 * stride + x1]
        - sums[y1 * stride + x0]
}

/// Smooth `frame` with a `window x window` integer-truncated mean.
///
/// Only pixels whose full window fits inside the frame are recomputed. The
/// border ring follows `border`: [`BorderPolicy::PreserveBorder`] copies it
/// through unchanged, [`BorderPolicy::CropBorder`] drops it and shrinks the
/// output by `window / 2` on each side.
pub fn mean_filter(
    frame: &GrayImage,
    window: u32,
    border: BorderPolicy,
) -> Result<GrayImage, PipelineError> {
    if window == 0 || window % 2 == 0 {
        return Err(PipelineError::Configuration(format!(
            "smoothing window must be odd and positive, got {}",
            window
        )));
    }
    let (w, h) = frame.dimensions();
    if window > w || window > h {
        return Err(PipelineError::Dimension {
            frame: (w, h),
            window: (window, window),
        });
    }

    let k = window as usize;
    let r = k / 2;
    let divisor = (k * k) as u64;
    let sums = integral(frame);
    let stride = w as usize + 1;

    match border {
        BorderPolicy::PreserveBorder => {
            let mut out = frame.clone();
            let out_w = w as usize;
            let dst: &mut [u8] = &mut out;
            for y in r..h as usize - r {
                let row = y * out_w;
                for x in r..out_w - r {
                    let sum = window_sum(&sums, stride, x - r, y - r, k);
                    dst[row + x] = (sum / divisor) as u8;
                }
            }
            Ok(out)
        }
        BorderPolicy::CropBorder => {
            let out_w = w as usize - 2 * r;
            let out_h = h as usize - 2 * r;
            let mut out = GrayImage::new(out_w as u32, out_h as u32);
            let dst: &mut [u8] = &mut out;
            for y in 0..out_h {
                let row = y * out_w;
                for x in 0..out_w {
                    let sum = window_sum(&sums, stride, x, y, k);
                    dst[row + x] = (sum / divisor) as u8;
                }
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{frame_from_values, random_frame, uniform_frame};

    /// Brute-force window mean with integer truncation.
    fn brute_mean(frame: &GrayImage, cx: u32, cy: u32, k: u32) -> u8 {
        let r = k / 2;
        let mut sum = 0u64;
        for y in cy - r..=cy + r {
            for x in cx - r..=cx + r {
                sum += u64::from(frame.get_pixel(x, y)[0]);
            }
        }
        (sum / u64::from(k * k)) as u8
    }

    #[test]
    fn constant_frames_are_invariant() {
        let frame = uniform_frame(9, 7, 42);
        let out = mean_filter(&frame, 3, BorderPolicy::PreserveBorder).expect("smoothed");
        assert_eq!(out.dimensions(), (9, 7));
        assert!(out.pixels().all(|p| p[0] == 42));
    }

    #[test]
    fn mean_is_truncated_not_rounded() {
        // Eight ones around a zero center: floor(8 / 9) = 0.
        let frame = frame_from_values(3, 3, &[1, 1, 1, 1, 0, 1, 1, 1, 1]);
        let out = mean_filter(&frame, 3, BorderPolicy::PreserveBorder).expect("smoothed");
        assert_eq!(out.get_pixel(1, 1)[0], 0);
    }

    #[test]
    fn preserve_border_copies_the_ring() {
        let frame = frame_from_values(3, 3, &[9, 9, 9, 9, 0, 9, 9, 9, 9]);
        let out = mean_filter(&frame, 3, BorderPolicy::PreserveBorder).expect("smoothed");
        for y in 0..3 {
            for x in 0..3 {
                if (x, y) != (1, 1) {
                    assert_eq!(out.get_pixel(x, y)[0], 9);
                }
            }
        }
    }

    #[test]
    fn crop_border_shrinks_the_output() {
        let frame = random_frame(8, 6, 11);
        let out = mean_filter(&frame, 3, BorderPolicy::CropBorder).expect("smoothed");
        assert_eq!(out.dimensions(), (6, 4));
        for y in 0..4 {
            for x in 0..6 {
                assert_eq!(out.get_pixel(x, y)[0], brute_mean(&frame, x + 1, y + 1, 3));
            }
        }
    }

    #[test]
    fn integral_path_matches_brute_force() {
        let frame = random_frame(17, 13, 3);
        for &k in &[3u32, 5] {
            let out = mean_filter(&frame, k, BorderPolicy::PreserveBorder).expect("smoothed");
            let r = k / 2;
            for y in r..13 - r {
                for x in r..17 - r {
                    assert_eq!(
                        out.get_pixel(x, y)[0],
                        brute_mean(&frame, x, y, k),
                        "mismatch at ({}, {}) for window {}",
                        x,
                        y,
                        k
                    );
                }
            }
        }
    }

    #[test]
    fn even_and_zero_windows_are_rejected() {
        let frame = uniform_frame(5, 5, 1);
        for &k in &[0u32, 2, 4] {
            assert!(matches!(
                mean_filter(&frame, k, BorderPolicy::PreserveBorder),
                Err(PipelineError::Configuration(_))
            ));
        }
    }

    #[test]
    fn oversized_window_is_a_dimension_error() {
        let frame = uniform_frame(4, 4, 1);
        assert!(matches!(
            mean_filter(&frame, 5, BorderPolicy::PreserveBorder),
            Err(PipelineError::Dimension { .. })
        ));
    }
}
