//! Shared synthetic-frame builders for unit tests.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Frame filled with a single value.
pub(crate) fn uniform_frame(w: u32, h: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(w, h, Luma([value]))
}

/// Frame from row-major values; `values.len()` must be `w * h`.
pub(crate) fn frame_from_values(w: u32, h: u32, values: &[u8]) -> GrayImage {
    assert_eq!(values.len(), (w * h) as usize);
    let mut frame = GrayImage::new(w, h);
    for (i, &v) in values.iter().enumerate() {
        frame.put_pixel(i as u32 % w, i as u32 / w, Luma([v]));
    }
    frame
}

/// Uniform background with one filled rectangle of a second value.
pub(crate) fn target_frame(w: u32, h: u32, bg: u8, fg: u8, rect: Rect) -> GrayImage {
    let mut frame = uniform_frame(w, h, bg);
    draw_filled_rect_mut(&mut frame, rect, Luma([fg]));
    frame
}

/// Frame of seeded random intensities for exactness cross-checks.
pub(crate) fn random_frame(w: u32, h: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut frame = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            frame.put_pixel(x, y, Luma([rng.gen::<u8>()]));
        }
    }
    frame
}

/// Seeded random {0, 255} mask with roughly `on_percent` pixels on.
pub(crate) fn random_mask(w: u32, h: u32, on_percent: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mask = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            if rng.gen_range(0..100) < on_percent {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }
    mask
}
