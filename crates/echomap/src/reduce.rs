//! Majority-vote block reduction.

use image::GrayImage;

use crate::error::PipelineError;

/// Collapse `block x block` tiles of a mask into single pixels.
///
/// Output dimensions are `(w / block, h / block)` by floor division; trailing
/// rows and columns that do not fill a tile are dropped, which is defined
/// behavior rather than an error. A tile turns on only when strictly more
/// than half of its pixels are on, i.e. its mean over {0, 255} values exceeds
/// 127.5. The comparison is done in integers (`2 * sum > 255 * block^2`), so
/// an exact half-on tie stays off with no floating-point wobble.
pub fn block_reduce(mask: &GrayImage, block: u32) -> Result<GrayImage, PipelineError> {
    if block == 0 {
        return Err(PipelineError::Configuration(
            "block size must be positive".into(),
        ));
    }
    let (w, h) = mask.dimensions();
    let out_w = w / block;
    let out_h = h / block;
    let b = block as usize;
    let w = w as usize;
    let src = mask.as_raw();
    let mut out = GrayImage::new(out_w, out_h);
    let dst: &mut [u8] = &mut out;
    let tile_total = 255u64 * (b * b) as u64;
    for ty in 0..out_h as usize {
        let row = ty * out_w as usize;
        for tx in 0..out_w as usize {
            let mut sum = 0u64;
            for dy in 0..b {
                let src_row = (ty * b + dy) * w + tx * b;
                for dx in 0..b {
                    sum += u64::from(src[src_row + dx]);
                }
            }
            if 2 * sum > tile_total {
                dst[row + tx] = 255;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::frame_from_values;

    #[test]
    fn dimensions_follow_floor_division() {
        let mask = GrayImage::new(10, 7);
        let out = block_reduce(&mask, 3).expect("reduced");
        assert_eq!(out.dimensions(), (3, 2));
    }

    #[test]
    fn majority_tile_turns_on() {
        // Three of four pixels on.
        let mask = frame_from_values(2, 2, &[255, 255, 255, 0]);
        let out = block_reduce(&mask, 2).expect("reduced");
        assert_eq!(out.as_raw(), &[255]);
    }

    #[test]
    fn exact_half_tie_stays_off() {
        let mask = frame_from_values(2, 2, &[255, 255, 0, 0]);
        let out = block_reduce(&mask, 2).expect("reduced");
        assert_eq!(out.as_raw(), &[0]);
    }

    #[test]
    fn trailing_pixels_are_dropped() {
        // 5x5 mask, block 2: the rightmost column and bottom row never vote.
        let mut values = [0u8; 25];
        for y in 0..5 {
            values[y * 5 + 4] = 255;
        }
        for x in 0..5 {
            values[4 * 5 + x] = 255;
        }
        let mask = frame_from_values(5, 5, &values);
        let out = block_reduce(&mask, 2).expect("reduced");
        assert_eq!(out.dimensions(), (2, 2));
        assert!(out.as_raw().iter().all(|&v| v == 0));
    }

    #[test]
    fn block_larger_than_mask_yields_empty_output() {
        let mask = GrayImage::new(3, 3);
        let out = block_reduce(&mask, 4).expect("reduced");
        assert_eq!(out.dimensions(), (0, 0));
    }

    #[test]
    fn zero_block_is_rejected() {
        let mask = GrayImage::new(4, 4);
        assert!(matches!(
            block_reduce(&mask, 0),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn block_one_is_identity() {
        let mask = frame_from_values(3, 2, &[0, 255, 0, 255, 0, 255]);
        let out = block_reduce(&mask, 1).expect("reduced");
        assert_eq!(out.as_raw(), mask.as_raw());
    }
}
