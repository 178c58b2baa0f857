//! Zero-border padding.

use image::GrayImage;

use crate::error::PipelineError;

/// Surround `frame` with a zero border `margin` pixels wide.
///
/// Output dimensions are `(w + 2*margin, h + 2*margin)` and the interior is
/// an exact copy of the input, so downstream window operators see a defined
/// zero contribution where the original frame ends.
pub fn zero_pad(frame: &GrayImage, margin: u32) -> Result<GrayImage, PipelineError> {
    if margin == 0 {
        return Err(PipelineError::Configuration(
            "padding margin must be positive".into(),
        ));
    }
    let (w, h) = frame.dimensions();
    let out_w = w + 2 * margin;
    let out_h = h + 2 * margin;
    let mut out = GrayImage::new(out_w, out_h);
    let src = frame.as_raw();
    let dst: &mut [u8] = &mut out;
    for y in 0..h as usize {
        let src_start = y * w as usize;
        let dst_start = (y + margin as usize) * out_w as usize + margin as usize;
        dst[dst_start..dst_start + w as usize]
            .copy_from_slice(&src[src_start..src_start + w as usize]);
    }
    Ok(out)
}
