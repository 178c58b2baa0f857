//! Adaptive binarization.

use image::GrayImage;
use rayon::prelude::*;

use crate::config::ThresholdScope;
use crate::error::PipelineError;
use crate::frame::FrameBatch;
use crate::stats::{intensity_stats, StatsAccumulator};

/// Threshold one frame into a {0, 255} mask: on iff `value >= threshold`.
pub fn binarize(frame: &GrayImage, threshold: f64) -> GrayImage {
    let (w, h) = frame.dimensions();
    let mut out = GrayImage::new(w, h);
    let src = frame.as_raw();
    let dst: &mut [u8] = &mut out;
    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        if f64::from(s) >= threshold {
            *d = 255;
        }
    }
    out
}

/// Binarize a batch with `threshold = mean + k_sigma * stddev`.
///
/// [`ThresholdScope::PerFrame`] derives each frame's threshold from that
/// frame's own statistics. [`ThresholdScope::Batch`] pools the statistics
/// over every pixel of every frame and applies the single resulting
/// threshold everywhere. Returns the masks together with the threshold that
/// was applied to each frame, index-aligned with the input.
pub fn binarize_batch(
    batch: &FrameBatch,
    k_sigma: f64,
    scope: ThresholdScope,
) -> Result<(FrameBatch, Vec<f64>), PipelineError> {
    if !k_sigma.is_finite() {
        return Err(PipelineError::Configuration("k_sigma must be finite".into()));
    }
    if batch.is_empty() {
        return Err(PipelineError::Data(
            "cannot derive thresholds from an empty batch".into(),
        ));
    }

    let thresholds: Vec<f64> = match scope {
        ThresholdScope::PerFrame => batch
            .iter()
            .map(|frame| intensity_stats(frame).map(|s| s.threshold(k_sigma)))
            .collect::<Result<_, _>>()?,
        ThresholdScope::Batch => {
            let mut acc = StatsAccumulator::default();
            for frame in batch.iter() {
                acc.push_frame(frame);
            }
            let stats = acc.finish().ok_or_else(|| {
                PipelineError::Data("cannot derive thresholds from empty frames".into())
            })?;
            vec![stats.threshold(k_sigma); batch.len()]
        }
    };

    let masks: Vec<GrayImage> = batch
        .frames()
        .par_iter()
        .zip(thresholds.par_iter())
        .map(|(frame, &t)| binarize(frame, t))
        .collect();
    Ok((FrameBatch::from_stage_output(masks), thresholds))
}
