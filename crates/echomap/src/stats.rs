//! Population intensity statistics and adaptive thresholds.

use image::GrayImage;

use crate::error::PipelineError;

/// Population mean and standard deviation of a set of intensities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Mean intensity.
    pub mean: f64,
    /// Population standard deviation, no sample correction.
    pub stddev: f64,
}

impl FrameStats {
    /// Adaptive binarization cutoff: `mean + k_sigma * stddev`.
    pub fn threshold(&self, k_sigma: f64) -> f64 {
        self.mean + k_sigma * self.stddev
    }
}

/// Count, sum, and sum of squares; exact in `u64` for `u8` intensities.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StatsAccumulator {
    n: u64,
    sum: u64,
    sum_sq: u64,
}

impl StatsAccumulator {
    pub(crate) fn push_frame(&mut self, frame: &GrayImage) {
        for &v in frame.as_raw() {
            let v = u64::from(v);
            self.sum += v;
            self.sum_sq += v * v;
        }
        self.n += frame.as_raw().len() as u64;
    }

    /// Finish the accumulation; `None` when no pixels were seen.
    ///
    /// The variance `E[x^2] - E[x]^2` is clamped at zero before the square
    /// root so constant inputs cannot produce a negative rounding residue.
    pub(crate) fn finish(self) -> Option<FrameStats> {
        if self.n == 0 {
            return None;
        }
        let n = self.n as f64;
        let mean = self.sum as f64 / n;
        let var = (self.sum_sq as f64 / n - mean * mean).max(0.0);
        Some(FrameStats {
            mean,
            stddev: var.sqrt(),
        })
    }
}

/// Population statistics over every pixel of one frame.
pub fn intensity_stats(frame: &GrayImage) -> Result<FrameStats, PipelineError> {
    let mut acc = StatsAccumulator::default();
    acc.push_frame(frame);
    acc.finish()
        .ok_or_else(|| PipelineError::Data("cannot take statistics of an empty frame".into()))
}
