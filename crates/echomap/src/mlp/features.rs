//! Sliding-window feature extraction.

use nalgebra::DMatrix;

use crate::error::MlpError;
use crate::frame::FrameBatch;

/// Intensities are scaled into [0, 1] before they reach the network.
pub(crate) const INTENSITY_SCALE: f64 = 1.0 / 255.0;

/// Flattened-window training data.
///
/// One row per valid center pixel per frame, in batch order and then
/// row-major pixel order. Centers are valid when their whole window fits
/// inside the frame, so a frame contributes `(w - window + 1) *
/// (h - window + 1)` samples. Labels are 1.0 where the raw window mean
/// strictly exceeds the target threshold, else 0.0.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDataset {
    /// Sample-major feature matrix with `window * window` columns.
    pub features: DMatrix<f64>,
    /// Single column of {0.0, 1.0} labels.
    pub labels: DMatrix<f64>,
    /// Window side the features were cut with.
    pub window: u32,
}

impl WindowDataset {
    /// Cut every valid window of every frame into a feature row and a label.
    pub fn extract(
        batch: &FrameBatch,
        window: u32,
        target_threshold: f64,
    ) -> Result<Self, MlpError> {
        if window == 0 || window % 2 == 0 {
            return Err(MlpError::Configuration(format!(
                "feature window must be odd and positive, got {}",
                window
            )));
        }
        if !target_threshold.is_finite() {
            return Err(MlpError::Configuration(
                "target threshold must be finite".into(),
            ));
        }
        let (w, h) = match batch.dimensions() {
            Some(dims) => dims,
            None => {
                return Err(MlpError::Data(
                    "cannot extract windows from an empty batch".into(),
                ))
            }
        };
        let k = window as usize;
        let r = k / 2;
        let w_us = w as usize;
        let h_us = h as usize;
        if w_us < k || h_us < k {
            return Err(MlpError::Data(format!(
                "frames are {}x{}, too small for a {} window",
                w, h, window
            )));
        }

        let per_frame = (w_us - 2 * r) * (h_us - 2 * r);
        let n = per_frame * batch.len();
        let dim = k * k;
        let win_area = (k * k) as f64;
        let mut features = DMatrix::zeros(n, dim);
        let mut labels = DMatrix::zeros(n, 1);
        let mut sample = 0usize;
        for frame in batch.iter() {
            let raw = frame.as_raw();
            for cy in r..h_us - r {
                for cx in r..w_us - r {
                    let mut sum = 0u64;
                    let mut col = 0usize;
                    for wy in 0..k {
                        let row = (cy - r + wy) * w_us + (cx - r);
                        for wx in 0..k {
                            let v = raw[row + wx];
                            sum += u64::from(v);
                            features[(sample, col)] = f64::from(v) * INTENSITY_SCALE;
                            col += 1;
                        }
                    }
                    if sum as f64 / win_area > target_threshold {
                        labels[(sample, 0)] = 1.0;
                    }
                    sample += 1;
                }
            }
        }

        Ok(Self {
            features,
            labels,
            window,
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fraction of samples labeled target.
    pub fn positive_fraction(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.labels.iter().sum::<f64>() / self.labels.nrows() as f64
    }
}
