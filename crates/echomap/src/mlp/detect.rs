//! Batched window inference and target counting.

use image::GrayImage;
use nalgebra::DMatrix;
use tracing::debug;

use crate::error::MlpError;
use crate::labeling::count_components;

use super::features::INTENSITY_SCALE;
use super::model::Mlp;

/// Classify every valid window of `frame` into a full-size {0, 255} mask.
///
/// All windows go through one forward pass as a single feature matrix. A
/// center turns on when the network output reaches 0.5. The `window / 2`
/// border ring has no valid windows and stays 0.
pub fn predict_mask(model: &Mlp, frame: &GrayImage, window: u32) -> Result<GrayImage, MlpError> {
    if window == 0 || window % 2 == 0 {
        return Err(MlpError::Configuration(format!(
            "feature window must be odd and positive, got {}",
            window
        )));
    }
    let (w, h) = frame.dimensions();
    let k = window as usize;
    let r = k / 2;
    let w_us = w as usize;
    let h_us = h as usize;
    if w_us < k || h_us < k {
        return Err(MlpError::Data(format!(
            "frame is {}x{}, too small for a {} window",
            w, h, window
        )));
    }
    let dim = k * k;
    let expected = match model.layers().first() {
        Some(first) => first.weights.nrows(),
        None => return Err(MlpError::Data("model has no layers".into())),
    };
    if dim != expected {
        return Err(MlpError::Data(format!(
            "a {} window yields {} features, model expects {}",
            window, dim, expected
        )));
    }

    let cols = w_us - 2 * r;
    let rows = h_us - 2 * r;
    let raw = frame.as_raw();
    let mut features = DMatrix::zeros(cols * rows, dim);
    let mut sample = 0usize;
    for cy in r..h_us - r {
        for cx in r..w_us - r {
            let mut col = 0usize;
            for wy in 0..k {
                let row = (cy - r + wy) * w_us + (cx - r);
                for wx in 0..k {
                    features[(sample, col)] = f64::from(raw[row + wx]) * INTENSITY_SCALE;
                    col += 1;
                }
            }
            sample += 1;
        }
    }

    let output = model.predict(&features);
    let mut mask = GrayImage::new(w, h);
    let dst: &mut [u8] = &mut mask;
    for (idx, value) in output.column(0).iter().enumerate() {
        if *value >= 0.5 {
            let cy = r + idx / cols;
            let cx = r + idx % cols;
            dst[cy * w_us + cx] = 255;
        }
    }
    Ok(mask)
}

/// Count detected targets: 8-connected components of the prediction mask.
pub fn count_targets(model: &Mlp, frame: &GrayImage, window: u32) -> Result<usize, MlpError> {
    let mask = predict_mask(model, frame, window)?;
    let count = count_components(&mask);
    debug!(
        "counted {} targets in a {}x{} frame",
        count,
        frame.width(),
        frame.height()
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MlpConfig;
    use crate::frame::FrameBatch;
    use crate::mlp::model::{LayerParams, MlpParams};
    use crate::mlp::{train, WindowDataset};
    use crate::test_utils::{target_frame, uniform_frame};
    use imageproc::rect::Rect;

    /// Single-layer model that fires iff the window center is bright: the
    /// center feature gets a large positive weight and the bias recenters
    /// the decision at 0.5 intensity.
    fn center_detector() -> Mlp {
        let mut weights = vec![0.0; 9];
        weights[4] = 20.0;
        let params = MlpParams {
            layers: vec![LayerParams {
                fan_in: 9,
                fan_out: 1,
                weights,
                bias: vec![-10.0],
            }],
        };
        Mlp::from_params(&params).expect("model")
    }

    #[test]
    fn mask_follows_the_center_feature() {
        let model = center_detector();
        let frame = target_frame(12, 12, 0, 255, Rect::at(4, 4).of_size(3, 3));
        let mask = predict_mask(&model, &frame, 3).expect("mask");
        assert_eq!(mask.dimensions(), (12, 12));
        for y in 0..12 {
            for x in 0..12 {
                let expected = if (4..7).contains(&x) && (4..7).contains(&y) {
                    255
                } else {
                    0
                };
                assert_eq!(mask.get_pixel(x, y)[0], expected, "at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn border_ring_stays_empty() {
        let model = center_detector();
        let frame = uniform_frame(8, 8, 255);
        let mask = predict_mask(&model, &frame, 3).expect("mask");
        for y in 0..8 {
            for x in 0..8 {
                let interior = (1..7).contains(&x) && (1..7).contains(&y);
                assert_eq!(mask.get_pixel(x, y)[0] != 0, interior);
            }
        }
    }

    #[test]
    fn separated_targets_are_counted_apart() {
        let model = center_detector();
        let mut frame = uniform_frame(16, 16, 0);
        for (bx, by) in [(2i32, 2i32), (10, 10)] {
            for dy in 0..3 {
                for dx in 0..3 {
                    frame.put_pixel((bx + dx) as u32, (by + dy) as u32, image::Luma([255]));
                }
            }
        }
        assert_eq!(count_targets(&model, &frame, 3).expect("count"), 2);
    }

    #[test]
    fn all_dark_frame_counts_zero() {
        let model = center_detector();
        let frame = uniform_frame(10, 10, 0);
        assert_eq!(count_targets(&model, &frame, 3).expect("count"), 0);
    }

    #[test]
    fn window_must_match_the_model_input() {
        let model = center_detector();
        let frame = uniform_frame(10, 10, 0);
        assert!(matches!(
            predict_mask(&model, &frame, 5),
            Err(MlpError::Data(_))
        ));
    }

    #[test]
    fn undersized_frame_is_rejected() {
        let model = center_detector();
        assert!(matches!(
            predict_mask(&model, &uniform_frame(2, 2, 0), 3),
            Err(MlpError::Data(_))
        ));
    }

    #[test]
    fn trained_model_counts_one_block_end_to_end() {
        // A 6x6 frame of uniform 200 trains against threshold 180; every
        // window is positive, the model learns to fire everywhere, and the
        // prediction mask collapses to a single component.
        let config = MlpConfig {
            window: 3,
            target_threshold: 180.0,
            hidden_layers: 1,
            hidden_units: 8,
            learning_rate: 0.5,
            epochs: 10,
            seed: 7,
            ..MlpConfig::default()
        };
        let frame = uniform_frame(6, 6, 200);
        let batch = FrameBatch::from(frame.clone());
        let data = WindowDataset::extract(&batch, config.window, config.target_threshold)
            .expect("dataset");
        let mut model = Mlp::init(config.feature_dim(), &config).expect("model");
        let report = train(&mut model, &data, &config).expect("trained");
        assert_eq!(report.final_accuracy(), Some(1.0));
        assert_eq!(count_targets(&model, &frame, config.window).expect("count"), 1);
    }
}
