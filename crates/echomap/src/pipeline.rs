//! Staged batch processing: padding through morphological refinement.
//!
//! [`Pipeline`] validates a [`PipelineConfig`] once, then maps whole batches
//! through pad, smooth, binarize, reduce, and refine. The stage order is
//! fixed; per-frame work inside each stage runs in parallel and outputs stay
//! index-aligned with the input batch.

use image::GrayImage;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::binarize::binarize_batch;
use crate::config::{MorphStep, PipelineConfig};
use crate::error::PipelineError;
use crate::frame::FrameBatch;
use crate::morph::skeleton::{skeleton_filter, standard_templates};
use crate::morph::{dilate, erode, StructuringElement};
use crate::pad::zero_pad;
use crate::reduce::block_reduce;
use crate::smooth::mean_filter;

/// Batch results, frame index aligned with the input batch.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Padded and smoothed frames.
    pub smoothed: FrameBatch,
    /// Threshold applied to each frame.
    pub thresholds: Vec<f64>,
    /// Binary masks at smoothed resolution.
    pub binary: FrameBatch,
    /// Majority-vote reduced masks.
    pub reduced: FrameBatch,
    /// Reduced masks after the refinement steps.
    pub refined: FrameBatch,
}

impl PipelineRun {
    /// On-pixel count of each refined mask.
    pub fn refined_on_counts(&self) -> Vec<usize> {
        self.refined
            .iter()
            .map(|m| m.as_raw().iter().filter(|&&v| v != 0).count())
            .collect()
    }
}

/// Configured frame-to-target-map pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Validate `config` and build a runnable pipeline.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Transform a batch of grayscale frames into refined target maps.
    pub fn run(&self, batch: &FrameBatch) -> Result<PipelineRun, PipelineError> {
        let (w, h) = match batch.dimensions() {
            Some(dims) => dims,
            None => {
                return Err(PipelineError::Data("cannot process an empty batch".into()))
            }
        };
        let cfg = &self.config;
        info!("processing {} frames of {}x{}", batch.len(), w, h);

        let smoothed = batch
            .frames()
            .par_iter()
            .map(|frame| {
                let padded = zero_pad(frame, cfg.padding)?;
                mean_filter(&padded, cfg.smooth_window, cfg.border)
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;
        let smoothed = FrameBatch::from_stage_output(smoothed);

        let (binary, thresholds) = binarize_batch(&smoothed, cfg.k_sigma, cfg.threshold_scope)?;
        if let (Some(lo), Some(hi)) = (
            thresholds.iter().cloned().reduce(f64::min),
            thresholds.iter().cloned().reduce(f64::max),
        ) {
            debug!("thresholds span {:.2}..{:.2}", lo, hi);
        }

        let reduced = binary
            .frames()
            .par_iter()
            .map(|mask| block_reduce(mask, cfg.block_size))
            .collect::<Result<Vec<_>, PipelineError>>()?;
        let reduced = FrameBatch::from_stage_output(reduced);

        let refined = reduced
            .frames()
            .par_iter()
            .map(|mask| refine_mask(mask, &cfg.refine))
            .collect::<Result<Vec<_>, PipelineError>>()?;
        let refined = FrameBatch::from_stage_output(refined);

        let run = PipelineRun {
            smoothed,
            thresholds,
            binary,
            reduced,
            refined,
        };
        debug!("refined on-pixel counts: {:?}", run.refined_on_counts());
        Ok(run)
    }
}

/// Apply the configured morphology steps in order.
fn refine_mask(mask: &GrayImage, steps: &[MorphStep]) -> Result<GrayImage, PipelineError> {
    let mut current = mask.clone();
    for step in steps {
        current = match step {
            MorphStep::Erode { side } => {
                let element = StructuringElement::square(*side)?;
                erode(&current, &element)?
            }
            MorphStep::Dilate { side } => {
                let element = StructuringElement::square(*side)?;
                dilate(&current, &element)?
            }
            MorphStep::Skeleton { rule, action } => {
                skeleton_filter(&current, &standard_templates(), *rule, *action)
            }
        };
    }
    Ok(current)
}
