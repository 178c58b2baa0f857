//! echomap turns batches of grayscale intensity frames into binary target
//! maps and counts the targets they contain.
//!
//! Two paths share the same [`FrameBatch`] input:
//!
//! 1. **Target-map pipeline**: zero-border padding, integer-truncated mean
//!    smoothing, adaptive `mean + k_sigma * stddev` binarization,
//!    majority-vote block reduction, and ordered morphological refinement
//!    (erosion, dilation, 3x3 template filtering).
//! 2. **Window classifier**: sliding-window feature extraction, a sigmoid
//!    MLP trained from scratch with full-batch gradient descent, and target
//!    counting via 8-connected component labeling of the prediction mask.
//!
//! # Public API
//! - [`Pipeline`] with [`PipelineConfig`] runs the whole frame pipeline;
//!   the stage functions ([`zero_pad`], [`mean_filter`], [`binarize_batch`],
//!   [`block_reduce`], [`erode`], [`dilate`], [`skeleton_filter`]) are also
//!   exposed for custom compositions.
//! - [`WindowDataset`], [`Mlp`], [`train`], [`predict_mask`], and
//!   [`count_targets`] cover the classifier from dataset to counted targets.

mod binarize;
mod config;
mod error;
mod frame;
mod labeling;
mod mlp;
mod morph;
mod pad;
mod pipeline;
mod reduce;
mod smooth;
mod stats;
#[cfg(test)]
mod test_utils;

pub use binarize::{binarize, binarize_batch};
pub use config::{
    BiasPolicy, BorderPolicy, MatchAction, MatchRule, MlpConfig, MorphStep, PipelineConfig,
    ThresholdScope,
};
pub use error::{MlpError, PipelineError};
pub use frame::FrameBatch;
pub use labeling::{count_components, label_components, LabelMap};
pub use mlp::{
    count_targets, predict_mask, train, EpochStats, Layer, LayerParams, Mlp, MlpParams,
    TrainReport, WindowDataset,
};
pub use morph::skeleton::{skeleton_filter, standard_templates, SkeletonTemplate};
pub use morph::{close, dilate, erode, open, StructuringElement};
pub use pad::zero_pad;
pub use pipeline::{Pipeline, PipelineRun};
pub use reduce::block_reduce;
pub use smooth::mean_filter;
pub use stats::{intensity_stats, FrameStats};
