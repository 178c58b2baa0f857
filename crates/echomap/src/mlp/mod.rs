//! From-scratch windowed MLP: feature extraction, sigmoid layers, full-batch
//! gradient descent, and component-count inference.

mod detect;
mod features;
mod model;
mod train;

pub use detect::{count_targets, predict_mask};
pub use features::WindowDataset;
pub use model::{Layer, LayerParams, Mlp, MlpParams};
pub use train::{train, EpochStats, TrainReport};
