//! Stage and trainer configuration.
//!
//! Every tunable the pipeline or the classifier reads lives here, so a single
//! JSON document can carry a full experiment setup. All structures have
//! serde derives and explicit defaults.

use crate::error::{MlpError, PipelineError};

/// How the mean filter treats pixels whose window would leave the frame.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BorderPolicy {
    /// Copy border pixels through unchanged; output keeps the input shape.
    #[default]
    PreserveBorder,
    /// Drop the border ring; output shrinks by the window radius per side.
    CropBorder,
}

/// Where binarization thresholds come from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdScope {
    /// Each frame is thresholded from its own statistics.
    #[default]
    PerFrame,
    /// One threshold from statistics pooled over every pixel of the batch.
    Batch,
}

/// How a 3x3 template is compared against a mask window.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// Every window cell must equal the template cell, zeros included.
    #[default]
    ExactWindow,
    /// Only template-on cells must cover on pixels; other cells are ignored.
    OnCellsOnly,
}

/// What happens to the center of a matched window.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MatchAction {
    /// Reset matched centers to 0 (thinning).
    #[default]
    Clear,
    /// Set matched centers to 255 (bridging).
    Set,
}

/// Bias handling during training.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasPolicy {
    /// Per-layer bias vectors, zero-initialized and updated by gradient
    /// descent alongside the weights.
    #[default]
    PerLayer,
    /// Every bias entry is frozen at the given constant and never updated.
    SharedScalar(f64),
}

/// One refinement step applied to the reduced mask.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorphStep {
    /// Binary erosion with a dense square element of the given side.
    Erode { side: u32 },
    /// Binary dilation with a dense square element of the given side.
    Dilate { side: u32 },
    /// One ordered pass of the standard line templates.
    Skeleton { rule: MatchRule, action: MatchAction },
}

// ── Pipeline configuration ──────────────────────────────────────────────────

/// Frame-pipeline configuration, padding through morphological refinement.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Zero-border margin added before smoothing, in pixels.
    pub padding: u32,
    /// Mean-filter window side; must be odd.
    pub smooth_window: u32,
    /// Mean-filter border handling.
    pub border: BorderPolicy,
    /// Threshold multiplier: `threshold = mean + k_sigma * stddev`.
    pub k_sigma: f64,
    /// Per-frame or batch-pooled threshold statistics.
    pub threshold_scope: ThresholdScope,
    /// Majority-vote tile side for block reduction.
    pub block_size: u32,
    /// Refinement steps applied to the reduced mask, in order.
    pub refine: Vec<MorphStep>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            padding: 1,
            smooth_window: 3,
            border: BorderPolicy::PreserveBorder,
            k_sigma: 5.0,
            threshold_scope: ThresholdScope::PerFrame,
            block_size: 4,
            refine: vec![MorphStep::Skeleton {
                rule: MatchRule::ExactWindow,
                action: MatchAction::Clear,
            }],
        }
    }
}

impl PipelineConfig {
    /// Check every parameter the stages would reject, so a bad configuration
    /// fails before any frame work starts.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.padding == 0 {
            return Err(PipelineError::Configuration(
                "padding margin must be positive".into(),
            ));
        }
        if self.smooth_window == 0 || self.smooth_window % 2 == 0 {
            return Err(PipelineError::Configuration(format!(
                "smoothing window must be odd and positive, got {}",
                self.smooth_window
            )));
        }
        if !self.k_sigma.is_finite() {
            return Err(PipelineError::Configuration(
                "k_sigma must be finite".into(),
            ));
        }
        if self.block_size == 0 {
            return Err(PipelineError::Configuration(
                "block size must be positive".into(),
            ));
        }
        for step in &self.refine {
            if let MorphStep::Erode { side } | MorphStep::Dilate { side } = step {
                if *side == 0 {
                    return Err(PipelineError::Configuration(
                        "structuring element side must be positive".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

// ── Classifier configuration ────────────────────────────────────────────────

/// Window-classifier configuration: features, architecture, training.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    /// Feature window side; must be odd.
    pub window: u32,
    /// A raw window mean above this labels the sample as target.
    pub target_threshold: f64,
    /// Number of hidden layers.
    pub hidden_layers: usize,
    /// Width shared by every hidden layer.
    pub hidden_units: usize,
    /// Gradient-descent step size.
    pub learning_rate: f64,
    /// Full-batch epochs.
    pub epochs: usize,
    /// Trained per-layer bias vectors, or a frozen shared constant.
    pub bias: BiasPolicy,
    /// Seed for reproducible weight initialization.
    pub seed: u64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            window: 3,
            target_threshold: 180.0,
            hidden_layers: 2,
            hidden_units: 256,
            learning_rate: 0.01,
            epochs: 10,
            bias: BiasPolicy::PerLayer,
            seed: 7,
        }
    }
}

impl MlpConfig {
    pub fn validate(&self) -> Result<(), MlpError> {
        if self.window == 0 || self.window % 2 == 0 {
            return Err(MlpError::Configuration(format!(
                "feature window must be odd and positive, got {}",
                self.window
            )));
        }
        if !self.target_threshold.is_finite() {
            return Err(MlpError::Configuration(
                "target threshold must be finite".into(),
            ));
        }
        if self.hidden_layers > 0 && self.hidden_units == 0 {
            return Err(MlpError::Configuration(
                "hidden layers need a positive unit count".into(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(MlpError::Configuration(format!(
                "learning rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        if self.epochs == 0 {
            return Err(MlpError::Configuration("epoch count must be positive".into()));
        }
        if let BiasPolicy::SharedScalar(v) = self.bias {
            if !v.is_finite() {
                return Err(MlpError::Configuration(
                    "shared bias constant must be finite".into(),
                ));
            }
        }
        Ok(())
    }

    /// Input width of the first layer: `window * window`.
    pub fn feature_dim(&self) -> usize {
        (self.window as usize) * (self.window as usize)
    }
}
