//! Error types shared by the pipeline stages and the window classifier.

use std::fmt;

// ── Pipeline errors ─────────────────────────────────────────────────────────

/// Failure modes of the frame-transformation stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A stage parameter is unusable: zero or even window, zero padding,
    /// non-finite multiplier, malformed template.
    Configuration(String),
    /// A window or structuring element does not fit inside the frame.
    Dimension {
        /// Frame dimensions (width, height).
        frame: (u32, u32),
        /// Operator dimensions (width, height).
        window: (u32, u32),
    },
    /// The input data cannot be processed: empty batch, mixed frame shapes,
    /// empty frame.
    Data(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "invalid configuration: {}", msg),
            Self::Dimension { frame, window } => write!(
                f,
                "{}x{} operator does not fit {}x{} frame",
                window.0, window.1, frame.0, frame.1
            ),
            Self::Data(msg) => write!(f, "bad input data: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

// ── Classifier errors ───────────────────────────────────────────────────────

/// Failure modes of feature extraction, training, and inference.
#[derive(Debug, Clone, PartialEq)]
pub enum MlpError {
    /// Hyper-parameters are unusable: even window, zero layer width,
    /// non-positive learning rate, zero epochs.
    Configuration(String),
    /// The dataset or serialized model is malformed or inconsistent with the
    /// network it is used with.
    Data(String),
    /// An activation or weight stopped being finite during training.
    NumericalInstability {
        /// Zero-based epoch at which the divergence was detected.
        epoch: usize,
    },
}

impl fmt::Display for MlpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "invalid classifier configuration: {}", msg),
            Self::Data(msg) => write!(f, "bad classifier data: {}", msg),
            Self::NumericalInstability { epoch } => {
                write!(f, "training diverged at epoch {}", epoch)
            }
        }
    }
}

impl std::error::Error for MlpError {}
