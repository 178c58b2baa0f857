//! Full-batch gradient-descent training.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info};

use crate::config::{BiasPolicy, MlpConfig};
use crate::error::MlpError;

use super::features::WindowDataset;
use super::model::Mlp;

/// Accuracy of one epoch's pre-update forward pass.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EpochStats {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Fraction of samples on the correct side of the 0.5 boundary.
    pub accuracy: f64,
}

/// Per-epoch training trace.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrainReport {
    /// One entry per completed epoch, in order.
    pub epochs: Vec<EpochStats>,
}

impl TrainReport {
    /// Accuracy reported by the last completed epoch.
    pub fn final_accuracy(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.accuracy)
    }
}

struct LayerGrads {
    weights: DMatrix<f64>,
    bias: DVector<f64>,
}

/// Train `model` on `data` with full-batch gradient descent.
///
/// Every epoch runs one forward pass over all samples, records the accuracy
/// of that pass, backpropagates the squared-error gradient, and applies one
/// `w -= learning_rate * grad` step. The reported accuracy therefore always
/// describes the weights before that epoch's update. Non-finite activations
/// or weights abort with [`MlpError::NumericalInstability`].
pub fn train(
    model: &mut Mlp,
    data: &WindowDataset,
    config: &MlpConfig,
) -> Result<TrainReport, MlpError> {
    config.validate()?;
    if data.is_empty() {
        return Err(MlpError::Data("training set is empty".into()));
    }
    let feature_dim = match model.layers().first() {
        Some(first) => first.weights.nrows(),
        None => return Err(MlpError::Data("model has no layers".into())),
    };
    if data.features.ncols() != feature_dim {
        return Err(MlpError::Data(format!(
            "dataset has {} feature columns, model expects {}",
            data.features.ncols(),
            feature_dim
        )));
    }
    if data.labels.nrows() != data.features.nrows() || data.labels.ncols() != 1 {
        return Err(MlpError::Data(
            "labels must be a single column matching the sample count".into(),
        ));
    }

    debug!(
        "training on {} samples, {:.1}% positive",
        data.len(),
        100.0 * data.positive_fraction()
    );

    let update_bias = !matches!(config.bias, BiasPolicy::SharedScalar(_));
    let mut report = TrainReport::default();
    for epoch in 0..config.epochs {
        let activations = model.forward(&data.features);
        let output = match activations.last() {
            Some(out) => out,
            None => return Err(MlpError::Data("model has no layers".into())),
        };
        if !all_finite(output) {
            return Err(MlpError::NumericalInstability { epoch });
        }

        let accuracy = accuracy(output, &data.labels);
        report.epochs.push(EpochStats { epoch, accuracy });
        info!("epoch {}: accuracy {:.4}", epoch, accuracy);

        let grads = backward(model, &data.features, &activations, &data.labels);
        apply_update(model, &grads, config.learning_rate, update_bias);

        for layer in model.layers() {
            if !all_finite(&layer.weights) || !layer.bias.iter().all(|v| v.is_finite()) {
                return Err(MlpError::NumericalInstability { epoch });
            }
        }
    }
    Ok(report)
}

/// Backpropagate the squared-error gradient through every layer.
///
/// The output delta is `(a_out - y) .* a_out .* (1 - a_out)`; hidden deltas
/// pull the next layer's delta back through its weights and multiply by the
/// local sigmoid derivative. Weight gradients are `a_prev^T * delta`, bias
/// gradients the column sums of delta.
fn backward(
    model: &Mlp,
    input: &DMatrix<f64>,
    activations: &[DMatrix<f64>],
    labels: &DMatrix<f64>,
) -> Vec<LayerGrads> {
    let n_layers = model.layers().len();
    let output = &activations[n_layers - 1];
    let mut delta = (output - labels).component_mul(&sigmoid_derivative(output));

    let mut grads = Vec::with_capacity(n_layers);
    for idx in (0..n_layers).rev() {
        let prev = if idx == 0 { input } else { &activations[idx - 1] };
        grads.push(LayerGrads {
            weights: prev.transpose() * &delta,
            bias: column_sums(&delta),
        });
        if idx > 0 {
            let back = &delta * model.layers()[idx].weights.transpose();
            delta = back.component_mul(&sigmoid_derivative(&activations[idx - 1]));
        }
    }
    grads.reverse();
    grads
}

/// Element-wise `a * (1 - a)`, the sigmoid derivative in terms of its output.
fn sigmoid_derivative(a: &DMatrix<f64>) -> DMatrix<f64> {
    a.map(|v| v * (1.0 - v))
}

fn column_sums(m: &DMatrix<f64>) -> DVector<f64> {
    let mut out = DVector::zeros(m.ncols());
    for j in 0..m.ncols() {
        let mut sum = 0.0;
        for i in 0..m.nrows() {
            sum += m[(i, j)];
        }
        out[j] = sum;
    }
    out
}

fn apply_update(model: &mut Mlp, grads: &[LayerGrads], learning_rate: f64, update_bias: bool) {
    for (layer, grad) in model.layers_mut().iter_mut().zip(grads.iter()) {
        layer.weights -= &grad.weights * learning_rate;
        if update_bias {
            layer.bias -= &grad.bias * learning_rate;
        }
    }
}

fn accuracy(output: &DMatrix<f64>, labels: &DMatrix<f64>) -> f64 {
    let n = output.nrows();
    if n == 0 {
        return 0.0;
    }
    let mut correct = 0usize;
    for i in 0..n {
        let predicted = output[(i, 0)] >= 0.5;
        let labeled = labels[(i, 0)] >= 0.5;
        if predicted == labeled {
            correct += 1;
        }
    }
    correct as f64 / n as f64
}

fn all_finite(m: &DMatrix<f64>) -> bool {
    m.iter().all(|v| v.is_finite())
}
