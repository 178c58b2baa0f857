//! Sigmoid MLP layers, initialization, and persistence.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{BiasPolicy, MlpConfig};
use crate::error::MlpError;

/// Logistic function.
#[inline]
pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// One fully-connected layer computing `sigmoid(input * weights + bias)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// `(fan_in, fan_out)` weight matrix.
    pub weights: DMatrix<f64>,
    /// One bias per output unit, added to every sample row.
    pub bias: DVector<f64>,
}

/// Stack of sigmoid layers ending in a single output unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    layers: Vec<Layer>,
}

impl Mlp {
    /// Initialize a `feature_dim -> hidden ... -> 1` chain.
    ///
    /// Weights draw from a symmetric uniform range scaled by
    /// `sqrt(6 / (fan_in + fan_out))`, seeded from the configuration for
    /// reproducible runs. Biases follow `config.bias`.
    pub fn init(feature_dim: usize, config: &MlpConfig) -> Result<Self, MlpError> {
        config.validate()?;
        if feature_dim == 0 {
            return Err(MlpError::Configuration(
                "feature dimension must be positive".into(),
            ));
        }

        let mut dims = Vec::with_capacity(config.hidden_layers + 2);
        dims.push(feature_dim);
        for _ in 0..config.hidden_layers {
            dims.push(config.hidden_units);
        }
        dims.push(1);

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut layers = Vec::with_capacity(dims.len() - 1);
        for pair in dims.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
            let weights = DMatrix::from_fn(fan_in, fan_out, |_, _| rng.gen_range(-limit..limit));
            let bias = match config.bias {
                BiasPolicy::PerLayer => DVector::zeros(fan_out),
                BiasPolicy::SharedScalar(v) => DVector::from_element(fan_out, v),
            };
            layers.push(Layer { weights, bias });
        }
        Ok(Self { layers })
    }

    /// Layer records, input side first.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    /// Widths along the chain, feature dimension first.
    pub fn layer_dims(&self) -> Vec<usize> {
        let mut dims = Vec::with_capacity(self.layers.len() + 1);
        if let Some(first) = self.layers.first() {
            dims.push(first.weights.nrows());
        }
        for layer in &self.layers {
            dims.push(layer.weights.ncols());
        }
        dims
    }

    /// Run the full stack on a sample-major input matrix.
    ///
    /// Returns the activation matrix after every layer, input side first;
    /// the last entry is the output column. The input itself is not
    /// included.
    pub fn forward(&self, input: &DMatrix<f64>) -> Vec<DMatrix<f64>> {
        let mut activations: Vec<DMatrix<f64>> = Vec::with_capacity(self.layers.len());
        for (idx, layer) in self.layers.iter().enumerate() {
            let prev = if idx == 0 { input } else { &activations[idx - 1] };
            let mut z = prev * &layer.weights;
            for j in 0..z.ncols() {
                let b = layer.bias[j];
                for i in 0..z.nrows() {
                    z[(i, j)] += b;
                }
            }
            z.apply(|v| *v = sigmoid(*v));
            activations.push(z);
        }
        activations
    }

    /// Output column for `input` (final activation only).
    pub fn predict(&self, input: &DMatrix<f64>) -> DMatrix<f64> {
        match self.forward(input).pop() {
            Some(out) => out,
            // Unreachable for models built through init or from_params.
            None => input.clone(),
        }
    }

    /// Snapshot the weights into the flat serialization form.
    pub fn to_params(&self) -> MlpParams {
        MlpParams {
            layers: self
                .layers
                .iter()
                .map(|layer| LayerParams {
                    fan_in: layer.weights.nrows(),
                    fan_out: layer.weights.ncols(),
                    weights: layer.weights.transpose().as_slice().to_vec(),
                    bias: layer.bias.as_slice().to_vec(),
                })
                .collect(),
        }
    }

    /// Rebuild a model from serialized parameters, validating the chain.
    pub fn from_params(params: &MlpParams) -> Result<Self, MlpError> {
        if params.layers.is_empty() {
            return Err(MlpError::Data("model has no layers".into()));
        }
        let mut layers = Vec::with_capacity(params.layers.len());
        let mut expect_in: Option<usize> = None;
        for (idx, lp) in params.layers.iter().enumerate() {
            if lp.fan_in == 0 || lp.fan_out == 0 {
                return Err(MlpError::Data(format!(
                    "layer {} has a zero dimension",
                    idx
                )));
            }
            if lp.weights.len() != lp.fan_in * lp.fan_out {
                return Err(MlpError::Data(format!(
                    "layer {}: expected {} weights, got {}",
                    idx,
                    lp.fan_in * lp.fan_out,
                    lp.weights.len()
                )));
            }
            if lp.bias.len() != lp.fan_out {
                return Err(MlpError::Data(format!(
                    "layer {}: expected {} bias entries, got {}",
                    idx,
                    lp.fan_out,
                    lp.bias.len()
                )));
            }
            if let Some(expected) = expect_in {
                if lp.fan_in != expected {
                    return Err(MlpError::Data(format!(
                        "layer {}: fan-in {} does not chain from previous fan-out {}",
                        idx, lp.fan_in, expected
                    )));
                }
            }
            expect_in = Some(lp.fan_out);
            layers.push(Layer {
                weights: DMatrix::from_row_slice(lp.fan_in, lp.fan_out, &lp.weights),
                bias: DVector::from_column_slice(&lp.bias),
            });
        }
        if let Some(last) = params.layers.last() {
            if last.fan_out != 1 {
                return Err(MlpError::Data(format!(
                    "output layer must have width 1, got {}",
                    last.fan_out
                )));
            }
        }
        Ok(Self { layers })
    }
}

// ── Serialization mirror ────────────────────────────────────────────────────

/// Flat form of one layer: row-major weights plus the bias vector.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerParams {
    /// Rows of the weight matrix.
    pub fan_in: usize,
    /// Columns of the weight matrix and length of the bias.
    pub fan_out: usize,
    /// Row-major weight entries, `fan_in * fan_out` values.
    pub weights: Vec<f64>,
    /// Bias entries, `fan_out` values.
    pub bias: Vec<f64>,
}

/// Serializable snapshot of a whole model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MlpParams {
    /// Layers from input to output.
    pub layers: Vec<LayerParams>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> MlpConfig {
        MlpConfig {
            window: 3,
            hidden_layers: 1,
            hidden_units: 4,
            ..MlpConfig::default()
        }
    }

    #[test]
    fn init_builds_the_requested_chain() {
        let model = Mlp::init(9, &small_config()).expect("model");
        assert_eq!(model.layer_dims(), vec![9, 4, 1]);
        assert_eq!(model.layers()[0].bias.len(), 4);
        assert_eq!(model.layers()[1].bias.len(), 1);
    }

    #[test]
    fn init_is_deterministic_for_a_seed() {
        let a = Mlp::init(9, &small_config()).expect("model a");
        let b = Mlp::init(9, &small_config()).expect("model b");
        assert_eq!(a, b);
    }

    #[test]
    fn shared_scalar_bias_is_applied_everywhere() {
        let config = MlpConfig {
            bias: BiasPolicy::SharedScalar(0.25),
            ..small_config()
        };
        let model = Mlp::init(9, &config).expect("model");
        for layer in model.layers() {
            assert!(layer.bias.iter().all(|&b| (b - 0.25).abs() < 1e-12));
        }
    }

    #[test]
    fn forward_keeps_activations_in_the_open_unit_interval() {
        let model = Mlp::init(9, &small_config()).expect("model");
        let input = DMatrix::from_element(5, 9, 0.8);
        let activations = model.forward(&input);
        assert_eq!(activations.len(), 2);
        assert_eq!(activations[0].shape(), (5, 4));
        assert_eq!(activations[1].shape(), (5, 1));
        for a in &activations {
            assert!(a.iter().all(|&v| v > 0.0 && v < 1.0));
        }
    }

    #[test]
    fn params_round_trip_preserves_predictions() {
        let model = Mlp::init(9, &small_config()).expect("model");
        let text = serde_json::to_string(&model.to_params()).expect("serialize");
        let params: MlpParams = serde_json::from_str(&text).expect("deserialize");
        let restored = Mlp::from_params(&params).expect("restored");
        assert_eq!(restored, model);

        let input = DMatrix::from_element(3, 9, 0.5);
        let a = model.predict(&input);
        let b = restored.predict(&input);
        assert!((a - b).abs().max() < 1e-15);
    }

    #[test]
    fn broken_chains_are_rejected() {
        let params = MlpParams {
            layers: vec![
                LayerParams {
                    fan_in: 9,
                    fan_out: 4,
                    weights: vec![0.0; 36],
                    bias: vec![0.0; 4],
                },
                LayerParams {
                    fan_in: 3,
                    fan_out: 1,
                    weights: vec![0.0; 3],
                    bias: vec![0.0],
                },
            ],
        };
        assert!(matches!(
            Mlp::from_params(&params),
            Err(MlpError::Data(_))
        ));
    }

    #[test]
    fn wide_output_layers_are_rejected() {
        let params = MlpParams {
            layers: vec![LayerParams {
                fan_in: 4,
                fan_out: 2,
                weights: vec![0.0; 8],
                bias: vec![0.0; 2],
            }],
        };
        assert!(Mlp::from_params(&params).is_err());
    }

    #[test]
    fn weight_export_is_row_major() {
        let params = MlpParams {
            layers: vec![LayerParams {
                fan_in: 2,
                fan_out: 1,
                weights: vec![1.0, 2.0],
                bias: vec![0.0],
            }],
        };
        let model = Mlp::from_params(&params).expect("model");
        assert!((model.layers()[0].weights[(0, 0)] - 1.0).abs() < 1e-15);
        assert!((model.layers()[0].weights[(1, 0)] - 2.0).abs() < 1e-15);
        assert_eq!(model.to_params(), params);
    }
}
