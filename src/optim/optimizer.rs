use serde::{Serialize, Deserialize};

use crate::{error::Result, layers::dense::Layer, optim::adam::AdamParams};

/// Which update rule a network uses. This is the tag stored in model files;
/// Adam hyperparameters are not persisted and come back as defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerType {
    Sgd,
    Adam,
}

impl OptimizerType {
    pub fn tag(&self) -> u32 {
        match self {
            OptimizerType::Sgd => 0,
            OptimizerType::Adam => 1,
        }
    }

    pub fn from_tag(tag: u32) -> Option<OptimizerType> {
        match tag {
            0 => Some(OptimizerType::Sgd),
            1 => Some(OptimizerType::Adam),
            _ => None,
        }
    }
}

/// Update rule applied to one layer after its backward pass.
///
/// The optimizer itself holds no per-parameter state: Adam's moment
/// estimates live in each `Layer`, so swapping optimizers never discards them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Optimizer {
    Sgd,
    Adam(AdamParams),
}

impl Optimizer {
    /// Builds the optimizer for a tag, with default Adam hyperparameters.
    pub fn from_type(kind: OptimizerType) -> Optimizer {
        match kind {
            OptimizerType::Sgd => Optimizer::Sgd,
            OptimizerType::Adam => Optimizer::Adam(AdamParams::default()),
        }
    }

    pub fn kind(&self) -> OptimizerType {
        match self {
            Optimizer::Sgd => OptimizerType::Sgd,
            Optimizer::Adam(_) => OptimizerType::Adam,
        }
    }

    /// Applies one step to `layer` using its cached error terms and the input
    /// it saw on the forward pass.
    pub fn update_layer(&self, layer: &mut Layer, input: &[f64], learning_rate: f64) -> Result<()> {
        match self {
            Optimizer::Sgd => layer.update_weights_sgd(input, learning_rate),
            Optimizer::Adam(params) => layer.update_weights_adam(input, learning_rate, params),
        }
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Optimizer::Sgd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::activation::ActivationFunction;
    use crate::math::Matrix;

    fn primed_layer() -> Layer {
        let weights = Matrix::from_data(vec![vec![1.0, 1.0]]);
        let mut layer = Layer::from_parameters(weights, vec![0.0], ActivationFunction::Softmax);
        layer.forward(&[1.0, 1.0]).unwrap();
        layer.backward(&[2.0]).unwrap();
        layer
    }

    #[test]
    fn sgd_dispatches_to_plain_step() {
        let mut layer = primed_layer();
        Optimizer::Sgd.update_layer(&mut layer, &[1.0, 1.0], 0.1).unwrap();
        assert_abs_diff_eq!(layer.weights().data[0][0], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(layer.weights().data[0][1], 0.8, epsilon = 1e-12);
        assert_eq!(layer.timestep(), 0);
    }

    #[test]
    fn adam_dispatches_and_advances_timestep() {
        let mut layer = primed_layer();
        Optimizer::from_type(OptimizerType::Adam)
            .update_layer(&mut layer, &[1.0, 1.0], 0.1)
            .unwrap();
        assert_eq!(layer.timestep(), 1);
        assert!(layer.weights().data[0][0] < 1.0);
    }

    #[test]
    fn kind_round_trips_through_tag() {
        for kind in [OptimizerType::Sgd, OptimizerType::Adam] {
            assert_eq!(OptimizerType::from_tag(kind.tag()), Some(kind));
            assert_eq!(Optimizer::from_type(kind).kind(), kind);
        }
        assert_eq!(OptimizerType::from_tag(9), None);
    }
}
