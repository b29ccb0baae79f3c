use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{NetworkError, Result};
use crate::loss::loss_type::LossType;
use crate::network::network::Network;
use crate::optim::adam::AdamParams;
use crate::optim::optimizer::{Optimizer, OptimizerType};

/// Describes one layer in a network specification.
///
/// The input width is not stored: the first layer learns it from the first
/// real input and every later layer takes the previous layer's `units`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub units: usize,
    pub activation: ActivationFunction,
}

/// A serializable description of a network architecture plus its training
/// settings.
///
/// `NetworkSpec` can be saved to / loaded from JSON independently of the
/// trained weights, making it possible to store architecture configurations
/// before training starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Human-readable name used as the model file stem.
    pub name: String,
    pub learning_rate: f64,
    pub loss: LossType,
    pub optimizer: OptimizerType,
    /// Adam hyperparameters; defaults apply when absent.
    #[serde(default)]
    pub adam: Option<AdamParams>,
    /// Seed for weight initialization; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
}

impl NetworkSpec {
    /// 784 → 128 (ReLU) → 64 (ReLU) → 10 (Softmax), Adam at 0.001,
    /// cross-entropy.
    pub fn mnist() -> NetworkSpec {
        NetworkSpec {
            name: "mnist".to_owned(),
            learning_rate: 0.001,
            loss: LossType::CrossEntropy,
            optimizer: OptimizerType::Adam,
            adam: None,
            seed: None,
            layers: vec![
                LayerSpec { units: 128, activation: ActivationFunction::ReLU },
                LayerSpec { units: 64, activation: ActivationFunction::ReLU },
                LayerSpec { units: 10, activation: ActivationFunction::Softmax },
            ],
        }
    }

    /// Builds an untrained network from this spec.
    pub fn build(&self) -> Result<Network> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(NetworkError::InvalidConfiguration(format!(
                "learning rate must be a positive number, got {}",
                self.learning_rate
            )));
        }

        let mut network = match self.seed {
            Some(seed) => Network::with_seed(self.learning_rate, self.loss, seed),
            None => Network::new(self.learning_rate, self.loss),
        };
        for layer in &self.layers {
            network.add_layer(layer.units, layer.activation)?;
        }

        let optimizer = match (self.optimizer, self.adam) {
            (OptimizerType::Adam, Some(params)) => Optimizer::Adam(params),
            (kind, _) => Optimizer::from_type(kind),
        };
        network.set_optimizer_with(optimizer);
        Ok(network)
    }

    /// Writes this architecture to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: &str) -> std::io::Result<NetworkSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
