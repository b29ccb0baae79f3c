use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::warn;

use crate::{
    activation::activation::ActivationFunction,
    error::{NetworkError, Result},
    layers::dense::Layer,
    loss::loss_type::LossType,
    optim::optimizer::{Optimizer, OptimizerType},
};

/// Whether the first layer's input width is still the placeholder that
/// `add_layer` gives it, or has been fixed by a rebuild for wider input (or
/// by a loaded model).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputWidth {
    Placeholder,
    Fixed,
}

/// Placeholder fan-in of the first layer until real input is seen.
const PLACEHOLDER_WIDTH: usize = 1;

/// A feedforward stack of fully-connected layers plus the loss, optimizer and
/// learning rate used to train it.
///
/// Training is online: every `train` call does one forward pass, one
/// backward pass and one optimizer step per layer.
#[derive(Debug, Clone)]
pub struct Network {
    pub(crate) layers: Vec<Layer>,
    pub(crate) optimizer: Optimizer,
    pub(crate) learning_rate: f64,
    pub(crate) loss: LossType,
    pub(crate) input: InputWidth,
    rng: StdRng,
}

impl Network {
    /// Empty network using SGD, with weights drawn from an entropy-seeded generator.
    pub fn new(learning_rate: f64, loss: LossType) -> Network {
        Network::with_rng(learning_rate, loss, StdRng::from_entropy())
    }

    /// Empty network whose weight initialization is reproducible from `seed`.
    pub fn with_seed(learning_rate: f64, loss: LossType, seed: u64) -> Network {
        Network::with_rng(learning_rate, loss, StdRng::seed_from_u64(seed))
    }

    fn with_rng(learning_rate: f64, loss: LossType, rng: StdRng) -> Network {
        Network {
            layers: Vec::new(),
            optimizer: Optimizer::Sgd,
            learning_rate,
            loss,
            input: InputWidth::Placeholder,
            rng,
        }
    }

    /// Appends a layer of `units` neurons.
    ///
    /// The first layer is created with a placeholder input width of 1; see
    /// `forward` for how it gets its real width.
    pub fn add_layer(&mut self, units: usize, activation: ActivationFunction) -> Result<()> {
        if units == 0 {
            return Err(NetworkError::InvalidConfiguration(
                "number of neurons must be positive".to_owned(),
            ));
        }
        if self.layers.is_empty() {
            self.input = InputWidth::Placeholder;
        }
        let input_size = self.layers.last().map_or(PLACEHOLDER_WIDTH, Layer::output_size);
        let layer = Layer::new(input_size, units, activation, &mut self.rng);
        self.layers.push(layer);
        Ok(())
    }

    /// Switches the update rule and sets the learning rate. Per-layer Adam
    /// state is kept, so switching back to Adam resumes where it left off.
    pub fn set_optimizer(&mut self, kind: OptimizerType, learning_rate: f64) {
        self.learning_rate = learning_rate;
        self.optimizer = Optimizer::from_type(kind);
    }

    /// Installs an optimizer with explicit hyperparameters.
    pub fn set_optimizer_with(&mut self, optimizer: Optimizer) {
        self.optimizer = optimizer;
    }

    pub fn set_loss_type(&mut self, loss: LossType) {
        self.loss = loss;
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    pub fn loss_type(&self) -> LossType {
        self.loss
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn input_width(&self) -> InputWidth {
        self.input
    }

    /// Forward pass; stores activations in each layer for backprop.
    ///
    /// While the first layer still has its placeholder width of 1, the first
    /// call with input of any other length discards that layer and rebuilds
    /// it with the real width, ReLU activation and fresh weights. Inputs of
    /// length 1 run through the placeholder layer as is. The rebuild happens
    /// once; afterwards a wrong width is a `DimensionMismatch`. Empty input
    /// never triggers it.
    pub fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        if self.layers.is_empty() {
            return Ok(input.to_vec());
        }
        self.fix_input_width(input.len())?;

        let mut current = input.to_vec();
        for layer in &mut self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    /// Same as `forward`; kept separate so call sites read as inference.
    pub fn predict(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.forward(input)
    }

    /// Index of the most probable output unit.
    pub fn classify(&mut self, input: &[f64]) -> Result<usize> {
        Ok(argmax(&self.predict(input)?))
    }

    /// Output of the first layer only.
    pub fn hidden_layer_output(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        if self.layers.is_empty() {
            return Ok(Vec::new());
        }
        self.fix_input_width(input.len())?;
        self.layers[0].forward(input)
    }

    fn fix_input_width(&mut self, width: usize) -> Result<()> {
        if self.input == InputWidth::Fixed || width == PLACEHOLDER_WIDTH {
            return Ok(());
        }
        if width == 0 {
            return Err(NetworkError::dimension(self.layers[0].input_size(), 0));
        }
        let units = self.layers[0].output_size();
        warn!(
            input_width = width,
            units,
            "rebuilding first layer for real input width (ReLU, fresh weights)"
        );
        self.layers[0] = Layer::new(width, units, ActivationFunction::ReLU, &mut self.rng);
        self.input = InputWidth::Fixed;
        Ok(())
    }

    /// Backward pass for MSE: output gradient is `output - target`.
    /// Updates every layer except the first; `train` updates that one.
    pub fn backward(&mut self, target: &[f64]) -> Result<()> {
        let gradient = match self.output_gradient(target, LossType::Mse)? {
            Some(g) => g,
            None => return Ok(()),
        };
        self.perform_backward_pass(gradient)
    }

    /// Backward pass for a Softmax output trained with cross-entropy. The
    /// combined gradient is also `output - target`; the Softmax layer passes
    /// it through as its error term.
    pub fn backward_cross_entropy(&mut self, target: &[f64]) -> Result<()> {
        let gradient = match self.output_gradient(target, LossType::CrossEntropy)? {
            Some(g) => g,
            None => return Ok(()),
        };
        self.perform_backward_pass(gradient)
    }

    fn output_gradient(&self, target: &[f64], loss: LossType) -> Result<Option<Vec<f64>>> {
        let output = match self.layers.last() {
            Some(layer) => layer.activations(),
            None => return Ok(None),
        };
        if output.len() != target.len() {
            return Err(NetworkError::dimension(output.len(), target.len()));
        }
        Ok(Some(loss.derivative(output, target)))
    }

    fn perform_backward_pass(&mut self, mut gradient: Vec<f64>) -> Result<()> {
        // Layer i > 0 was fed layer i-1's output. Layer 0's input is only
        // known to the caller.
        let layer_inputs: Vec<Vec<f64>> = self.layers.iter()
            .take(self.layers.len().saturating_sub(1))
            .map(|layer| layer.activations().to_vec())
            .collect();

        for i in (0..self.layers.len()).rev() {
            gradient = self.layers[i].backward(&gradient)?;
            if i > 0 {
                self.optimizer.update_layer(&mut self.layers[i], &layer_inputs[i - 1], self.learning_rate)?;
            }
        }
        Ok(())
    }

    /// One online training step. Returns the loss of the output computed
    /// before the weights moved.
    pub fn train(&mut self, input: &[f64], target: &[f64]) -> Result<f64> {
        let output = self.forward(input)?;
        if output.len() != target.len() {
            return Err(NetworkError::dimension(output.len(), target.len()));
        }

        match self.loss {
            LossType::CrossEntropy => self.backward_cross_entropy(target)?,
            LossType::Mse => self.backward(target)?,
        }

        if let Some(first) = self.layers.first_mut() {
            self.optimizer.update_layer(first, input, self.learning_rate)?;
        }

        Ok(self.calculate_loss(&output, target))
    }

    /// Trains on each sample in order and returns the mean loss.
    pub fn train_batch(&mut self, inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<f64> {
        if inputs.len() != targets.len() {
            return Err(NetworkError::InvalidConfiguration(format!(
                "input and target batch sizes don't match ({} vs {})",
                inputs.len(),
                targets.len()
            )));
        }
        if inputs.is_empty() {
            return Ok(0.0);
        }

        let mut total_loss = 0.0;
        for (input, target) in inputs.iter().zip(targets) {
            total_loss += self.train(input, target)?;
        }
        Ok(total_loss / inputs.len() as f64)
    }

    /// Loss of `predicted` against `target` under the network's loss type.
    pub fn calculate_loss(&self, predicted: &[f64], target: &[f64]) -> f64 {
        self.loss.loss(predicted, target)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loss = match self.loss {
            LossType::Mse => "Mean Squared Error",
            LossType::CrossEntropy => "Cross-Entropy",
        };
        let optimizer = match self.optimizer.kind() {
            OptimizerType::Sgd => "SGD",
            OptimizerType::Adam => "Adam",
        };
        writeln!(f, "Number of layers: {}", self.layers.len())?;
        writeln!(f, "Learning rate: {}", self.learning_rate)?;
        writeln!(f, "Loss function: {loss}")?;
        write!(f, "Optimizer: {optimizer}")?;
        for (i, layer) in self.layers.iter().enumerate() {
            write!(
                f,
                "\nLayer {i}: {} -> {} neurons ({:?})",
                layer.input_size(),
                layer.output_size(),
                layer.activation()
            )?;
        }
        Ok(())
    }
}

/// Index of the first maximum element in a slice (0 when empty).
pub(crate) fn argmax(v: &[f64]) -> usize {
    let mut best = 0;
    for (i, &x) in v.iter().enumerate().skip(1) {
        if x > v[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn two_layer(seed: u64) -> Network {
        let mut net = Network::with_seed(0.1, LossType::Mse, seed);
        net.add_layer(3, ActivationFunction::Sigmoid).unwrap();
        net.add_layer(1, ActivationFunction::Sigmoid).unwrap();
        net
    }

    #[test]
    fn add_layer_chains_widths() {
        let net = two_layer(1);
        assert_eq!(net.layers()[0].input_size(), 1);
        assert_eq!(net.layers()[1].input_size(), 3);
        assert_eq!(net.input_width(), InputWidth::Placeholder);
    }

    #[test]
    fn zero_units_is_rejected() {
        let mut net = Network::with_seed(0.1, LossType::Mse, 0);
        let err = net.add_layer(0, ActivationFunction::ReLU).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidConfiguration(_)));
        assert!(net.layers().is_empty());
    }

    #[test]
    fn first_forward_rebuilds_placeholder_layer_as_relu() {
        let mut net = two_layer(2);
        let out = net.forward(&[0.5, -0.5]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(net.layers()[0].input_size(), 2);
        assert_eq!(net.layers()[0].activation(), ActivationFunction::ReLU);
        assert_eq!(net.input_width(), InputWidth::Fixed);

        let err = net.forward(&[0.5, -0.5, 1.0]).unwrap_err();
        assert!(matches!(err, NetworkError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn width_one_input_leaves_placeholder_open() {
        let mut net = two_layer(3);
        let before = net.layers()[0].weights().clone();
        net.forward(&[0.25]).unwrap();
        assert_eq!(net.layers()[0].weights(), &before);
        assert_eq!(net.layers()[0].activation(), ActivationFunction::Sigmoid);
        assert_eq!(net.input_width(), InputWidth::Placeholder);

        net.forward(&[0.25, 0.5]).unwrap();
        assert_eq!(net.layers()[0].input_size(), 2);
        assert_eq!(net.layers()[0].activation(), ActivationFunction::ReLU);
        assert_eq!(net.input_width(), InputWidth::Fixed);
        assert!(net.forward(&[0.25]).is_err());
    }

    #[test]
    fn empty_input_never_rebuilds() {
        let mut net = two_layer(3);
        let err = net.forward(&[]).unwrap_err();
        assert!(matches!(err, NetworkError::DimensionMismatch { expected: 1, actual: 0 }));
        assert!(net.hidden_layer_output(&[]).is_err());
        assert_eq!(net.layers()[0].input_size(), 1);
        assert_eq!(net.input_width(), InputWidth::Placeholder);
    }

    #[test]
    fn empty_network_is_identity() {
        let mut net = Network::with_seed(0.1, LossType::Mse, 0);
        assert_eq!(net.forward(&[1.0, 2.0]).unwrap(), vec![1.0, 2.0]);
        assert!(net.hidden_layer_output(&[1.0]).unwrap().is_empty());
        net.backward(&[0.0]).unwrap();
    }

    #[test]
    fn hidden_layer_output_has_first_layer_width() {
        let mut net = two_layer(4);
        let hidden = net.hidden_layer_output(&[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(hidden.len(), 3);
        assert!(hidden.iter().all(|&h| h >= 0.0));
    }

    #[test]
    fn backward_rejects_target_of_wrong_length() {
        let mut net = two_layer(5);
        net.forward(&[0.1, 0.2]).unwrap();
        let err = net.backward(&[0.0, 1.0]).unwrap_err();
        assert!(matches!(err, NetworkError::DimensionMismatch { expected: 1, actual: 2 }));
        assert!(net.train(&[0.1, 0.2], &[]).is_err());
    }

    #[test]
    fn train_returns_loss_of_pre_update_output() {
        let mut net = two_layer(6);
        let input = [0.3, 0.9];
        let target = [1.0];
        let before = net.predict(&input).unwrap();
        let loss = net.train(&input, &target).unwrap();
        assert_abs_diff_eq!(loss, (before[0] - 1.0).powi(2) / 2.0, epsilon = 1e-12);

        let after = net.predict(&input).unwrap();
        assert!(net.calculate_loss(&after, &target) < loss);
    }

    #[test]
    fn train_updates_every_layer() {
        // Width-1 input keeps the sigmoid first layer, so no unit is ever dead.
        let mut net = two_layer(7);
        net.forward(&[1.0]).unwrap();
        let w0 = net.layers()[0].weights().clone();
        let w1 = net.layers()[1].weights().clone();
        net.train(&[1.0], &[0.0]).unwrap();
        assert_ne!(net.layers()[0].weights(), &w0);
        assert_ne!(net.layers()[1].weights(), &w1);
        assert!(net.layers()[1].biases()[0] < 0.0);
    }

    #[test]
    fn train_batch_rejects_unequal_containers() {
        let mut net = two_layer(8);
        let err = net
            .train_batch(&[vec![0.0, 1.0], vec![1.0, 0.0]], &[vec![1.0]])
            .unwrap_err();
        assert!(matches!(err, NetworkError::InvalidConfiguration(_)));
        assert_eq!(net.train_batch(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn set_optimizer_switches_rule_and_rate() {
        let mut net = two_layer(9);
        net.set_optimizer(OptimizerType::Adam, 0.001);
        assert_eq!(net.optimizer().kind(), OptimizerType::Adam);
        assert_eq!(net.learning_rate(), 0.001);

        net.train(&[0.5, 0.5], &[1.0]).unwrap();
        assert_eq!(net.layers()[1].timestep(), 1);

        net.set_optimizer(OptimizerType::Sgd, 0.1);
        net.train(&[0.5, 0.5], &[1.0]).unwrap();
        assert_eq!(net.layers()[1].timestep(), 1);
    }

    #[test]
    fn cross_entropy_softmax_step_increases_true_class_probability() {
        let mut net = Network::with_seed(0.05, LossType::CrossEntropy, 10);
        net.add_layer(4, ActivationFunction::ReLU).unwrap();
        net.add_layer(3, ActivationFunction::Softmax).unwrap();
        let input = [0.2, 0.8, -0.4];
        let target = [0.0, 0.0, 1.0];

        let before = net.predict(&input).unwrap();
        for _ in 0..20 {
            net.train(&input, &target).unwrap();
        }
        let after = net.predict(&input).unwrap();
        assert!(after[2] > before[2]);
        assert_abs_diff_eq!(after.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn display_lists_layers() {
        let mut net = two_layer(11);
        net.forward(&[0.0, 0.0]).unwrap();
        let text = net.to_string();
        assert!(text.contains("Number of layers: 2"));
        assert!(text.contains("Layer 0: 2 -> 3 neurons (ReLU)"));
        assert!(text.contains("Optimizer: SGD"));
    }

    #[test]
    fn argmax_picks_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
        assert_eq!(argmax(&[0.5, 0.2, 0.5]), 0);
        assert_eq!(argmax(&[]), 0);
    }
}
