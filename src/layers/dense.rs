use rand::Rng;

use crate::{
    activation::activation::ActivationFunction,
    error::{NetworkError, Result},
    math::matrix::Matrix,
    optim::adam::AdamParams,
};

/// Adam moment estimates for one layer, shaped like its weights and biases.
#[derive(Debug, Clone)]
struct AdamState {
    m_weights: Matrix,
    v_weights: Matrix,
    m_biases: Vec<f64>,
    v_biases: Vec<f64>,
    /// One counter for the whole layer, bumped once per update call.
    timestep: i32,
}

impl AdamState {
    fn zeros(rows: usize, cols: usize) -> AdamState {
        AdamState {
            m_weights: Matrix::zeros(rows, cols),
            v_weights: Matrix::zeros(rows, cols),
            m_biases: vec![0.0; rows],
            v_biases: vec![0.0; rows],
            timestep: 0,
        }
    }
}

/// One fully-connected layer: `a = act(W·x + b)`.
///
/// Besides its parameters the layer caches what the last forward pass
/// computed (`weighted_sums`, `activations`) and what the last backward pass
/// computed (`error_terms`); the optimizer reads the latter.
#[derive(Debug, Clone)]
pub struct Layer {
    weights: Matrix,
    biases: Vec<f64>,
    activator: ActivationFunction,
    weighted_sums: Vec<f64>,
    activations: Vec<f64>,
    error_terms: Vec<f64>,
    adam: AdamState,
}

impl Layer {
    /// Creates a layer with freshly initialized weights: He-normal for ReLU,
    /// Xavier-uniform otherwise. Biases start at zero.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        let weights = match activation {
            ActivationFunction::ReLU => Matrix::he(output_size, input_size, rng),
            _ => Matrix::xavier_uniform(output_size, input_size, rng),
        };
        Layer::from_parameters(weights, vec![0.0; output_size], activation)
    }

    /// Rebuilds a layer from stored parameters. Adam state starts from zero.
    ///
    /// `weights.rows` must equal `biases.len()`.
    pub fn from_parameters(weights: Matrix, biases: Vec<f64>, activation: ActivationFunction) -> Layer {
        debug_assert_eq!(weights.rows, biases.len());
        let (rows, cols) = (weights.rows, weights.cols);
        Layer {
            weights,
            biases,
            activator: activation,
            weighted_sums: vec![0.0; rows],
            activations: vec![0.0; rows],
            error_terms: vec![0.0; rows],
            adam: AdamState::zeros(rows, cols),
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.cols
    }

    pub fn output_size(&self) -> usize {
        self.weights.rows
    }

    pub fn activation(&self) -> ActivationFunction {
        self.activator
    }

    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    /// Output of the most recent forward pass.
    pub fn activations(&self) -> &[f64] {
        &self.activations
    }

    pub fn weighted_sums(&self) -> &[f64] {
        &self.weighted_sums
    }

    /// ∂L/∂z per unit, from the most recent backward pass.
    pub fn error_terms(&self) -> &[f64] {
        &self.error_terms
    }

    /// Number of Adam updates applied since construction.
    pub fn timestep(&self) -> i32 {
        self.adam.timestep
    }

    pub fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.input_size() {
            return Err(NetworkError::dimension(self.input_size(), input.len()));
        }

        self.weighted_sums = self.weights.mul_vec(input)
            .into_iter()
            .zip(&self.biases)
            .map(|(wx, b)| wx + b)
            .collect();
        self.activations = self.activator.apply(&self.weighted_sums);
        Ok(self.activations.clone())
    }

    /// Turns ∂L/∂a for this layer's outputs into error terms and returns
    /// ∂L/∂x for its inputs.
    ///
    /// A Softmax layer takes `gradient` as its error term unchanged, which is
    /// only correct when the network's loss is cross-entropy.
    pub fn backward(&mut self, gradient: &[f64]) -> Result<Vec<f64>> {
        if gradient.len() != self.output_size() {
            return Err(NetworkError::dimension(self.output_size(), gradient.len()));
        }

        self.error_terms = match self.activator {
            ActivationFunction::Softmax => gradient.to_vec(),
            act => gradient.iter()
                .zip(&self.weighted_sums)
                .map(|(g, &z)| g * act.derivative(z))
                .collect(),
        };

        Ok(self.weights.transpose_mul_vec(&self.error_terms))
    }

    /// Plain gradient step using the cached error terms.
    pub fn update_weights_sgd(&mut self, input: &[f64], learning_rate: f64) -> Result<()> {
        self.check_update_input(input)?;

        for ((row, bias), &err) in self.weights.data.iter_mut()
            .zip(self.biases.iter_mut())
            .zip(&self.error_terms)
        {
            for (w, &x) in row.iter_mut().zip(input) {
                *w -= learning_rate * err * x;
            }
            *bias -= learning_rate * err;
        }
        Ok(())
    }

    /// Adam step using the cached error terms. Bias correction uses the
    /// layer's shared timestep, which this call increments exactly once.
    pub fn update_weights_adam(
        &mut self,
        input: &[f64],
        learning_rate: f64,
        params: &AdamParams,
    ) -> Result<()> {
        self.check_update_input(input)?;

        let AdamParams { beta1, beta2, epsilon } = *params;
        let state = &mut self.adam;
        state.timestep += 1;
        let correction1 = 1.0 - beta1.powi(state.timestep);
        let correction2 = 1.0 - beta2.powi(state.timestep);

        let step = |param: &mut f64, m: &mut f64, v: &mut f64, grad: f64| {
            *m = beta1 * *m + (1.0 - beta1) * grad;
            *v = beta2 * *v + (1.0 - beta2) * grad * grad;
            let m_hat = *m / correction1;
            let v_hat = *v / correction2;
            *param -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
        };

        for i in 0..self.weights.rows {
            let err = self.error_terms[i];
            let row = &mut self.weights.data[i];
            let m_row = &mut state.m_weights.data[i];
            let v_row = &mut state.v_weights.data[i];
            for j in 0..row.len() {
                step(&mut row[j], &mut m_row[j], &mut v_row[j], err * input[j]);
            }
            step(&mut self.biases[i], &mut state.m_biases[i], &mut state.v_biases[i], err);
        }
        Ok(())
    }

    fn check_update_input(&self, input: &[f64]) -> Result<()> {
        if input.len() != self.input_size() {
            return Err(NetworkError::dimension(self.input_size(), input.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed_layer(activation: ActivationFunction) -> Layer {
        let weights = Matrix::from_data(vec![vec![0.5, -0.25], vec![1.0, 2.0]]);
        Layer::from_parameters(weights, vec![0.1, -0.2], activation)
    }

    #[test]
    fn new_layer_shapes_and_zero_biases() {
        let mut rng = StdRng::seed_from_u64(3);
        let layer = Layer::new(4, 3, ActivationFunction::Sigmoid, &mut rng);
        assert_eq!(layer.input_size(), 4);
        assert_eq!(layer.output_size(), 3);
        assert_eq!(layer.biases(), &[0.0; 3]);
        assert_eq!(layer.activations().len(), 3);
        assert_eq!(layer.timestep(), 0);
    }

    #[test]
    fn forward_computes_affine_then_activation() {
        let mut layer = fixed_layer(ActivationFunction::ReLU);
        let out = layer.forward(&[2.0, 4.0]).unwrap();
        // row 0: 0.1 + 1.0 - 1.0 = 0.1; row 1: -0.2 + 2.0 + 8.0 = 9.8
        assert_abs_diff_eq!(out[0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(out[1], 9.8, epsilon = 1e-12);
        assert_eq!(layer.weighted_sums(), out.as_slice());
    }

    #[test]
    fn forward_rejects_wrong_width() {
        let mut layer = fixed_layer(ActivationFunction::Sigmoid);
        let err = layer.forward(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, NetworkError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn softmax_layer_outputs_distribution() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut layer = Layer::new(5, 4, ActivationFunction::Softmax, &mut rng);
        let out = layer.forward(&[0.3, -1.0, 2.0, 0.0, 0.7]).unwrap();
        assert_eq!(out.len(), 4);
        assert_abs_diff_eq!(out.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(out.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn backward_multiplies_by_derivative_and_propagates() {
        let mut layer = fixed_layer(ActivationFunction::ReLU);
        layer.forward(&[-2.0, 0.5]).unwrap();
        // z = [0.1 - 1.0 - 0.125, -0.2 - 2.0 + 1.0] = [-1.025, -1.2] -> both inactive
        let grad = layer.backward(&[1.0, 1.0]).unwrap();
        assert_eq!(layer.error_terms(), &[0.0, 0.0]);
        assert_eq!(grad, vec![0.0, 0.0]);

        layer.forward(&[2.0, 4.0]).unwrap();
        let grad = layer.backward(&[1.0, -1.0]).unwrap();
        assert_eq!(layer.error_terms(), &[1.0, -1.0]);
        assert_abs_diff_eq!(grad[0], 0.5 - 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[1], -0.25 - 2.0, epsilon = 1e-12);
    }

    #[test]
    fn softmax_backward_is_pass_through() {
        let mut layer = fixed_layer(ActivationFunction::Softmax);
        layer.forward(&[1.0, 1.0]).unwrap();
        layer.backward(&[0.3, -0.3]).unwrap();
        assert_eq!(layer.error_terms(), &[0.3, -0.3]);
    }

    #[test]
    fn backward_rejects_wrong_width() {
        let mut layer = fixed_layer(ActivationFunction::Sigmoid);
        assert!(layer.backward(&[1.0]).is_err());
    }

    #[test]
    fn sgd_update_follows_error_terms() {
        let mut layer = fixed_layer(ActivationFunction::Softmax);
        layer.forward(&[1.0, 2.0]).unwrap();
        layer.backward(&[0.5, -1.0]).unwrap();
        layer.update_weights_sgd(&[1.0, 2.0], 0.1).unwrap();

        let w = &layer.weights().data;
        assert_abs_diff_eq!(w[0][0], 0.5 - 0.1 * 0.5 * 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[0][1], -0.25 - 0.1 * 0.5 * 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[1][1], 2.0 + 0.1 * 1.0 * 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(layer.biases()[0], 0.1 - 0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(layer.biases()[1], -0.2 + 0.1, epsilon = 1e-12);

        assert!(layer.update_weights_sgd(&[1.0], 0.1).is_err());
    }

    #[test]
    fn first_adam_step_moves_each_parameter_by_learning_rate() {
        // With bias correction the very first step is lr * g / (|g| + eps).
        let mut layer = fixed_layer(ActivationFunction::Softmax);
        layer.forward(&[1.0, -2.0]).unwrap();
        layer.backward(&[0.5, -0.25]).unwrap();
        layer.update_weights_adam(&[1.0, -2.0], 0.01, &AdamParams::default()).unwrap();

        let w = &layer.weights().data;
        assert_abs_diff_eq!(w[0][0], 0.5 - 0.01, epsilon = 1e-7);
        assert_abs_diff_eq!(w[0][1], -0.25 + 0.01, epsilon = 1e-7);
        assert_abs_diff_eq!(w[1][0], 1.0 + 0.01, epsilon = 1e-7);
        assert_abs_diff_eq!(layer.biases()[1], -0.2 + 0.01, epsilon = 1e-7);
        assert_eq!(layer.timestep(), 1);
    }

    #[test]
    fn adam_timestep_counts_calls_not_parameters() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut layer = Layer::new(3, 4, ActivationFunction::Sigmoid, &mut rng);
        let input = [0.2, 0.4, 0.6];
        for _ in 0..3 {
            layer.forward(&input).unwrap();
            layer.backward(&[0.1, 0.1, 0.1, 0.1]).unwrap();
            layer.update_weights_adam(&input, 0.001, &AdamParams::default()).unwrap();
        }
        assert_eq!(layer.timestep(), 3);
    }
}
