use serde::{Serialize, Deserialize};

/// Exponent magnitude beyond which `exp` is treated as saturated.
const EXP_LIMIT: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Sigmoid,
    ReLU,
    /// Softmax is vector-valued; `apply()` normalizes across the whole layer
    /// output instead of mapping each unit on its own.
    Softmax,
}

impl ActivationFunction {
    /// Applies the activation to a layer's weighted sums.
    pub fn apply(&self, z: &[f64]) -> Vec<f64> {
        match self {
            ActivationFunction::Sigmoid => z.iter().map(|&x| sigmoid(x)).collect(),
            ActivationFunction::ReLU => z.iter().map(|&x| relu(x)).collect(),
            ActivationFunction::Softmax => softmax(z),
        }
    }

    /// Element-wise derivative at a weighted sum.
    ///
    /// For `Softmax` this is `1.0`: a softmax output layer is paired with
    /// cross-entropy, whose combined gradient `predicted - expected` already
    /// is the error term, so the layer passes it through unchanged. Pairing
    /// Softmax with MSE yields wrong gradients.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => sigmoid_derivative(x),
            ActivationFunction::ReLU => relu_derivative(x),
            ActivationFunction::Softmax => 1.0,
        }
    }

    /// Tag written to the binary model format.
    pub fn tag(&self) -> u32 {
        match self {
            ActivationFunction::Sigmoid => 0,
            ActivationFunction::ReLU => 1,
            ActivationFunction::Softmax => 2,
        }
    }

    pub fn from_tag(tag: u32) -> Option<ActivationFunction> {
        match tag {
            0 => Some(ActivationFunction::Sigmoid),
            1 => Some(ActivationFunction::ReLU),
            2 => Some(ActivationFunction::Softmax),
            _ => None,
        }
    }
}

/// Logistic sigmoid, saturating to exactly 0.0 / 1.0 beyond ±500.
pub fn sigmoid(x: f64) -> f64 {
    if x > EXP_LIMIT {
        1.0
    } else if x < -EXP_LIMIT {
        0.0
    } else {
        1.0 / (1.0 + (-x).exp())
    }
}

pub fn sigmoid_derivative(x: f64) -> f64 {
    let s = sigmoid(x);
    s * (1.0 - s)
}

pub fn relu(x: f64) -> f64 {
    x.max(0.0)
}

/// 1 for x > 0, else 0 (including at exactly 0).
pub fn relu_derivative(x: f64) -> f64 {
    if x > 0.0 { 1.0 } else { 0.0 }
}

/// Numerically stable softmax.
///
/// The max is subtracted before exponentiating and the exponent is clamped to
/// 500. If the sum still comes out non-positive or non-finite (e.g. every
/// input is `-inf`), the uniform distribution is returned instead.
pub fn softmax(z: &[f64]) -> Vec<f64> {
    if z.is_empty() {
        return Vec::new();
    }

    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = z.iter().map(|&x| (x - max).min(EXP_LIMIT).exp()).collect();
    let sum: f64 = exps.iter().sum();

    if sum <= 0.0 || !sum.is_finite() {
        return vec![1.0 / z.len() as f64; z.len()];
    }

    exps.into_iter().map(|e| e / sum).collect()
}

/// Row `index` of the softmax Jacobian: `∂softmax(z)_i / ∂z_index` for every `i`.
///
/// The training path never calls this (see `ActivationFunction::derivative`).
pub fn softmax_derivative(z: &[f64], index: usize) -> Vec<f64> {
    let s = softmax(z);
    let s_index = s.get(index).copied().unwrap_or(0.0);
    s.iter()
        .enumerate()
        .map(|(i, &si)| if i == index { si * (1.0 - si) } else { -si * s_index })
        .collect()
}
