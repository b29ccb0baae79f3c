use serde::{Serialize, Deserialize};

/// Adam hyperparameters. Fixed when the optimizer is built and shared by
/// every layer it updates; the per-weight moment estimates and the step
/// counter live in each `Layer`.
///
/// ```text
/// m_t   = β1 · m_{t-1} + (1 - β1) · g
/// v_t   = β2 · v_{t-1} + (1 - β2) · g²
/// m̂     = m_t / (1 - β1^t)
/// v̂     = v_t / (1 - β2^t)
/// param = param - lr · m̂ / (√v̂ + ε)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdamParams {
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl AdamParams {
    pub fn new(beta1: f64, beta2: f64, epsilon: f64) -> AdamParams {
        AdamParams { beta1, beta2, epsilon }
    }
}

impl Default for AdamParams {
    fn default() -> Self {
        AdamParams { beta1: 0.9, beta2: 0.999, epsilon: 1e-8 }
    }
}
