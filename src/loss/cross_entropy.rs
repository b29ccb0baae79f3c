/// Categorical cross-entropy loss for use with a Softmax output layer.
pub struct CrossEntropyLoss;

/// Predictions are clamped to [EPS, 1 - EPS] before taking the log.
const EPS: f64 = 1e-15;

impl CrossEntropyLoss {
    /// Computes the scalar cross-entropy loss:
    ///   L = -sum(expected[i] * ln(clamp(predicted[i], eps, 1 - eps)))
    ///
    /// `predicted`: softmax probabilities, shape [n_classes]
    /// `expected` : one-hot (or soft) target distribution, shape [n_classes]
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        predicted.iter().zip(expected.iter())
            .map(|(p, e)| -e * p.clamp(EPS, 1.0 - EPS).ln())
            .sum()
    }

    /// Gradient of the combined Softmax + cross-entropy w.r.t. the pre-softmax
    /// logits:
    ///   ∂L/∂z_i = predicted[i] - expected[i]
    ///
    /// The Softmax layer's backward step treats this as its error term as-is,
    /// so the Jacobian is not applied twice.
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(p, e)| p - e)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn one_hot_picks_out_true_class() {
        let loss = CrossEntropyLoss::loss(&[0.2, 0.5, 0.3], &[0.0, 1.0, 0.0]);
        assert_abs_diff_eq!(loss, -(0.5f64.ln()), epsilon = 1e-12);
    }

    #[test]
    fn zero_probability_is_clamped() {
        let loss = CrossEntropyLoss::loss(&[0.0, 1.0], &[1.0, 0.0]);
        assert!(loss.is_finite());
        assert_abs_diff_eq!(loss, -(EPS.ln()), epsilon = 1e-9);
    }

    #[test]
    fn certain_and_correct_is_near_zero() {
        let loss = CrossEntropyLoss::loss(&[1.0, 0.0], &[1.0, 0.0]);
        assert!(loss >= 0.0 && loss < 1e-12);
    }
}
