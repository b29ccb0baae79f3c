use serde::{Serialize, Deserialize};

use crate::loss::{cross_entropy::CrossEntropyLoss, mse::MseLoss};

/// Selects the loss a network reports and the backward path it takes.
///
/// - `Mse`         : halved mean-squared error; pair with Sigmoid/ReLU output.
/// - `CrossEntropy`: categorical cross-entropy; pair with Softmax output.
///   The output gradient is the combined Softmax+CE gradient
///   (predicted - expected).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    Mse,
    CrossEntropy,
}

impl LossType {
    pub fn loss(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        match self {
            LossType::Mse => MseLoss::loss(predicted, expected),
            LossType::CrossEntropy => CrossEntropyLoss::loss(predicted, expected),
        }
    }

    /// Gradient of the loss at the network output.
    pub fn derivative(&self, predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        match self {
            LossType::Mse => MseLoss::derivative(predicted, expected),
            LossType::CrossEntropy => CrossEntropyLoss::derivative(predicted, expected),
        }
    }

    /// Tag written to the binary model format.
    pub fn tag(&self) -> u32 {
        match self {
            LossType::Mse => 0,
            LossType::CrossEntropy => 1,
        }
    }

    pub fn from_tag(tag: u32) -> Option<LossType> {
        match tag {
            0 => Some(LossType::Mse),
            1 => Some(LossType::CrossEntropy),
            _ => None,
        }
    }
}

impl Default for LossType {
    fn default() -> Self {
        LossType::Mse
    }
}
