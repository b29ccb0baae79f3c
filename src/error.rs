use thiserror::Error;

/// Everything that can go wrong inside the network engine.
///
/// Numeric degeneracy (e.g. a softmax whose exponent sum overflows) is not an
/// error: it is absorbed where it happens.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// A vector's length did not match the width the receiving layer expects.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Zero-width layers, unequal batch containers, bad architecture or hyperparameter values.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// A model stream contained an unknown tag or an empty layer shape.
    #[error("malformed model stream: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, NetworkError>;

impl NetworkError {
    pub(crate) fn dimension(expected: usize, actual: usize) -> Self {
        NetworkError::DimensionMismatch { expected, actual }
    }
}
