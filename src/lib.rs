pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;
pub mod data;

// Convenience re-exports
pub use error::{NetworkError, Result};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::network::{InputWidth, Network};
pub use network::spec::{LayerSpec, NetworkSpec};
pub use loss::{CrossEntropyLoss, LossType, MseLoss};
pub use optim::{AdamParams, Optimizer, OptimizerType};
pub use train::{evaluate, train_loop, EpochStats, TrainConfig};
pub use data::labels_to_one_hot;
