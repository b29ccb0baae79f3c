pub mod adam;
pub mod optimizer;

pub use adam::AdamParams;
pub use optimizer::{Optimizer, OptimizerType};
