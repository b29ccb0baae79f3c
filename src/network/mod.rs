pub mod boundary;
pub mod model_file;
pub mod network;
pub mod spec;

pub use network::{InputWidth, Network};
pub use spec::{NetworkSpec, LayerSpec};
