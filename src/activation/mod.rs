pub mod activation;

pub use activation::{
    ActivationFunction,
    relu, relu_derivative, sigmoid, sigmoid_derivative, softmax, softmax_derivative,
};
