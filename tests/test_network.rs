// Tests for network construction, inference and the lazy first-layer resize.

use approx::assert_abs_diff_eq;
use bpnn::activation::softmax;
use bpnn::{labels_to_one_hot, ActivationFunction, InputWidth, LossType, Network, NetworkError};

#[test]
fn first_forward_fixes_input_width() {
    let mut net = Network::with_seed(0.1, LossType::Mse, 5);
    net.add_layer(3, ActivationFunction::Sigmoid).unwrap();
    net.add_layer(1, ActivationFunction::Sigmoid).unwrap();
    assert_eq!(net.layers()[0].input_size(), 1);
    assert_eq!(net.input_width(), InputWidth::Placeholder);

    let out = net.predict(&[0.5, 0.25, 0.75, 1.0]).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(net.layers()[0].input_size(), 4);
    assert_eq!(net.layers()[0].output_size(), 3);
    assert_eq!(net.layers()[0].activation(), ActivationFunction::ReLU);
    assert_eq!(net.input_width(), InputWidth::Fixed);

    let err = net.predict(&[0.5, 0.25]).unwrap_err();
    assert!(matches!(err, NetworkError::DimensionMismatch { expected: 4, actual: 2 }));
}

#[test]
fn single_feature_input_defers_the_rebuild() {
    let mut net = Network::with_seed(0.1, LossType::Mse, 5);
    net.add_layer(2, ActivationFunction::Sigmoid).unwrap();
    net.predict(&[0.3]).unwrap();
    assert_eq!(net.layers()[0].activation(), ActivationFunction::Sigmoid);
    assert_eq!(net.input_width(), InputWidth::Placeholder);

    let out = net.predict(&[0.3, 0.4]).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(net.layers()[0].input_size(), 2);
    assert_eq!(net.layers()[0].activation(), ActivationFunction::ReLU);
    assert_eq!(net.input_width(), InputWidth::Fixed);
}

#[test]
fn first_layer_of_an_emptied_network_is_a_placeholder_again() {
    let mut net = Network::with_seed(0.1, LossType::Mse, 5);
    let mut bytes = Vec::new();
    net.write_to(&mut bytes).unwrap();
    net.read_from(&mut std::io::Cursor::new(bytes)).unwrap();
    assert_eq!(net.input_width(), InputWidth::Fixed);

    net.add_layer(3, ActivationFunction::Sigmoid).unwrap();
    assert_eq!(net.input_width(), InputWidth::Placeholder);
    net.predict(&[0.1, 0.2, 0.3]).unwrap();
    assert_eq!(net.layers()[0].input_size(), 3);
}

#[test]
fn predict_is_idempotent() {
    let mut net = Network::with_seed(0.1, LossType::CrossEntropy, 11);
    net.add_layer(8, ActivationFunction::ReLU).unwrap();
    net.add_layer(4, ActivationFunction::Softmax).unwrap();

    let input = [0.1, 0.9, 0.4];
    let first = net.predict(&input).unwrap();
    let second = net.predict(&input).unwrap();
    assert_eq!(first, second);
}

#[test]
fn softmax_output_is_a_distribution() {
    let mut net = Network::with_seed(0.1, LossType::CrossEntropy, 2);
    net.add_layer(6, ActivationFunction::ReLU).unwrap();
    net.add_layer(5, ActivationFunction::Softmax).unwrap();

    let out = net.predict(&[3.0, -1.0, 0.5]).unwrap();
    assert_abs_diff_eq!(out.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert!(out.iter().all(|&p| (0.0..=1.0).contains(&p)));

    let extreme = softmax(&[1000.0, -1000.0, 0.0]);
    assert_abs_diff_eq!(extreme.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert!(extreme.iter().all(|p| p.is_finite()));
}

#[test]
fn zero_unit_layer_is_rejected() {
    let mut net = Network::with_seed(0.1, LossType::Mse, 0);
    assert!(matches!(
        net.add_layer(0, ActivationFunction::ReLU),
        Err(NetworkError::InvalidConfiguration(_))
    ));
    assert!(net.layers().is_empty());
}

#[test]
fn empty_network_passes_input_through() {
    let mut net = Network::with_seed(0.1, LossType::Mse, 0);
    assert_eq!(net.predict(&[1.0, 2.0]).unwrap(), vec![1.0, 2.0]);
}

#[test]
fn one_hot_targets() {
    let targets = labels_to_one_hot(&[0u8, 3, 9], 10).unwrap();
    assert_eq!(targets.len(), 3);
    for (row, &label) in targets.iter().zip(&[0usize, 3, 9]) {
        assert_eq!(row.len(), 10);
        assert_eq!(row.iter().sum::<f64>(), 1.0);
        assert_eq!(row[label], 1.0);
    }
}

#[test]
fn display_lists_layers() {
    let mut net = Network::with_seed(0.01, LossType::Mse, 0);
    net.add_layer(3, ActivationFunction::ReLU).unwrap();
    net.add_layer(1, ActivationFunction::Sigmoid).unwrap();
    net.predict(&[0.0, 1.0]).unwrap();

    let text = net.to_string();
    assert!(text.starts_with("Number of layers: 2\n"));
    assert!(text.contains("Optimizer: SGD"));
    assert!(text.contains("Layer 0: 2 -> 3 neurons (ReLU)"));
    assert!(text.contains("Layer 1: 3 -> 1 neurons (Sigmoid)"));
}
