/// MNIST digit classification example.
///
/// Architecture: 784 → 128 (ReLU) → 64 (ReLU) → 10 (Softmax)
/// Loss:         cross-entropy (with Softmax the gradient is predicted - expected)
/// Optimizer:    Adam, lr = 0.001
/// Batch size:   32
/// Epochs:       10
///
/// Run with:
///   cargo run --example mnist --release
///
/// Data files must be present at demos/mnist_data/ (IDX binary format).

use anyhow::Context;
use bpnn::data::load_idx_pair;
use bpnn::{evaluate, train_loop, NetworkSpec, TrainConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // --- Paths (relative to project root; cargo run --example runs from there) ---
    let train = load_idx_pair(
        "demos/mnist_data/train-images-idx3-ubyte",
        "demos/mnist_data/train-labels-idx1-ubyte",
    )
    .context("loading training set")?;
    let test = load_idx_pair(
        "demos/mnist_data/t10k-images-idx3-ubyte",
        "demos/mnist_data/t10k-labels-idx1-ubyte",
    )
    .context("loading test set")?;

    println!("  Training set: {} images", train.len());
    println!("  Test set:     {} images", test.len());

    let train_labels = train.one_hot_labels(10)?;
    let test_labels = test.one_hot_labels(10)?;

    let mut network = NetworkSpec::mnist().build()?;
    println!("\nNetwork architecture:\n{network}\n");

    let (tx, rx) = std::sync::mpsc::channel::<bpnn::EpochStats>();
    let mut config = TrainConfig::new(10, 32);
    config.progress_tx = Some(tx);

    let printer = std::thread::spawn(move || {
        println!("{:>6}  {:>10}  {:>10}  {:>10}", "Epoch", "CE Loss", "Train Acc", "Time");
        println!("{}", "─".repeat(44));
        for stats in rx {
            println!(
                "{:>6}  {:>10.6}  {:>9.2}%  {:>8}ms",
                stats.epoch,
                stats.train_loss,
                stats.train_accuracy.unwrap_or(0.0) * 100.0,
                stats.elapsed_ms
            );
        }
    });

    train_loop(&mut network, &train.images, &train_labels, None, &config)?;
    drop(config);
    let _ = printer.join();

    // --- Save model weights ---
    std::fs::create_dir_all("demos/trained_models")?;
    let model_path = "demos/trained_models/mnist.bin";
    if network.save_model(model_path) {
        println!("\nModel saved to {model_path}");
    }

    // --- Evaluate on test set ---
    let eval = evaluate(&mut network, &test.images, &test_labels)?;
    println!("  Correct: {}/{}", eval.correct, eval.total);
    println!("  Test accuracy: {:.2}%", eval.accuracy * 100.0);

    // --- Sample predictions ---
    println!("\nSample predictions (first 10 test images):");
    println!("{:>12}  {:>12}", "True Label", "Predicted");
    println!("{}", "-".repeat(27));
    for (image, label) in test.images.iter().zip(&test.labels).take(10) {
        println!("{:>12}  {:>12}", label, network.classify(image)?);
    }
    Ok(())
}
