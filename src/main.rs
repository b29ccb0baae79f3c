use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bpnn::data::{confidence_from_output, digit_image_to_input, image_to_input, load_idx_pair};
use bpnn::{
    evaluate, train_loop, ActivationFunction, EpochStats, LossType, Network, NetworkSpec, TrainConfig,
};

#[derive(Parser)]
#[command(name = "bpnn", version, about = "Train and run feedforward networks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a digit classifier on IDX image/label files and save it.
    MnistTrain {
        #[arg(long)]
        images: PathBuf,
        #[arg(long)]
        labels: PathBuf,
        /// Optional held-out set scored after every epoch.
        #[arg(long, requires = "test_labels")]
        test_images: Option<PathBuf>,
        #[arg(long, requires = "test_images")]
        test_labels: Option<PathBuf>,
        /// Architecture JSON; defaults to 784-128-64-10 with Adam.
        #[arg(long)]
        spec: Option<String>,
        /// Training config JSON; flags below override it.
        #[arg(long)]
        config: Option<String>,
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// Write per-epoch statistics as JSON.
        #[arg(long)]
        history: Option<PathBuf>,
        #[arg(long, short, default_value = "mnist_model.bin")]
        output: PathBuf,
    },
    /// Report loss and accuracy of a saved model on IDX files.
    MnistTest {
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        images: PathBuf,
        #[arg(long)]
        labels: PathBuf,
    },
    /// Classify an image file with a saved model.
    ///
    /// The picture is treated as a light digit on a dark background and
    /// reshaped to a 28x28 MNIST-style input unless `--raw` is given.
    PredictImage {
        #[arg(long)]
        model: PathBuf,
        image: PathBuf,
        /// Only grayscale and resize to `--width` x `--height`.
        #[arg(long)]
        raw: bool,
        #[arg(long, default_value_t = 28, requires = "raw")]
        width: u32,
        #[arg(long, default_value_t = 28, requires = "raw")]
        height: u32,
    },
    /// Train a 2-input binary classifier on a small built-in point set.
    TwoClass {
        #[arg(long, default_value_t = 6000)]
        epochs: usize,
        #[arg(long, default_value_t = 0.01)]
        learning_rate: f64,
        #[arg(long)]
        seed: Option<u64>,
        /// Points to classify after training, as `x,y`.
        #[arg(long = "point", value_parser = parse_point)]
        points: Vec<(f64, f64)>,
        #[arg(long)]
        save: Option<PathBuf>,
        /// Write the undecided grid points around the samples as JSON.
        #[arg(long)]
        boundary: Option<PathBuf>,
        #[arg(long, default_value_t = 100)]
        resolution: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::MnistTrain {
            images, labels, test_images, test_labels, spec, config,
            epochs, batch_size, seed, history, output,
        } => {
            let spec = match spec {
                Some(path) => NetworkSpec::load_json(&path)
                    .with_context(|| format!("reading network spec {path}"))?,
                None => NetworkSpec::mnist(),
            };
            let mut config = match config {
                Some(path) => TrainConfig::load_json(&path)
                    .with_context(|| format!("reading train config {path}"))?,
                None => TrainConfig::default(),
            };
            config.epochs = epochs.unwrap_or(config.epochs);
            config.batch_size = batch_size.unwrap_or(config.batch_size);
            config.seed = seed.or(config.seed);

            let train = load_idx_pair(&images, &labels).context("loading training set")?;
            let num_classes = spec.layers.last().map_or(10, |l| l.units);
            let train_targets = train.one_hot_labels(num_classes)?;
            let validation = match (test_images, test_labels) {
                (Some(i), Some(l)) => {
                    let test = load_idx_pair(&i, &l).context("loading test set")?;
                    let targets = test.one_hot_labels(num_classes)?;
                    Some((test.images, targets))
                }
                _ => None,
            };

            let mut network = spec.build()?;
            info!("network built:\n{network}");

            let (tx, rx) = std::sync::mpsc::channel::<EpochStats>();
            config.progress_tx = Some(tx);
            let reporter = std::thread::spawn(move || {
                let mut all = Vec::new();
                for stats in rx {
                    println!(
                        "epoch {}/{}: loss {:.5}{}{} [{} ms]",
                        stats.epoch,
                        stats.total_epochs,
                        stats.train_loss,
                        stats.train_accuracy.map(|a| format!(", acc {:.2}%", a * 100.0)).unwrap_or_default(),
                        stats.val_accuracy.map(|a| format!(", val acc {:.2}%", a * 100.0)).unwrap_or_default(),
                        stats.elapsed_ms,
                    );
                    all.push(stats);
                }
                all
            });

            let result = train_loop(
                &mut network,
                &train.images,
                &train_targets,
                validation.as_ref().map(|(i, l)| (i.as_slice(), l.as_slice())),
                &config,
            );
            drop(config);
            let all_stats = reporter.join().map_err(|_| anyhow::anyhow!("progress reporter panicked"))?;
            result?;

            if let Some(path) = history {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                serde_json::to_writer_pretty(std::io::BufWriter::new(file), &all_stats)?;
            }
            if !network.save_model(&output) {
                bail!("could not save model to {}", output.display());
            }
            println!("model saved to {}", output.display());
        }

        Command::MnistTest { model, images, labels } => {
            let mut network = load_network(&model)?;
            let num_classes = network.layers().last().map_or(10, |l| l.output_size());
            let test = load_idx_pair(&images, &labels).context("loading test set")?;
            let targets = test.one_hot_labels(num_classes)?;
            let eval = evaluate(&mut network, &test.images, &targets)?;
            println!("correct predictions: {}/{}", eval.correct, eval.total);
            println!("accuracy: {:.4}%", eval.accuracy * 100.0);
            println!("mean loss: {:.6}", eval.loss);
        }

        Command::PredictImage { model, image, raw, width, height } => {
            let mut network = load_network(&model)?;
            let input = if raw {
                image_to_input(&image, width, height)
            } else {
                digit_image_to_input(&image)
            }
            .with_context(|| format!("reading {}", image.display()))?;
            let output = network.predict(&input)?;
            let class = network.classify(&input)?;
            println!("predicted class: {class} (p = {:.4})", output[class]);
            for (i, p) in output.iter().enumerate() {
                println!("  {i}: {p:.4}");
            }
        }

        Command::TwoClass { epochs, learning_rate, seed, points, save, boundary, resolution } => {
            let (inputs, targets) = two_class_points();
            let mut network = match seed {
                Some(seed) => Network::with_seed(learning_rate, LossType::Mse, seed),
                None => Network::new(learning_rate, LossType::Mse),
            };
            network.add_layer(3, ActivationFunction::Sigmoid)?;
            network.add_layer(1, ActivationFunction::Sigmoid)?;

            for epoch in 1..=epochs {
                let loss = network.train_batch(&inputs, &targets)?;
                if epoch % 200 == 0 {
                    info!(epoch, loss, "training");
                }
            }

            for (x, y) in points {
                let raw = network.predict(&[x, y])?[0];
                let class = if raw > 0.5 { "B" } else { "A" };
                println!(
                    "({x}, {y}) -> class {class}, confidence {:.1}%",
                    confidence_from_output(raw) * 100.0
                );
            }
            if let Some(path) = boundary {
                let (x_range, y_range) = padded_bounds(&inputs, 0.1);
                let grid = network.decision_boundary(x_range, y_range, resolution)?;
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                serde_json::to_writer_pretty(std::io::BufWriter::new(file), &grid)?;
                info!(points = grid.len(), path = %path.display(), "decision boundary written");
            }
            if let Some(path) = save {
                if !network.save_model(&path) {
                    bail!("could not save model to {}", path.display());
                }
            }
        }
    }

    Ok(())
}

fn load_network(path: &Path) -> Result<Network> {
    let mut network = Network::new(0.001, LossType::CrossEntropy);
    if !network.load_model(path) {
        bail!("could not load model from {}", path.display());
    }
    Ok(network)
}

/// Class A (target 0) and class B (target 1) samples.
fn two_class_points() -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let a = [
        (1.24, 1.27), (1.36, 1.74), (1.38, 1.64), (1.38, 1.82), (1.38, 1.90),
        (1.40, 1.70), (1.48, 1.82), (1.54, 1.82), (1.56, 2.08),
    ];
    let b = [(1.14, 1.82), (1.18, 1.96), (1.20, 1.86), (1.26, 2.00), (1.28, 2.00), (1.30, 1.96)];

    let inputs = a.iter().chain(b.iter()).map(|&(x, y)| vec![x, y]).collect();
    let targets = std::iter::repeat(vec![0.0]).take(a.len())
        .chain(std::iter::repeat(vec![1.0]).take(b.len()))
        .collect();
    (inputs, targets)
}

/// Bounding box of 2-D samples, widened by `pad` on every side.
fn padded_bounds(points: &[Vec<f64>], pad: f64) -> ((f64, f64), (f64, f64)) {
    let (mut x, mut y) = ((f64::INFINITY, f64::NEG_INFINITY), (f64::INFINITY, f64::NEG_INFINITY));
    for p in points {
        x = (x.0.min(p[0]), x.1.max(p[0]));
        y = (y.0.min(p[1]), y.1.max(p[1]));
    }
    ((x.0 - pad, x.1 + pad), (y.0 - pad, y.1 + pad))
}

fn parse_point(s: &str) -> std::result::Result<(f64, f64), String> {
    let (x, y) = s.split_once(',').ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
    let x = x.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let y = y.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok((x, y))
}
