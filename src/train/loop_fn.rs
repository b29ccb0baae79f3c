use std::sync::atomic::Ordering;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::error::{NetworkError, Result};
use crate::loss::loss_type::LossType;
use crate::network::network::{argmax, Network};
use crate::train::epoch_stats::{EpochStats, Evaluation};
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Trains `network` for `config.epochs` epochs and returns the training loss
/// of the **last completed epoch** (0.0 if no epoch completed).
///
/// Each epoch optionally reshuffles the sample order, then feeds it to
/// `Network::train_batch` in chunks of `config.batch_size`. Within a chunk
/// the network still updates once per sample.
///
/// # Arguments
/// - `network`     : mutable reference to the network; modified in place
/// - `train_inputs`: training samples
/// - `train_labels`: corresponding targets, same length as `train_inputs`
/// - `validation`  : optional `(inputs, labels)` scored after every epoch
/// - `config`      : hyperparameters, optional progress channel, optional stop flag
///
/// # Early termination
/// The loop breaks early if the `progress_tx` receiver has been dropped or
/// `config.stop_flag` is set.
pub fn train_loop(
    network: &mut Network,
    train_inputs: &[Vec<f64>],
    train_labels: &[Vec<f64>],
    validation: Option<(&[Vec<f64>], &[Vec<f64>])>,
    config: &TrainConfig,
) -> Result<f64> {
    if train_inputs.is_empty() {
        return Err(NetworkError::InvalidConfiguration("no training samples".to_owned()));
    }
    if train_inputs.len() != train_labels.len() {
        return Err(NetworkError::InvalidConfiguration(format!(
            "{} training inputs but {} labels",
            train_inputs.len(),
            train_labels.len()
        )));
    }
    if config.batch_size == 0 {
        return Err(NetworkError::InvalidConfiguration("batch_size must be at least 1".to_owned()));
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut indices: Vec<usize> = (0..train_inputs.len()).collect();
    let mut last_train_loss = 0.0;

    info!(
        samples = train_inputs.len(),
        epochs = config.epochs,
        batch_size = config.batch_size,
        "starting training"
    );

    for epoch in 1..=config.epochs {
        if stop_requested(config) {
            break;
        }

        let t_start = Instant::now();

        if config.shuffle {
            indices.shuffle(&mut rng);
        }
        let train_loss = run_one_epoch(network, train_inputs, train_labels, &indices, config.batch_size)?;
        last_train_loss = train_loss;

        let is_classifier = network.loss_type() == LossType::CrossEntropy;

        let train_accuracy = if is_classifier {
            let limit = config.accuracy_sample_limit.unwrap_or(train_inputs.len());
            let n = limit.min(train_inputs.len());
            Some(evaluate(network, &train_inputs[..n], &train_labels[..n])?.accuracy)
        } else {
            None
        };

        let (val_loss, val_accuracy) = match validation {
            Some((vi, vl)) => {
                let eval = evaluate(network, vi, vl)?;
                (Some(eval.loss), is_classifier.then_some(eval.accuracy))
            }
            None => (None, None),
        };

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            val_loss,
            train_accuracy,
            val_accuracy,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        debug!(?stats, "epoch finished");

        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(stats).is_err() {
                break;
            }
        }
    }

    Ok(last_train_loss)
}

/// Mean loss and argmax accuracy over a labelled set, without training.
pub fn evaluate(network: &mut Network, inputs: &[Vec<f64>], labels: &[Vec<f64>]) -> Result<Evaluation> {
    if inputs.len() != labels.len() {
        return Err(NetworkError::InvalidConfiguration(format!(
            "{} inputs but {} labels",
            inputs.len(),
            labels.len()
        )));
    }
    let total = inputs.len();
    if total == 0 {
        return Ok(Evaluation { loss: 0.0, accuracy: 0.0, correct: 0, total: 0 });
    }

    let mut loss = 0.0;
    let mut correct = 0;
    for (input, label) in inputs.iter().zip(labels) {
        let output = network.predict(input)?;
        loss += network.calculate_loss(&output, label);
        if argmax(&output) == argmax(label) {
            correct += 1;
        }
    }

    Ok(Evaluation {
        loss: loss / total as f64,
        accuracy: correct as f64 / total as f64,
        correct,
        total,
    })
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Runs one pass over the data in `order`. Returns the mean batch loss.
fn run_one_epoch(
    network: &mut Network,
    inputs: &[Vec<f64>],
    labels: &[Vec<f64>],
    order: &[usize],
    batch_size: usize,
) -> Result<f64> {
    let mut total_loss = 0.0;
    let mut batches = 0;

    for chunk in order.chunks(batch_size) {
        let batch_inputs: Vec<Vec<f64>> = chunk.iter().map(|&i| inputs[i].clone()).collect();
        let batch_labels: Vec<Vec<f64>> = chunk.iter().map(|&i| labels[i].clone()).collect();
        total_loss += network.train_batch(&batch_inputs, &batch_labels)?;
        batches += 1;
    }

    Ok(total_loss / batches as f64)
}

fn stop_requested(config: &TrainConfig) -> bool {
    config.stop_flag.as_ref().map_or(false, |flag| flag.load(Ordering::Relaxed))
}
