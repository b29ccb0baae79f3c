use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};

use serde::{Serialize, Deserialize};

use crate::train::epoch_stats::EpochStats;

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`               : total number of full passes over the training data
/// - `batch_size`           : samples per `Network::train_batch` call
/// - `shuffle`              : reshuffle sample order at the start of every epoch
/// - `seed`                 : seed for the shuffle; entropy when absent
/// - `accuracy_sample_limit`: score training accuracy on at most this many
///                             samples (all when absent)
/// - `progress_tx`          : optional channel sender; one `EpochStats` is sent
///                             per completed epoch. If the receiver is dropped the
///                             loop stops early.
/// - `stop_flag`            : optional atomic flag; when set to `true` from another
///                             thread the loop stops after the current epoch.
///
/// The last two are runtime-only and never (de)serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
    pub accuracy_sample_limit: Option<usize>,
    #[serde(skip)]
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
    #[serde(skip)]
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl TrainConfig {
    /// Creates a minimal `TrainConfig` with no progress channel and no stop flag.
    pub fn new(epochs: usize, batch_size: usize) -> Self {
        TrainConfig {
            epochs,
            batch_size,
            ..TrainConfig::default()
        }
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes a `TrainConfig` from a JSON file; missing fields take
    /// their defaults.
    pub fn load_json(path: &str) -> std::io::Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 10,
            batch_size: 32,
            shuffle: true,
            seed: None,
            accuracy_sample_limit: Some(1000),
            progress_tx: None,
            stop_flag: None,
        }
    }
}
