//! Binary model format.
//!
//! ```text
//! f64  learning rate
//! u32  loss tag          (0 = MSE, 1 = cross-entropy)
//! u32  optimizer tag     (0 = SGD, 1 = Adam)
//! u64  layer count
//! per layer:
//!   u32  activation tag  (0 = Sigmoid, 1 = ReLU, 2 = Softmax)
//!   u64  rows            (output size)
//!   u64  cols            (input size)
//!   f64  weights         rows × cols, row-major
//!   f64  biases          rows
//! ```
//!
//! All values are little-endian. There is no magic number or version field.
//! A layer with zero rows or columns is rejected; otherwise shapes are not
//! cross-checked, so a foreign stream either fails on an unknown tag or early
//! EOF, or loads layers that later fail with `DimensionMismatch`. Adam
//! moments are not stored.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, error, info};

use crate::{
    activation::activation::ActivationFunction,
    error::{NetworkError, Result},
    layers::dense::Layer,
    loss::loss_type::LossType,
    math::matrix::Matrix,
    network::network::{InputWidth, Network},
    optim::optimizer::{Optimizer, OptimizerType},
};

impl Network {
    /// Writes the network in the binary model format.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_f64(writer, self.learning_rate)?;
        write_u32(writer, self.loss.tag())?;
        write_u32(writer, self.optimizer.kind().tag())?;
        write_u64(writer, self.layers.len() as u64)?;

        for (idx, layer) in self.layers.iter().enumerate() {
            debug!(
                layer = idx,
                inputs = layer.input_size(),
                outputs = layer.output_size(),
                activation = ?layer.activation(),
                "writing layer"
            );
            write_u32(writer, layer.activation().tag())?;
            write_u64(writer, layer.output_size() as u64)?;
            write_u64(writer, layer.input_size() as u64)?;
            for w in layer.weights().values() {
                write_f64(writer, w)?;
            }
            for &b in layer.biases() {
                write_f64(writer, b)?;
            }
        }
        Ok(())
    }

    /// Replaces this network's layers, learning rate, loss and optimizer with
    /// the ones stored in `reader`. On error the network is left untouched.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        let learning_rate = read_f64(reader)?;
        let loss_tag = read_u32(reader)?;
        let loss = LossType::from_tag(loss_tag)
            .ok_or_else(|| NetworkError::Format(format!("unknown loss tag {loss_tag}")))?;
        let optimizer_tag = read_u32(reader)?;
        let optimizer = OptimizerType::from_tag(optimizer_tag)
            .ok_or_else(|| NetworkError::Format(format!("unknown optimizer tag {optimizer_tag}")))?;
        let layer_count = read_len(reader)?;

        let mut layers = Vec::new();
        for idx in 0..layer_count {
            let tag = read_u32(reader)?;
            let activation = ActivationFunction::from_tag(tag)
                .ok_or_else(|| NetworkError::Format(format!("layer {idx}: unknown activation tag {tag}")))?;
            let rows = read_len(reader)?;
            let cols = read_len(reader)?;
            if rows == 0 || cols == 0 {
                return Err(NetworkError::Format(format!("layer {idx}: empty shape {rows}x{cols}")));
            }
            debug!(layer = idx, inputs = cols, outputs = rows, activation = ?activation, "reading layer");

            let mut weights = Vec::new();
            for _ in 0..rows {
                let mut row = Vec::new();
                for _ in 0..cols {
                    row.push(read_f64(reader)?);
                }
                weights.push(row);
            }
            let mut biases = Vec::new();
            for _ in 0..rows {
                biases.push(read_f64(reader)?);
            }

            layers.push(Layer::from_parameters(Matrix::from_data(weights), biases, activation));
        }

        self.learning_rate = learning_rate;
        self.loss = loss;
        self.optimizer = Optimizer::from_type(optimizer);
        self.layers = layers;
        self.input = InputWidth::Fixed;
        Ok(())
    }

    /// Saves the model to `path`. Returns `false` if the file cannot be
    /// created or written; the cause is logged.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        let result = File::create(path)
            .map_err(NetworkError::from)
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                self.write_to(&mut writer)?;
                writer.flush()?;
                Ok(())
            });

        match result {
            Ok(()) => {
                info!(path = %path.display(), layers = self.layers.len(), "model saved");
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot save model");
                false
            }
        }
    }

    /// Loads a model from `path`, replacing this network's layers and
    /// settings. Returns `false` if the file cannot be opened or decoded; the
    /// network is then unchanged and the cause is logged.
    pub fn load_model<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = path.as_ref();
        let result = File::open(path)
            .map_err(NetworkError::from)
            .and_then(|file| self.read_from(&mut BufReader::new(file)));

        match result {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    layers = self.layers.len(),
                    learning_rate = self.learning_rate,
                    loss = ?self.loss,
                    optimizer = ?self.optimizer.kind(),
                    "model loaded"
                );
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot load model");
                false
            }
        }
    }
}

fn write_f64<W: Write>(writer: &mut W, value: f64) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_u64<W: Write>(writer: &mut W, value: u64) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn read_f64<R: Read>(reader: &mut R) -> Result<f64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_len<R: Read>(reader: &mut R) -> Result<usize> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    let value = u64::from_le_bytes(buf);
    usize::try_from(value)
        .map_err(|_| NetworkError::Format(format!("length {value} does not fit in memory")))
}
