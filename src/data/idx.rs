//! IDX binary files as used by MNIST and its derivatives (Fashion-MNIST,
//! EMNIST, …).
//!
//! # IDX3 image file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x03        (number of dimensions = 3)
//! bytes  4-7:   N           (number of images, big-endian u32)
//! bytes  8-11:  rows        (image height in pixels, big-endian u32)
//! bytes 12-15:  cols        (image width in pixels, big-endian u32)
//! bytes 16..:   N * rows * cols bytes, row-major, uint8
//! ```
//!
//! # IDX1 label file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x01        (number of dimensions = 1)
//! bytes  4-7:   N           (number of labels, big-endian u32)
//! bytes  8..:   N bytes, each a class index
//! ```

use std::path::Path;

use tracing::info;

use crate::data::DataError;

/// Decoded IDX3 image set. Pixels are normalized to [0.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct IdxImages {
    pub rows: usize,
    pub cols: usize,
    pub images: Vec<Vec<f64>>,
}

/// Images plus their class labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub rows: usize,
    pub cols: usize,
    pub images: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Labels as one-hot target vectors.
    pub fn one_hot_labels(&self, num_classes: usize) -> Result<Vec<Vec<f64>>, DataError> {
        labels_to_one_hot(&self.labels, num_classes)
    }
}

/// Parses an IDX3 image file.
pub fn read_idx_images(bytes: &[u8]) -> Result<IdxImages, DataError> {
    check_header(bytes, 16, 3, "image")?;

    let n_items = be_u32(bytes, 4) as usize;
    let rows = be_u32(bytes, 8) as usize;
    let cols = be_u32(bytes, 12) as usize;

    let n_pixels = rows.checked_mul(cols).ok_or_else(|| {
        DataError::Idx(format!("image file: rows * cols overflows (rows={rows}, cols={cols})"))
    })?;
    let data_len = n_items.checked_mul(n_pixels).ok_or_else(|| {
        DataError::Idx(format!(
            "image file: n_items * n_pixels overflows (n_items={n_items}, n_pixels={n_pixels})"
        ))
    })?;

    if bytes.len() - 16 < data_len {
        return Err(DataError::Idx(format!(
            "image file too short: header declares {n_items} items of {rows}×{cols} pixels \
             ({data_len} data bytes needed after header), but file is only {} bytes total",
            bytes.len()
        )));
    }

    let images = if n_pixels == 0 {
        vec![Vec::new(); n_items]
    } else {
        bytes[16..16 + data_len]
            .chunks_exact(n_pixels)
            .map(|chunk| chunk.iter().map(|&px| px as f64 / 255.0).collect())
            .collect()
    };

    Ok(IdxImages { rows, cols, images })
}

/// Parses an IDX1 label file.
pub fn read_idx_labels(bytes: &[u8]) -> Result<Vec<u8>, DataError> {
    check_header(bytes, 8, 1, "label")?;

    let n_items = be_u32(bytes, 4) as usize;
    if bytes.len() - 8 < n_items {
        return Err(DataError::Idx(format!(
            "label file too short: header declares {n_items} labels but file is only {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes[8..8 + n_items].to_vec())
}

/// Reads an image file and a label file and pairs them up.
pub fn load_idx_pair<P: AsRef<Path>, Q: AsRef<Path>>(images: P, labels: Q) -> Result<Dataset, DataError> {
    let image_bytes = std::fs::read(images.as_ref())?;
    let label_bytes = std::fs::read(labels.as_ref())?;

    let decoded = read_idx_images(&image_bytes)?;
    let labels = read_idx_labels(&label_bytes)?;
    if decoded.images.len() != labels.len() {
        return Err(DataError::Idx(format!(
            "image file declares {} items but label file declares {}",
            decoded.images.len(),
            labels.len()
        )));
    }

    info!(
        images = decoded.images.len(),
        rows = decoded.rows,
        cols = decoded.cols,
        "loaded IDX dataset"
    );
    Ok(Dataset {
        rows: decoded.rows,
        cols: decoded.cols,
        images: decoded.images,
        labels,
    })
}

/// Encodes class indices as one-hot vectors of length `num_classes`.
pub fn labels_to_one_hot<L: Copy + Into<usize>>(labels: &[L], num_classes: usize) -> Result<Vec<Vec<f64>>, DataError> {
    labels.iter()
        .enumerate()
        .map(|(i, &label)| {
            let class: usize = label.into();
            if class >= num_classes {
                return Err(DataError::LabelOutOfRange { index: i, label: class, num_classes });
            }
            let mut one_hot = vec![0.0; num_classes];
            one_hot[class] = 1.0;
            Ok(one_hot)
        })
        .collect()
}

fn check_header(bytes: &[u8], header_len: usize, dims: u8, kind: &str) -> Result<(), DataError> {
    if bytes.len() < header_len {
        return Err(DataError::Idx(format!(
            "{kind} file too short: expected at least {header_len} header bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[0] != 0x00 || bytes[1] != 0x00 {
        return Err(DataError::Idx(format!(
            "{kind} file: bytes 0-1 must be 0x00 0x00 (reserved), got 0x{:02X} 0x{:02X}",
            bytes[0], bytes[1]
        )));
    }
    if bytes[2] != 0x08 {
        return Err(DataError::Idx(format!(
            "{kind} file: byte 2 (dtype) must be 0x08 (uint8), got 0x{:02X}",
            bytes[2]
        )));
    }
    if bytes[3] != dims {
        return Err(DataError::Idx(format!(
            "{kind} file: byte 3 (dimensions) must be {dims}, got {}",
            bytes[3]
        )));
    }
    Ok(())
}

fn be_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
