//! Collaborators that turn files into the plain vectors the network consumes.

pub mod idx;
pub mod image;

use thiserror::Error;

pub use idx::{labels_to_one_hot, load_idx_pair, read_idx_images, read_idx_labels, Dataset, IdxImages};
pub use self::image::{
    confidence_from_output, digit_bytes_to_input, digit_image_to_input, image_bytes_to_input, image_to_input,
    preprocess_digit, DIGIT_CANVAS,
};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed IDX file: {0}")]
    Idx(String),

    #[error("label {label} at index {index} is out of range for {num_classes} classes")]
    LabelOutOfRange { index: usize, label: usize, num_classes: usize },

    #[error("cannot decode image: {0}")]
    Image(#[from] ::image::ImageError),
}
