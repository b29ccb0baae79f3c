//! Image preprocessing: decode, convert to grayscale, resize, and normalize
//! pixel values to [0, 1] so a picture can be fed to a trained network.
//!
//! Hand-drawn digits go through `preprocess_digit` instead, which reshapes
//! them the way MNIST digits were prepared: light strokes on black, the
//! digit fitted into a 20×20 box centred on a 28×28 canvas, lightly blurred.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};

/// Channel value above which a pixel counts as ink.
const INK_THRESHOLD: u8 = 50;
/// Blank border kept around the ink before squaring.
const CROP_MARGIN: u32 = 20;
/// Side of the box the digit is scaled into.
const DIGIT_SIDE: u32 = 20;
/// Side of the final canvas.
pub const DIGIT_CANVAS: u32 = 28;
const BLUR_SIGMA: f32 = 0.5;

use crate::data::DataError;

/// Decodes image bytes (PNG/JPEG/BMP/GIF), resizes to `width × height`,
/// converts to grayscale, and normalizes pixels to [0, 1].
///
/// Returns a flat row-major `Vec<f64>` of length `width * height`.
pub fn image_bytes_to_input(bytes: &[u8], width: u32, height: u32) -> Result<Vec<f64>, DataError> {
    let img = image::load_from_memory(bytes)?;
    Ok(to_grayscale_input(&img, width, height))
}

/// Same as `image_bytes_to_input`, reading the image from `path`.
pub fn image_to_input<P: AsRef<Path>>(path: P, width: u32, height: u32) -> Result<Vec<f64>, DataError> {
    let img = image::open(path.as_ref())?;
    Ok(to_grayscale_input(&img, width, height))
}

fn to_grayscale_input(img: &DynamicImage, width: u32, height: u32) -> Vec<f64> {
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);
    normalize(&resized.to_luma8())
}

/// Reads a hand-drawn digit from `path` and returns the 784 normalized
/// pixels of `preprocess_digit`.
pub fn digit_image_to_input<P: AsRef<Path>>(path: P) -> Result<Vec<f64>, DataError> {
    let img = image::open(path.as_ref())?;
    Ok(normalize(&preprocess_digit(&img)))
}

/// Same as `digit_image_to_input`, decoding `bytes`.
pub fn digit_bytes_to_input(bytes: &[u8]) -> Result<Vec<f64>, DataError> {
    let img = image::load_from_memory(bytes)?;
    Ok(normalize(&preprocess_digit(&img)))
}

/// Turns a picture of a light digit on a dark or transparent background into
/// a 28×28 MNIST-style image.
///
/// Pixels with alpha and some channel above the ink threshold keep their
/// brightest channel, all others go black. The ink bounding box plus a 20px
/// margin (clipped to the picture) is padded to a square of at least 20px,
/// scaled to 20×20, placed at offset (4, 4) of a black 28×28 canvas and
/// blurred with σ = 0.5. A picture without ink gives an all-black canvas.
pub fn preprocess_digit(img: &DynamicImage) -> GrayImage {
    let rgba = img.to_rgba8();
    let ink = GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let is_ink = a > INK_THRESHOLD
            && (r > INK_THRESHOLD || g > INK_THRESHOLD || b > INK_THRESHOLD);
        Luma([if is_ink { r.max(g).max(b) } else { 0 }])
    });

    let (min_x, min_y, max_x, max_y) = match ink_bounds(&ink) {
        Some(bounds) => bounds,
        None => return GrayImage::new(DIGIT_CANVAS, DIGIT_CANVAS),
    };

    let x0 = min_x.saturating_sub(CROP_MARGIN);
    let y0 = min_y.saturating_sub(CROP_MARGIN);
    let x1 = (max_x + 1 + CROP_MARGIN).min(ink.width());
    let y1 = (max_y + 1 + CROP_MARGIN).min(ink.height());
    let cropped = imageops::crop_imm(&ink, x0, y0, x1 - x0, y1 - y0).to_image();

    let side = cropped.width().max(cropped.height()).max(DIGIT_SIDE);
    let mut square = GrayImage::new(side, side);
    imageops::overlay(
        &mut square,
        &cropped,
        i64::from((side - cropped.width()) / 2),
        i64::from((side - cropped.height()) / 2),
    );

    let digit = imageops::resize(&square, DIGIT_SIDE, DIGIT_SIDE, FilterType::Triangle);
    let offset = i64::from((DIGIT_CANVAS - DIGIT_SIDE) / 2);
    let mut canvas = GrayImage::new(DIGIT_CANVAS, DIGIT_CANVAS);
    imageops::overlay(&mut canvas, &digit, offset, offset);

    imageops::blur(&canvas, BLUR_SIGMA)
}

/// Inclusive `(min_x, min_y, max_x, max_y)` of pixels above the ink threshold.
fn ink_bounds(img: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    img.enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] > INK_THRESHOLD)
        .fold(None, |bounds, (x, y, _)| match bounds {
            None => Some((x, y, x, y)),
            Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
        })
}

fn normalize(img: &GrayImage) -> Vec<f64> {
    img.pixels().map(|p| p.0[0] as f64 / 255.0).collect()
}

/// Confidence of a single-sigmoid binary classifier in whichever class it
/// picked: 0.5 at the decision boundary, 1.0 at either extreme.
pub fn confidence_from_output(raw: f64) -> f64 {
    (0.5 + (raw - 0.5).abs()).clamp(0.5, 1.0)
}
