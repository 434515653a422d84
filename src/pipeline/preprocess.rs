//! Image preprocessing: decode, fit to a bounding box, stretch contrast.
//!
//! Phone photos of a timetable pinned to a wall arrive at 12 MP with a grey
//! cast. Both consumers do better with a smaller, full-range image: vision APIs
//! bill and tile by pixel count, and Tesseract's binarisation needs contrast.
//!
//! Decoding and resizing are CPU-bound, so [`preprocess`] runs them on the
//! blocking pool.

use crate::error::ExtractError;
use crate::pipeline::encode::encode_png;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use tracing::debug;

/// A preprocessed image, PNG-encoded.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
}

/// Decode, downscale and normalise an uploaded image.
pub async fn preprocess(bytes: Vec<u8>, max_dimension: u32) -> Result<ProcessedImage, ExtractError> {
    tokio::task::spawn_blocking(move || preprocess_blocking(&bytes, max_dimension))
        .await
        .map_err(|e| ExtractError::Internal(format!("Image task panicked: {}", e)))?
}

fn preprocess_blocking(bytes: &[u8], max_dimension: u32) -> Result<ProcessedImage, ExtractError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ExtractError::ImageProcessing(format!("could not decode image: {e}")))?;
    let (original_width, original_height) = (img.width(), img.height());
    if original_width == 0 || original_height == 0 {
        return Err(ExtractError::ImageProcessing("image has no pixels".into()));
    }

    let fitted = fit_within(img, max_dimension);
    let normalised = stretch_contrast(&flatten_on_white(&fitted));
    let png = encode_png(&normalised)
        .map_err(|e| ExtractError::ImageProcessing(format!("could not encode image: {e}")))?;

    debug!(
        "Preprocessed image {}x{} → {}x{}",
        original_width,
        original_height,
        normalised.width(),
        normalised.height()
    );

    Ok(ProcessedImage {
        width: normalised.width(),
        height: normalised.height(),
        png,
        original_width,
        original_height,
    })
}

/// Downscale so both edges fit in `max_dimension`, preserving aspect ratio.
/// Never upscales.
pub fn fit_within(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    if img.width() <= max_dimension && img.height() <= max_dimension {
        return img;
    }
    // CatmullRom: sharp text edges without Lanczos ringing.
    img.resize(max_dimension, max_dimension, FilterType::CatmullRom)
}

/// Composite any transparency onto white and drop the alpha channel.
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Linear contrast stretch so the darkest luma maps to 0 and the brightest to 255.
pub fn stretch_contrast(img: &RgbImage) -> DynamicImage {
    let (lo, hi) = img.pixels().fold((u8::MAX, u8::MIN), |(lo, hi), p| {
        let l = luma(p);
        (lo.min(l), hi.max(l))
    });

    if hi <= lo || (lo == 0 && hi == u8::MAX) {
        return DynamicImage::ImageRgb8(img.clone());
    }

    let scale = 255.0 / f32::from(hi - lo);
    let offset = f32::from(lo);
    let mut out = img.clone();
    for p in out.pixels_mut() {
        for c in p.0.iter_mut() {
            *c = ((f32::from(*c) - offset) * scale).round().clamp(0.0, 255.0) as u8;
        }
    }
    DynamicImage::ImageRgb8(out)
}

fn luma(p: &Rgb<u8>) -> u8 {
    let [r, g, b] = p.0;
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8
}
