//! Image normalization for OCR.
//!
//! Flyer scans arrive as grayscale, RGB, or RGBA and in wildly varying
//! quality. The pipeline is: normalize channels, grayscale, binarize (global
//! Otsu or local adaptive), median-denoise, then boost contrast and sharpen
//! for the small printed coupon text.

use image::{DynamicImage, GrayImage};
use imageproc::contrast::{adaptive_threshold, otsu_level, threshold, ThresholdType};
use imageproc::filter::{median_filter, sharpen3x3};

use crate::config::ThresholdMode;
use crate::error::PipelineError;

/// Neighborhood radius for adaptive thresholding, tuned for coupon text size.
const ADAPTIVE_BLOCK_RADIUS: u32 = 5;

/// Decodes raw bytes, rejecting anything whose declared content type is not
/// an image or whose bytes do not decode.
pub fn decode_image(bytes: &[u8], content_type: Option<&str>) -> Result<DynamicImage, PipelineError> {
    if let Some(ct) = content_type
        && !ct.trim().to_lowercase().starts_with("image")
    {
        return Err(PipelineError::NotAnImage(format!("content type {ct}")));
    }
    image::load_from_memory(bytes).map_err(|e| PipelineError::NotAnImage(e.to_string()))
}

/// Runs the full normalization pipeline on a decoded image.
pub fn prepare_for_ocr(img: &DynamicImage, mode: ThresholdMode, contrast: f32) -> GrayImage {
    // Round-tripping through RGB flattens any alpha channel and gives
    // grayscale sources the same path as color ones.
    let rgb = img.to_rgb8();
    let gray = DynamicImage::ImageRgb8(rgb).to_luma8();

    let binary = match mode {
        ThresholdMode::Otsu => {
            let level = otsu_level(&gray);
            threshold(&gray, level, ThresholdType::Binary)
        }
        ThresholdMode::Adaptive => adaptive_threshold(&gray, ADAPTIVE_BLOCK_RADIUS),
    };

    let denoised = median_filter(&binary, 1, 1);
    let boosted = boost_contrast(&denoised, contrast);
    sharpen3x3(&boosted)
}

/// Scales pixel values away from mid-gray by `factor`, clamped to 0-255.
fn boost_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        let v = pixel[0] as f32;
        let scaled = 128.0 + (v - 128.0) * factor;
        pixel[0] = scaled.clamp(0.0, 255.0) as u8;
    }
    out
}
