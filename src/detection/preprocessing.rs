use image::{DynamicImage, GrayImage, RgbImage};
use imageproc::filter::gaussian_blur_f32;

use crate::error::RegionError;
use crate::models::BoundingBox;

/// Sigma matching a 3x3 Gaussian kernel
pub const OCR_BLUR_SIGMA: f32 = 0.8;

/// Convert image to grayscale
pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    DynamicImage::ImageRgb8(img.clone()).to_luma8()
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(img, sigma)
}

/// Cut the box out of the source image, clamped to its bounds
pub fn crop_region(img: &RgbImage, bbox: &BoundingBox) -> Result<RgbImage, RegionError> {
    let (x, y, width, height) = bbox.clamp_to(img.width(), img.height());

    if width == 0 || height == 0 {
        return Err(RegionError::InvalidRegion { width, height });
    }

    Ok(image::imageops::crop_imm(img, x, y, width, height).to_image())
}

/// Condition a plate crop for text recognition: luminance, light blur, back to RGB.
/// Output has the same dimensions as the input.
pub fn prepare_for_ocr(region: &RgbImage) -> Result<RgbImage, RegionError> {
    let (width, height) = region.dimensions();
    if width == 0 || height == 0 {
        return Err(RegionError::InvalidRegion { width, height });
    }

    let gray = to_grayscale(region);
    let blurred = apply_blur(&gray, OCR_BLUR_SIGMA);

    Ok(DynamicImage::ImageLuma8(blurred).to_rgb8())
}
