//! Byte-level image handling: validation, decoding, PNG encoding and
//! luminance conversion.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, RgbImage};

use super::ImagingError;

/// Maximum input image size (in bytes) before rejecting.
/// Prevents OOM on corrupt/adversarial uploads.
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Minimum valid image size in bytes (smallest valid PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Rejects empty, oversized or non-image input before decoding.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), ImagingError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ImagingError::Decode(
            "Image data too small to be valid".into(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImagingError::Decode(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Validate and decode uploaded bytes, converting to 8-bit RGB.
///
/// Both pipeline operations start from RGB regardless of the stored color
/// mode (palette, grayscale, 16-bit, alpha).
pub fn decode_rgb(bytes: &[u8]) -> Result<DynamicImage, ImagingError> {
    validate_image_bytes(bytes)?;
    let img = image::load_from_memory(bytes)
        .map_err(|e| ImagingError::Decode(e.to_string()))?;
    Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
}

/// Convert RGB image to grayscale using ITU-R BT.601 luminance.
///
/// 16-bit fixed point with rounding; the weights sum to exactly 65536 so
/// pure white stays 255.
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    let (w, h) = (rgb.width(), rgb.height());
    let mut gray = GrayImage::new(w, h);
    for (x, y, p) in rgb.enumerate_pixels() {
        let [r, g, b] = p.0;
        let luma = (r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16;
        gray.put_pixel(x, y, Luma([luma as u8]));
    }
    gray
}

/// Luminance of any decoded image. Already-gray images are copied as-is.
pub fn to_gray(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => rgb_to_gray(&other.to_rgb8()),
    }
}

/// Encode an image as PNG bytes, keeping its color mode (RGB or Luma).
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ImagingError> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ImagingError::Encode(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}
