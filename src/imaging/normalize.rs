//! Grayscale normalization: any decoded image → fixed-size luminance array
//! with values in [0, 1].

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};

use super::codec::to_gray;
use super::ImagingError;

/// Working resolution of the feature extractor.
pub const DEFAULT_TARGET_SIZE: (u32, u32) = (256, 256);

/// Single-channel float matrix, row-major, every value in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedArray {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl NormalizedArray {
    /// Scale an 8-bit gray image into [0, 1].
    pub fn from_gray(gray: &GrayImage) -> Self {
        let data = gray.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
        Self {
            width: gray.width(),
            height: gray.height(),
            data,
        }
    }

    /// Build from raw values, clamping into [0, 1]. NaN becomes 0.
    ///
    /// Returns `None` when `data.len() != width * height`.
    pub fn from_values(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        let data = data
            .into_iter()
            .map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) })
            .collect();
        Some(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Values rescaled to 8 bits (truncating), as thresholding expects.
    pub fn to_u8(&self) -> Vec<u8> {
        self.data.iter().map(|&v| (v * 255.0) as u8).collect()
    }
}

/// Convert to luminance, resize to `target_size` and scale into [0, 1].
///
/// Resampling uses a fixed Catmull-Rom (bicubic) filter, so the output is a
/// deterministic function of the input image and target size.
pub fn normalize(
    image: &DynamicImage,
    target_size: (u32, u32),
) -> Result<NormalizedArray, ImagingError> {
    let (width, height) = target_size;
    if width == 0 || height == 0 {
        return Err(ImagingError::InvalidTargetSize { width, height });
    }

    let gray = to_gray(image);
    let resized = if gray.dimensions() == target_size {
        gray
    } else {
        image::imageops::resize(&gray, width, height, FilterType::CatmullRom)
    };

    Ok(NormalizedArray::from_gray(&resized))
}
