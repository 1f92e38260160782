//! Image processing core: decoding, grayscale normalization, feature
//! extraction and enhancement.
//!
//! Every function here is a pure image-to-value transform. No I/O, no
//! network, no shared mutable state except the model session held by the
//! optional ONNX backend.

pub mod codec;
pub mod contours;
pub mod enhance;
pub mod features;
pub mod normalize;
pub mod threshold;
pub mod upscaler;

pub use codec::*;
pub use enhance::{
    EngineState, EnhanceError, EnhancementBackend, EnhancementEngine, SharpenFallback,
};
pub use features::{extract, FeatureSet};
pub use normalize::{normalize, NormalizedArray, DEFAULT_TARGET_SIZE};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Invalid target size {width}x{height}")]
    InvalidTargetSize { width: u32, height: u32 },
}
