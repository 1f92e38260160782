//! Enhancement engine: optional super-resolution model with a deterministic
//! sharpening fallback.
//!
//! The backend is chosen once when the engine is built. After that the engine
//! is read-only and shared across requests through an `Arc`.

use image::{DynamicImage, GrayImage, Luma};
use serde::Serialize;
use thiserror::Error;

use super::codec::to_gray;
use super::upscaler::load_model_backend;
use crate::config::ModelSettings;

#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error("Enhancement model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Enhancement inference failed: {0}")]
    Inference(String),
}

/// An image-to-image enhancement capability.
pub trait EnhancementBackend: Send + Sync {
    /// Short identifier reported by the health endpoint.
    fn name(&self) -> &'static str;

    fn enhance(&self, image: &DynamicImage) -> Result<DynamicImage, EnhanceError>;
}

/// Which path `EnhancementEngine::enhance` takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    ModelReady,
    FallbackOnly,
}

// ═══════════════════════════════════════════════════════════
// Sharpening fallback
// ═══════════════════════════════════════════════════════════

/// Laplacian-style sharpening kernel, row-major.
pub const SHARPEN_KERNEL: [[i32; 3]; 3] = [[0, -1, 0], [-1, 5, -1], [0, -1, 0]];

/// Grayscale + 3×3 sharpening. Always succeeds, byte-for-byte reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct SharpenFallback;

impl EnhancementBackend for SharpenFallback {
    fn name(&self) -> &'static str {
        "sharpen"
    }

    fn enhance(&self, image: &DynamicImage) -> Result<DynamicImage, EnhanceError> {
        Ok(DynamicImage::ImageLuma8(sharpen(&to_gray(image))))
    }
}

/// Correlate with [`SHARPEN_KERNEL`], saturating to `u8`.
///
/// Borders are mirrored without repeating the edge pixel (`dcb|abcd|cba`).
pub fn sharpen(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mut out = GrayImage::new(w, h);

    for y in 0..h {
        for x in 0..w {
            let mut acc = 0i32;
            for (ky, row) in SHARPEN_KERNEL.iter().enumerate() {
                for (kx, &weight) in row.iter().enumerate() {
                    if weight == 0 {
                        continue;
                    }
                    let sx = reflect101(x as i64 + kx as i64 - 1, w);
                    let sy = reflect101(y as i64 + ky as i64 - 1, h);
                    acc += weight * gray.get_pixel(sx, sy).0[0] as i32;
                }
            }
            out.put_pixel(x, y, Luma([acc.clamp(0, 255) as u8]));
        }
    }

    out
}

fn reflect101(i: i64, len: u32) -> u32 {
    let n = len as i64;
    if n <= 1 {
        return 0;
    }
    let mut i = i;
    if i < 0 {
        i = -i;
    }
    if i >= n {
        i = 2 * (n - 1) - i;
    }
    i.clamp(0, n - 1) as u32
}

// ═══════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════

pub struct EnhancementEngine {
    model: Option<Box<dyn EnhancementBackend>>,
    fallback: SharpenFallback,
}

impl EnhancementEngine {
    pub fn new(model: Option<Box<dyn EnhancementBackend>>) -> Self {
        Self {
            model,
            fallback: SharpenFallback,
        }
    }

    pub fn fallback_only() -> Self {
        Self::new(None)
    }

    /// Try to load the model described by `settings`. Never fails: any load
    /// error is logged and the engine runs fallback-only.
    pub fn initialize(settings: &ModelSettings) -> Self {
        match load_model_backend(settings) {
            Ok(backend) => {
                tracing::info!(
                    backend = backend.name(),
                    path = %settings.weights_path.display(),
                    "Enhancement model loaded"
                );
                Self::new(Some(backend))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Enhancement model not loaded, using sharpening fallback"
                );
                Self::fallback_only()
            }
        }
    }

    pub fn state(&self) -> EngineState {
        if self.model.is_some() {
            EngineState::ModelReady
        } else {
            EngineState::FallbackOnly
        }
    }

    /// Name of the backend used when nothing fails.
    pub fn backend_name(&self) -> &'static str {
        match &self.model {
            Some(model) => model.name(),
            None => self.fallback.name(),
        }
    }

    /// Enhance one image. A model failure falls back for this call only.
    pub fn enhance(&self, image: &DynamicImage) -> DynamicImage {
        if let Some(model) = &self.model {
            match model.enhance(image) {
                Ok(enhanced) => return enhanced,
                Err(e) => {
                    tracing::warn!(
                        backend = model.name(),
                        error = %e,
                        "Model enhancement failed, falling back"
                    );
                }
            }
        }
        self.fallback_enhance(image)
    }

    fn fallback_enhance(&self, image: &DynamicImage) -> DynamicImage {
        DynamicImage::ImageLuma8(sharpen(&to_gray(image)))
    }
}
