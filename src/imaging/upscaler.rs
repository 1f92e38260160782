//! Loading of the super-resolution model backend from its weights file.

use super::enhance::{EnhanceError, EnhancementBackend};
use crate::config::{InferenceDevice, ModelSettings};

// ═══════════════════════════════════════════════════════════
// ONNX super-resolution: behind `super-resolution` feature
// ═══════════════════════════════════════════════════════════

#[cfg(feature = "super-resolution")]
mod onnx {
    use super::{EnhanceError, EnhancementBackend};
    use image::{DynamicImage, Rgb, RgbImage};
    use ort::session::Session;
    use std::path::Path;
    use std::sync::Mutex;

    /// RealESRGAN-style upscaler running on ONNX Runtime.
    ///
    /// Input and output are NCHW float RGB in [0, 1]; the output is `scale`
    /// times larger on each axis. The session sits behind a Mutex because
    /// `Session::run` needs `&mut self`.
    pub struct OnnxUpscaler {
        session: Mutex<Session>,
        scale: u32,
    }

    impl OnnxUpscaler {
        pub fn load(model_path: &Path, scale: u32) -> Result<Self, EnhanceError> {
            let session = Session::builder()
                .map_err(|e: ort::Error| EnhanceError::ModelUnavailable(e.to_string()))?
                .with_intra_threads(2)
                .map_err(|e: ort::Error| EnhanceError::ModelUnavailable(e.to_string()))?
                .commit_from_file(model_path)
                .map_err(|e: ort::Error| {
                    EnhanceError::ModelUnavailable(format!("ONNX load failed: {e}"))
                })?;

            Ok(Self {
                session: Mutex::new(session),
                scale,
            })
        }

        fn infer(&self, rgb: &RgbImage) -> Result<RgbImage, EnhanceError> {
            use ort::value::TensorRef;

            let (w, h) = rgb.dimensions();
            let input = ndarray::Array4::<f32>::from_shape_fn(
                (1, 3, h as usize, w as usize),
                |(_, c, y, x)| rgb.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0,
            );
            let tensor = TensorRef::from_array_view(&input)
                .map_err(|e| EnhanceError::Inference(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| EnhanceError::Inference("Session lock poisoned".to_string()))?;

            let outputs = session
                .run(ort::inputs![tensor])
                .map_err(|e| EnhanceError::Inference(format!("ONNX inference failed: {e}")))?;

            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| EnhanceError::Inference(format!("Output extraction: {e}")))?;

            // Output shape: [1, 3, h*scale, w*scale]
            let expected = [1, 3, (h * self.scale) as i64, (w * self.scale) as i64];
            if shape.len() != 4 || shape[..] != expected[..] {
                return Err(EnhanceError::Inference(format!(
                    "Unexpected output shape: {shape:?}, expected {expected:?}"
                )));
            }

            let (out_w, out_h) = (w * self.scale, h * self.scale);
            let plane = out_w as usize * out_h as usize;
            Ok(RgbImage::from_fn(out_w, out_h, |x, y| {
                let offset = y as usize * out_w as usize + x as usize;
                let channel = |c: usize| {
                    let v = data[c * plane + offset];
                    (v.clamp(0.0, 1.0) * 255.0).round() as u8
                };
                Rgb([channel(0), channel(1), channel(2)])
            }))
        }
    }

    impl EnhancementBackend for OnnxUpscaler {
        fn name(&self) -> &'static str {
            "realesrgan-onnx"
        }

        fn enhance(&self, image: &DynamicImage) -> Result<DynamicImage, EnhanceError> {
            let upscaled = self.infer(&image.to_rgb8())?;
            Ok(DynamicImage::ImageRgb8(upscaled))
        }
    }
}

#[cfg(feature = "super-resolution")]
pub use onnx::OnnxUpscaler;

/// Build the model backend described by `settings`.
pub fn load_model_backend(
    settings: &ModelSettings,
) -> Result<Box<dyn EnhancementBackend>, EnhanceError> {
    let path = &settings.weights_path;
    if !path.is_file() {
        return Err(EnhanceError::ModelUnavailable(format!(
            "weights not found at {}",
            path.display()
        )));
    }
    if settings.device == InferenceDevice::Cuda {
        tracing::warn!("CUDA requested for the enhancement model; running on the CPU provider");
    }

    #[cfg(feature = "super-resolution")]
    {
        let upscaler = onnx::OnnxUpscaler::load(path, settings.scale)?;
        Ok(Box::new(upscaler))
    }

    #[cfg(not(feature = "super-resolution"))]
    {
        Err(EnhanceError::ModelUnavailable(
            "built without the super-resolution feature".to_string(),
        ))
    }
}
