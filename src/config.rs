use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Stroke EHR Imaging Service";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default location of the super-resolution weights (ONNX export of RealESRGAN x2plus).
pub const DEFAULT_MODEL_PATH: &str = "/app/assets/RealESRGAN_x2plus.onnx";

/// Default FHIR server base URL.
pub const DEFAULT_FHIR_BASE: &str = "http://localhost:8080/fhir";

/// Default bound on a single sink push (connect + response).
pub const DEFAULT_SINK_TIMEOUT_SECS: u64 = 10;

/// Upscale factor of the bundled super-resolution model.
pub const MODEL_SCALE: u32 = 2;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "stroke_ehr_lib=info,stroke_ehr=info,tower_http=warn"
}

/// Inference device requested for the enhancement model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceDevice {
    Cpu,
    Cuda,
}

impl InferenceDevice {
    /// Parse the `DEVICE` value. Unknown values select the CPU.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "cuda" | "gpu" => Self::Cuda,
            _ => Self::Cpu,
        }
    }
}

/// Enhancement model settings.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub weights_path: PathBuf,
    pub device: InferenceDevice,
    pub scale: u32,
}

/// Clinical-record sink (FHIR server) settings.
#[derive(Debug, Clone)]
pub struct SinkSettings {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub model: ModelSettings,
    pub sink: SinkSettings,
    /// Directory receiving generated note copies.
    pub note_output_dir: PathBuf,
    /// Directory holding `ehr_data.csv`, `clinical_notes.csv` and `images/`.
    pub data_dir: PathBuf,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("BIND_ADDR")
            .and_then(|raw| match raw.parse::<SocketAddr>() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!(value = %raw, error = %e, "Invalid BIND_ADDR, using default");
                    None
                }
            })
            .unwrap_or_else(default_bind_addr);

        let timeout_secs = get("SINK_TIMEOUT_SECS")
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_SINK_TIMEOUT_SECS);

        Self {
            bind_addr,
            model: ModelSettings {
                weights_path: get("REALESRGAN_WEIGHTS")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                device: get("DEVICE")
                    .map(|d| InferenceDevice::parse(&d))
                    .unwrap_or(InferenceDevice::Cpu),
                scale: MODEL_SCALE,
            },
            sink: SinkSettings {
                base_url: get("FHIR_BASE").unwrap_or_else(|| DEFAULT_FHIR_BASE.to_string()),
                bearer_token: get("FHIR_TOKEN"),
                timeout: Duration::from_secs(timeout_secs),
            },
            note_output_dir: get("NOTE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("outputs")),
            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
        }
    }
}

/// All interfaces, port 8000.
fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}
