//! Image pipeline orchestrator.
//!
//! Each operation computes its primary result first, then runs its side
//! effects (sink push, local note copy). Side effects are captured as values
//! and never turn a computed result into an error. CPU-bound work runs on the
//! blocking thread pool.

use std::path::PathBuf;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use indexmap::IndexMap;

use super::PipelineError;
use crate::fhir::{FhirClient, SinkOutcome};
use crate::imaging::{
    decode_rgb, encode_png, extract, normalize, EnhancementEngine, FeatureSet,
    DEFAULT_TARGET_SIZE,
};
use crate::notes::{self, LocalWriteOutcome, NOTE_ATTACHMENT_TITLE};

/// Observation label for extracted features.
pub const FEATURE_OBSERVATION_LABEL: &str = "Automated Image Features";

/// Attachment name used when the upload carried no filename.
pub const DEFAULT_UPLOAD_NAME: &str = "upload.png";

const PNG_MIME: &str = "image/png";
const NOTE_MIME: &str = "text/plain";

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EnhanceOutcome {
    pub filename: String,
    /// PNG bytes of the enhanced image.
    pub png: Vec<u8>,
    pub sink: SinkOutcome,
}

impl EnhanceOutcome {
    pub fn png_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }
}

#[derive(Debug, Clone)]
pub struct FeatureOutcome {
    pub features: FeatureSet,
    pub sink: SinkOutcome,
}

#[derive(Debug, Clone)]
pub struct NoteOutcome {
    pub note: String,
    pub local: LocalWriteOutcome,
    pub sink: SinkOutcome,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    engine: Arc<EnhancementEngine>,
    sink: FhirClient,
    note_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(engine: Arc<EnhancementEngine>, sink: FhirClient, note_dir: PathBuf) -> Self {
        Self {
            engine,
            sink,
            note_dir,
        }
    }

    pub fn engine(&self) -> &EnhancementEngine {
        &self.engine
    }

    /// Decode → enhance → PNG, then push the PNG as a DocumentReference.
    ///
    /// Undecodable input fails before any push is attempted.
    pub async fn enhance(
        &self,
        patient_id: &str,
        filename: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<EnhanceOutcome, PipelineError> {
        let filename = filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_UPLOAD_NAME)
            .to_string();

        let engine = Arc::clone(&self.engine);
        let png = tokio::task::spawn_blocking(move || {
            let image = decode_rgb(&bytes)?;
            let enhanced = engine.enhance(&image);
            encode_png(&enhanced)
        })
        .await??;

        tracing::info!(patient_id, filename = %filename, bytes = png.len(), "Image enhanced");

        let sink = SinkOutcome::from(
            self.sink
                .push_document_reference(patient_id, &png, &filename, PNG_MIME)
                .await,
        );
        log_sink_outcome("DocumentReference", patient_id, &sink);

        Ok(EnhanceOutcome {
            filename,
            png,
            sink,
        })
    }

    /// Decode → normalize → extract, then push the features as an Observation.
    pub async fn extract_features(
        &self,
        patient_id: &str,
        bytes: Vec<u8>,
    ) -> Result<FeatureOutcome, PipelineError> {
        let features = tokio::task::spawn_blocking(move || {
            let image = decode_rgb(&bytes)?;
            let array = normalize(&image, DEFAULT_TARGET_SIZE)?;
            Ok::<_, PipelineError>(extract(&array))
        })
        .await??;

        tracing::info!(patient_id, ?features, "Features extracted");

        let sink = SinkOutcome::from(
            self.sink
                .push_observation(patient_id, FEATURE_OBSERVATION_LABEL, &features.entries())
                .await,
        );
        log_sink_outcome("Observation", patient_id, &sink);

        Ok(FeatureOutcome { features, sink })
    }

    /// Render the note, keep a local copy, then push it as a DocumentReference.
    pub async fn generate_note(
        &self,
        patient_id: &str,
        features: &IndexMap<String, f64>,
        free_text: Option<&str>,
    ) -> NoteOutcome {
        let note = notes::generate_clinical_note(patient_id, features, free_text);
        let local = notes::save_note_locally(&self.note_dir, patient_id, &note);

        let sink = SinkOutcome::from(
            self.sink
                .push_document_reference(
                    patient_id,
                    note.as_bytes(),
                    NOTE_ATTACHMENT_TITLE,
                    NOTE_MIME,
                )
                .await,
        );
        log_sink_outcome("DocumentReference", patient_id, &sink);

        NoteOutcome { note, local, sink }
    }
}

fn log_sink_outcome(resource_type: &str, patient_id: &str, outcome: &SinkOutcome) {
    match outcome.status {
        Some(status) if outcome.is_delivered() => {
            tracing::info!(resource_type, patient_id, status, "Pushed to clinical-record sink");
        }
        Some(status) => {
            tracing::warn!(resource_type, patient_id, status, "Clinical-record sink rejected push");
        }
        None => {
            tracing::warn!(
                resource_type,
                patient_id,
                error = %outcome.text,
                "Clinical-record sink unreachable"
            );
        }
    }
}
