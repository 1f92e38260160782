//! Request-level orchestration of the image pipeline.

pub mod orchestrator;

pub use orchestrator::{EnhanceOutcome, FeatureOutcome, NoteOutcome, Orchestrator};

use crate::imaging::ImagingError;

/// Errors that fail a pipeline request. Side-effect failures never appear
/// here; they are captured in the outcome values.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid image: {0}")]
    Decode(ImagingError),

    #[error("Image processing failed: {0}")]
    Processing(ImagingError),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

impl From<ImagingError> for PipelineError {
    fn from(e: ImagingError) -> Self {
        match e {
            ImagingError::Decode(_) => Self::Decode(e),
            other => Self::Processing(other),
        }
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Worker(e.to_string())
    }
}
