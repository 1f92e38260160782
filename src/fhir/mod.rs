//! Clinical-record sink: best-effort pushes of FHIR resources.
//!
//! A push never fails the caller's primary operation. Whatever happens is
//! captured in a [`SinkOutcome`] and reported next to the primary result.

pub mod client;
pub mod resources;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::FhirClient;
pub use resources::{DocumentReference, Observation};

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Sink client error: {0}")]
    Client(String),

    #[error("Sink transport error: {0}")]
    Transport(String),

    #[error("Sink request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// An HTTP response from the sink, whatever its status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkResponse {
    pub status: u16,
    pub text: String,
}

/// Captured result of one push: `status` is `None` when no HTTP response was
/// received, in which case `text` holds the error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkOutcome {
    pub status: Option<u16>,
    pub text: String,
}

impl SinkOutcome {
    pub fn is_delivered(&self) -> bool {
        self.status.is_some_and(|s| (200..300).contains(&s))
    }
}

impl From<Result<SinkResponse, SinkError>> for SinkOutcome {
    fn from(result: Result<SinkResponse, SinkError>) -> Self {
        match result {
            Ok(resp) => Self {
                status: Some(resp.status),
                text: resp.text,
            },
            Err(e) => Self {
                status: None,
                text: e.to_string(),
            },
        }
    }
}
