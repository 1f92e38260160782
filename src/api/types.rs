//! Shared types for the HTTP layer.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::api::error::ApiError;
use crate::pipeline::Orchestrator;

/// FHIR resource id grammar.
static PATIENT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-.]{1,64}$").expect("valid regex"));

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    pub orchestrator: Arc<Orchestrator>,
    /// Directory holding the CSV record files and patient images.
    pub data_dir: Arc<PathBuf>,
}

impl ApiContext {
    pub fn new(orchestrator: Arc<Orchestrator>, data_dir: PathBuf) -> Self {
        Self {
            orchestrator,
            data_dir: Arc::new(data_dir),
        }
    }
}

/// Check a patient identifier and return it trimmed.
///
/// Identifiers end up in file names and FHIR references, so anything outside
/// the FHIR id grammar (or a bare `.`/`..`) is rejected.
pub fn validate_patient_id(raw: &str) -> Result<&str, ApiError> {
    let id = raw.trim();
    if !PATIENT_ID_RE.is_match(id) || id == "." || id == ".." {
        return Err(ApiError::BadRequest(format!("Invalid patient id: {raw:?}")));
    }
    Ok(id)
}
