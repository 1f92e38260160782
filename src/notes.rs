//! Templated clinical notes and their local copies.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

/// Title of the note attachment pushed to the sink.
pub const NOTE_ATTACHMENT_TITLE: &str = "auto_note.txt";

const RECOMMENDATION: &str =
    "Recommendation: Review enhanced images and correlate with clinical exam.";

/// Render the clinical note. Features appear in the order given, with four
/// decimals; the free-text section is omitted when `free_text` is empty.
pub fn generate_clinical_note(
    patient_id: &str,
    features: &IndexMap<String, f64>,
    free_text: Option<&str>,
) -> String {
    let mut lines = vec![
        format!("Patient: {patient_id}"),
        "Automated Image Analysis Summary:".to_string(),
    ];
    lines.extend(features.iter().map(|(key, value)| format!(" - {key}: {value:.4}")));

    if let Some(text) = free_text.filter(|t| !t.is_empty()) {
        lines.push("\nClinician notes / OCR extracted:".to_string());
        lines.push(text.to_string());
    }

    lines.push(format!("\n{RECOMMENDATION}"));
    lines.join("\n")
}

/// Result of writing the local note copy, reported as a status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalWriteOutcome {
    pub saved: bool,
    pub status: String,
}

/// Path of the local copy for `patient_id`.
pub fn note_path(dir: &Path, patient_id: &str) -> PathBuf {
    dir.join(format!("{patient_id}_note.txt"))
}

/// Write `<dir>/<patient_id>_note.txt`, creating `dir` if needed. Overwrites
/// any previous note for the same patient. Never fails the caller.
pub fn save_note_locally(dir: &Path, patient_id: &str, note: &str) -> LocalWriteOutcome {
    let path = note_path(dir, patient_id);
    let result = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, note));

    match result {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Note saved locally");
            LocalWriteOutcome {
                saved: true,
                status: format!("Note saved locally at: {}", path.display()),
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to save note locally");
            LocalWriteOutcome {
                saved: false,
                status: format!("Failed to save note locally: {e}"),
            }
        }
    }
}
