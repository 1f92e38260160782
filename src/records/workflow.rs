//! Per-patient workflow view: clinical notes from `clinical_notes.csv` plus
//! the patient's image folder.

use std::path::Path;

use serde::Serialize;

use super::csv::CsvTable;
use super::RecordsError;

pub const CLINICAL_NOTES_FILE: &str = "clinical_notes.csv";

/// Subdirectory of the data directory holding one folder per patient.
pub const IMAGES_DIR: &str = "images";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

pub const SUMMARY_PLACEHOLDER: &str =
    "This is a placeholder AI-generated summary based on clinical notes and images.";

const NO_CLINICAL_NOTE: &str = "No clinical note available.";
const NO_EHR_TEXT: &str = "No EHR text available.";
const NO_IMAGE_FINDINGS: &str = "No image findings available.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClinicalEntry {
    pub clinical_note: String,
    pub ehr_text: String,
    pub image_findings: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientImage {
    pub file_name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientWorkflow {
    pub patient_id: String,
    pub notes: Vec<ClinicalEntry>,
    pub images: Vec<PatientImage>,
    /// Set when the image folder is missing or holds no images.
    pub image_notice: Option<String>,
    pub summary: String,
}

/// Collect the notes and images of `patient_id` under `data_dir`.
pub fn load_workflow(data_dir: &Path, patient_id: &str) -> Result<PatientWorkflow, RecordsError> {
    let patient_id = patient_id.trim();
    let notes_path = data_dir.join(CLINICAL_NOTES_FILE);
    let table = CsvTable::load(&notes_path).map_err(|e| match e {
        RecordsError::NotFound(_) => RecordsError::NotFound(format!(
            "Clinical notes file not found: {}",
            notes_path.display()
        )),
        other => other,
    })?;

    let ids = table
        .column("patient_id")
        .ok_or_else(|| RecordsError::MissingColumn("patient_id".to_string()))?;
    let rows: Vec<usize> = ids
        .enumerate()
        .filter(|(_, id)| *id == Some(patient_id))
        .map(|(row, _)| row)
        .collect();

    if rows.is_empty() {
        return Err(RecordsError::NotFound(format!(
            "No clinical notes found for Patient ID: {patient_id}"
        )));
    }

    let text_or = |row: usize, column: &str, default: &str| {
        table.cell(row, column).unwrap_or(default).to_string()
    };
    let notes = rows
        .iter()
        .map(|&row| ClinicalEntry {
            clinical_note: text_or(row, "clinical_note", NO_CLINICAL_NOTE),
            ehr_text: text_or(row, "ehr_text", NO_EHR_TEXT),
            image_findings: text_or(row, "image_findings", NO_IMAGE_FINDINGS),
        })
        .collect();

    let image_dir = data_dir.join(IMAGES_DIR).join(patient_id);
    let (images, image_notice) = if image_dir.is_dir() {
        let images = list_patient_images(&image_dir, patient_id)?;
        let notice = images
            .is_empty()
            .then(|| "No images found for this patient.".to_string());
        (images, notice)
    } else {
        (Vec::new(), Some("No image folder found for this patient.".to_string()))
    };

    tracing::debug!(patient_id, notes = rows.len(), images = images.len(), "Workflow loaded");

    Ok(PatientWorkflow {
        patient_id: patient_id.to_string(),
        notes,
        images,
        image_notice,
        summary: SUMMARY_PLACEHOLDER.to_string(),
    })
}

/// Image files in `dir` (by extension, case-insensitive), sorted by name.
fn list_patient_images(dir: &Path, patient_id: &str) -> Result<Vec<PatientImage>, RecordsError> {
    let mut names: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if has_image_extension(&name) {
            names.push(name);
        }
    }
    names.sort();

    Ok(names
        .into_iter()
        .map(|file_name| PatientImage {
            url: format!("/{IMAGES_DIR}/{patient_id}/{file_name}"),
            file_name,
        })
        .collect())
}

fn has_image_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}
