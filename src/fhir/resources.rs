//! Minimal FHIR R4 payloads, only the fields this service sends.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// `type.text` of every DocumentReference pushed by this service.
pub const DOCUMENT_TYPE_TEXT: &str = "Enhanced Stroke Image";

/// Text-only CodeableConcept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeableText {
    pub text: String,
}

impl CodeableText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub reference: String,
}

impl Reference {
    pub fn patient(patient_id: &str) -> Self {
        Self {
            reference: format!("Patient/{patient_id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: String,
    /// Base64 (standard alphabet, padded).
    pub data: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub attachment: Attachment,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub resource_type: String,
    pub status: String,
    #[serde(rename = "type")]
    pub doc_type: CodeableText,
    pub subject: Reference,
    pub content: Vec<Content>,
}

impl DocumentReference {
    /// A current DocumentReference carrying one attachment.
    pub fn with_attachment(patient_id: &str, data: &[u8], content_type: &str, title: &str) -> Self {
        Self {
            resource_type: "DocumentReference".to_string(),
            status: "current".to_string(),
            doc_type: CodeableText::new(DOCUMENT_TYPE_TEXT),
            subject: Reference::patient(patient_id),
            content: vec![Content {
                attachment: Attachment {
                    content_type: content_type.to_string(),
                    data: STANDARD.encode(data),
                    title: title.to_string(),
                },
            }],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationComponent {
    pub code: CodeableText,
    pub value_string: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub resource_type: String,
    pub status: String,
    pub code: CodeableText,
    pub subject: Reference,
    pub component: Vec<ObservationComponent>,
}

impl Observation {
    /// A final Observation with one string-valued component per
    /// `(name, value)` pair, in the given order.
    pub fn with_components(patient_id: &str, label: &str, values: &[(&str, f64)]) -> Self {
        Self {
            resource_type: "Observation".to_string(),
            status: "final".to_string(),
            code: CodeableText::new(label),
            subject: Reference::patient(patient_id),
            component: values
                .iter()
                .map(|&(name, value)| ObservationComponent {
                    code: CodeableText::new(name),
                    value_string: format_value(value),
                })
                .collect(),
        }
    }
}

/// Shortest round-trip decimal form (`0.5`, `1.0`, `1e-10`).
fn format_value(value: f64) -> String {
    format!("{value:?}")
}
