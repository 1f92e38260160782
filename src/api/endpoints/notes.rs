//! Clinical note generation endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{validate_patient_id, ApiContext};

#[derive(Deserialize)]
pub struct NoteRequest {
    pub patient_id: String,
    /// Rendered in the order received.
    pub features: IndexMap<String, f64>,
    #[serde(default)]
    pub sr_text: Option<String>,
}

#[derive(Serialize)]
pub struct NoteResponse {
    pub note: String,
    pub local_status: String,
    pub fhir_status: Option<u16>,
    pub fhir_resp: String,
}

/// `POST /generate_note/`: render, save locally, push to the sink.
pub async fn generate(
    State(ctx): State<ApiContext>,
    body: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<Json<NoteResponse>, ApiError> {
    let Json(req) = body?;
    let patient_id = validate_patient_id(&req.patient_id)?;

    let outcome = ctx
        .orchestrator
        .generate_note(patient_id, &req.features, req.sr_text.as_deref())
        .await;

    Ok(Json(NoteResponse {
        note: outcome.note,
        local_status: outcome.local.status,
        fhir_status: outcome.sink.status,
        fhir_resp: outcome.sink.text,
    }))
}
