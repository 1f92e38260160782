//! Record views over the CSV data directory.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{validate_patient_id, ApiContext};
use crate::records::{self, CsvTable, DashboardSummary, PatientSearch, PatientWorkflow};

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// `GET /dashboard`
pub async fn dashboard(State(ctx): State<ApiContext>) -> Result<Json<DashboardSummary>, ApiError> {
    let data_dir = ctx.data_dir.clone();
    let summary = tokio::task::spawn_blocking(move || records::load_dashboard(&data_dir))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(Json(summary))
}

/// `GET /dashboard/search?q=`: case-insensitive patient id search.
pub async fn search(
    State(ctx): State<ApiContext>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<PatientSearch>, ApiError> {
    let Query(query) = query?;
    if query.q.trim().is_empty() {
        return Err(ApiError::BadRequest("Enter a Patient ID to search".into()));
    }

    let path = ctx.data_dir.join(records::dashboard::EHR_DATA_FILE);
    let result = tokio::task::spawn_blocking(move || {
        let table = CsvTable::load(&path)?;
        records::search_patients(&table, &query.q)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(Json(result))
}

/// `GET /patients/:id/workflow`: clinical notes and images of one patient.
pub async fn workflow(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientWorkflow>, ApiError> {
    let patient_id = validate_patient_id(&patient_id)?.to_string();
    let data_dir = ctx.data_dir.clone();
    let workflow =
        tokio::task::spawn_blocking(move || records::load_workflow(&data_dir, &patient_id))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(Json(workflow))
}
