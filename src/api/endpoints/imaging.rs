//! Image pipeline endpoints: enhancement and feature extraction.
//!
//! Both take a multipart upload with the image in the `file` field and the
//! patient id as a query parameter.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{validate_patient_id, ApiContext};
use crate::imaging::FeatureSet;

/// Multipart field carrying the image.
const UPLOAD_FIELD: &str = "file";

#[derive(Deserialize)]
pub struct PatientQuery {
    pub patient_id: String,
}

#[derive(Serialize)]
pub struct EnhanceResponse {
    pub filename: String,
    pub enhanced_image_base64: String,
    pub fhir_status: Option<u16>,
    pub fhir_resp: String,
}

#[derive(Serialize)]
pub struct FeaturesResponse {
    pub patient_id: String,
    pub features: FeatureSet,
    pub fhir_status: Option<u16>,
    pub fhir_resp: String,
}

struct Upload {
    filename: Option<String>,
    bytes: Vec<u8>,
}

/// `POST /enhance/?patient_id=`: enhanced PNG (base64) plus sink outcome.
pub async fn enhance(
    State(ctx): State<ApiContext>,
    query: Result<Query<PatientQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<EnhanceResponse>, ApiError> {
    let Query(query) = query?;
    let patient_id = validate_patient_id(&query.patient_id)?;
    let upload = read_upload(multipart?).await?;

    let outcome = ctx
        .orchestrator
        .enhance(patient_id, upload.filename.as_deref(), upload.bytes)
        .await?;

    Ok(Json(EnhanceResponse {
        enhanced_image_base64: outcome.png_base64(),
        filename: outcome.filename,
        fhir_status: outcome.sink.status,
        fhir_resp: outcome.sink.text,
    }))
}

/// `POST /features/?patient_id=`: feature set plus sink outcome.
pub async fn features(
    State(ctx): State<ApiContext>,
    query: Result<Query<PatientQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<FeaturesResponse>, ApiError> {
    let Query(query) = query?;
    let patient_id = validate_patient_id(&query.patient_id)?;
    let upload = read_upload(multipart?).await?;

    let outcome = ctx
        .orchestrator
        .extract_features(patient_id, upload.bytes)
        .await?;

    Ok(Json(FeaturesResponse {
        patient_id: patient_id.to_string(),
        features: outcome.features,
        fhir_status: outcome.sink.status,
        fhir_resp: outcome.sink.text,
    }))
}

/// First `file` field of the form. Other fields are ignored.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{UPLOAD_FIELD}'"
    )))
}
