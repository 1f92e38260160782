//! Liveness and engine status.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::imaging::EngineState;

const ROOT_MESSAGE: &str = "Stroke EHR GenAI Deployment API is running successfully.";

#[derive(Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub enhancement_backend: &'static str,
    pub engine_state: EngineState,
}

/// `GET /`
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: ROOT_MESSAGE,
    })
}

/// `GET /health`: reports which enhancement path is active.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let engine = ctx.orchestrator.engine();
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        enhancement_backend: engine.backend_name(),
        engine_state: engine.state(),
    })
}
