pub mod api; // HTTP surface: router, handlers, server lifecycle
pub mod config;
pub mod fhir; // Clinical-record sink client
pub mod imaging; // Normalizer, feature extractor, enhancement engine
pub mod notes;
pub mod pipeline; // Request orchestration
pub mod records; // CSV-backed dashboard and patient workflow

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::config::Settings;
use crate::fhir::{FhirClient, SinkError};
use crate::imaging::EnhancementEngine;
use crate::pipeline::Orchestrator;

/// Errors that prevent the service from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Failed to configure clinical-record sink: {0}")]
    Sink(#[from] SinkError),

    #[error("Server error: {0}")]
    Server(String),
}

/// Initialize logging, load settings from the environment and serve until
/// Ctrl-C.
pub fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = Settings::from_env();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(settings))
}

async fn serve(settings: Settings) -> Result<(), StartupError> {
    // Model loading reads the weights from disk; keep it off the async workers.
    let model_settings = settings.model.clone();
    let engine = tokio::task::spawn_blocking(move || EnhancementEngine::initialize(&model_settings))
        .await
        .map_err(|e| StartupError::Server(format!("Engine initialization panicked: {e}")))?;
    tracing::info!(
        backend = engine.backend_name(),
        state = ?engine.state(),
        "Enhancement engine ready"
    );

    let sink = FhirClient::new(&settings.sink)?;
    tracing::info!(fhir_base = sink.base_url(), "Clinical-record sink configured");

    let orchestrator = Orchestrator::new(Arc::new(engine), sink, settings.note_output_dir.clone());
    let ctx = ApiContext::new(Arc::new(orchestrator), settings.data_dir.clone());

    let mut server = api::bind_and_start(ctx, settings.bind_addr)
        .await
        .map_err(StartupError::Server)?;
    tracing::info!(addr = %server.info.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}
