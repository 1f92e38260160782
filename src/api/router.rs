//! HTTP router.
//!
//! Returns a composable `Router`; `api::server` mounts it on a listener and
//! tests drive it directly with `tower::ServiceExt::oneshot`.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::imaging::MAX_IMAGE_BYTES;
use crate::records::workflow::IMAGES_DIR;

/// Body limit for uploads: the image cap plus multipart overhead.
const MAX_BODY_BYTES: usize = MAX_IMAGE_BYTES + 5 * 1024 * 1024;

/// Build the service router.
///
/// The pipeline routes answer both with and without a trailing slash.
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let images = ServeDir::new(ctx.data_dir.join(IMAGES_DIR));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(endpoints::health::root))
        .route("/health", get(endpoints::health::check))
        .route("/enhance", post(endpoints::imaging::enhance))
        .route("/enhance/", post(endpoints::imaging::enhance))
        .route("/features", post(endpoints::imaging::features))
        .route("/features/", post(endpoints::imaging::features))
        .route("/generate_note", post(endpoints::notes::generate))
        .route("/generate_note/", post(endpoints::notes::generate))
        .route("/dashboard", get(endpoints::records::dashboard))
        .route("/dashboard/search", get(endpoints::records::search))
        .route("/patients/:id/workflow", get(endpoints::records::workflow))
        .nest_service(&format!("/{IMAGES_DIR}"), images)
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use base64::Engine;
    use image::GenericImageView;
    use tower::ServiceExt;

    use crate::config::SinkSettings;
    use crate::fhir::test_support::{unreachable_base_url, MockSink};
    use crate::fhir::FhirClient;
    use crate::imaging::codec::test_support::{gradient_png, gray_png, quadrant_checkerboard};
    use crate::imaging::EnhancementEngine;
    use crate::pipeline::Orchestrator;

    const BOUNDARY: &str = "X-STROKE-EHR-BOUNDARY";

    fn test_ctx(sink_base: &str, root: &Path) -> ApiContext {
        let sink = FhirClient::new(&SinkSettings {
            base_url: sink_base.to_string(),
            bearer_token: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        let orchestrator = Orchestrator::new(
            Arc::new(EnhancementEngine::fallback_only()),
            sink,
            root.join("outputs"),
        );
        ApiContext::new(Arc::new(orchestrator), root.join("data"))
    }

    fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload(uri: &str, field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(field, filename, bytes)))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_of(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 16 * 1024 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn root_and_health() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_ctx("http://127.0.0.1:9/fhir", tmp.path()));

        let response = app.clone().oneshot(get_req("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
        assert!(json_of(response).await["message"]
            .as_str()
            .unwrap()
            .contains("running"));

        let response = app.oneshot(get_req("/health")).await.unwrap();
        let json = json_of(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["engine_state"], "fallback_only");
        assert_eq!(json["enhancement_backend"], "sharpen");
    }

    #[tokio::test]
    async fn enhance_with_reachable_sink() {
        let sink = MockSink::start(StatusCode::CREATED).await;
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_ctx(&sink.base_url, tmp.path()));

        let response = app
            .oneshot(upload("/enhance/?patient_id=P001", "file", "scan.png", &gradient_png(40, 30)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_of(response).await;
        assert_eq!(json["filename"], "scan.png");
        assert_eq!(json["fhir_status"], 201);
        let png = base64::engine::general_purpose::STANDARD
            .decode(json["enhanced_image_base64"].as_str().unwrap())
            .unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
        assert_eq!(sink.received().len(), 1);
    }

    #[tokio::test]
    async fn enhance_with_unreachable_sink_still_succeeds() {
        let base = unreachable_base_url().await;
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_ctx(&base, tmp.path()));

        let response = app
            .oneshot(upload("/enhance?patient_id=P001", "file", "scan.png", &gradient_png(32, 32)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert!(json["fhir_status"].is_null());
        assert!(!json["fhir_resp"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn undecodable_upload_is_rejected_without_push() {
        let sink = MockSink::start(StatusCode::CREATED).await;
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_ctx(&sink.base_url, tmp.path()));

        let response = app
            .oneshot(upload("/enhance/?patient_id=P001", "file", "x.png", &[0x55; 2048]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"]["code"], "INVALID_IMAGE");
        assert!(sink.received().is_empty());
    }

    #[tokio::test]
    async fn upload_requires_patient_id_and_file_field() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_ctx("http://127.0.0.1:9/fhir", tmp.path()));
        let png = gradient_png(32, 32);

        let response = app
            .clone()
            .oneshot(upload("/features/", "file", "a.png", &png))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(upload("/features/?patient_id=../x", "file", "a.png", &png))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(upload("/features/?patient_id=P1", "image", "a.png", &png))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn features_endpoint_returns_fixed_keys() {
        let sink = MockSink::start(StatusCode::OK).await;
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_ctx(&sink.base_url, tmp.path()));

        let png = gray_png(&quadrant_checkerboard(256));
        let response = app
            .oneshot(upload("/features/?patient_id=P002", "file", "q.png", &png))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_of(response).await;
        assert_eq!(json["patient_id"], "P002");
        assert_eq!(json["fhir_status"], 200);
        let keys: Vec<&String> = json["features"].as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 5);
        assert!((json["features"]["mean_intensity"].as_f64().unwrap() - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn generate_note_round_trip() {
        let sink = MockSink::start(StatusCode::CREATED).await;
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_ctx(&sink.base_url, tmp.path()));

        let features: BTreeMap<&str, f64> = [("contrast", 0.75), ("entropy", 3.0)].into();
        let body = serde_json::json!({"patient_id": "P003", "features": features});
        let request = Request::builder()
            .method("POST")
            .uri("/generate_note/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        let note = json["note"].as_str().unwrap();
        assert!(note.starts_with("Patient: P003\n"));
        assert!(note.contains(" - contrast: 0.7500\n - entropy: 3.0000"));
        assert!(json["local_status"]
            .as_str()
            .unwrap()
            .starts_with("Note saved locally at: "));
        assert_eq!(json["fhir_status"], 201);
        assert!(tmp.path().join("outputs/P003_note.txt").exists());
    }

    #[tokio::test]
    async fn note_keeps_feature_order_of_request() {
        let sink = MockSink::start(StatusCode::CREATED).await;
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_ctx(&sink.base_url, tmp.path()));

        // Same key order as the /features response.
        let body = r#"{"patient_id": "P004", "features": {
            "mean_intensity": 0.5, "std_intensity": 0.25, "contrast": 1.0,
            "entropy": 4.0, "brain_area_ratio": 0.125}}"#;
        let request = Request::builder()
            .method("POST")
            .uri("/generate_note/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        let names: Vec<&str> = json["note"]
            .as_str()
            .unwrap()
            .lines()
            .filter_map(|line| line.strip_prefix(" - "))
            .filter_map(|entry| entry.split(':').next())
            .collect();
        assert_eq!(
            names,
            vec![
                "mean_intensity",
                "std_intensity",
                "contrast",
                "entropy",
                "brain_area_ratio"
            ]
        );
    }

    #[tokio::test]
    async fn malformed_note_body_is_bad_request() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_ctx("http://127.0.0.1:9/fhir", tmp.path()));

        let request = Request::builder()
            .method("POST")
            .uri("/generate_note")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"patient_id": "P1", "features": {"a": "high"}}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"]["code"], "BAD_REQUEST");
    }

    fn write_records(root: &Path) {
        let data = root.join("data");
        std::fs::create_dir_all(data.join("images/P001")).unwrap();
        std::fs::write(
            data.join("ehr_data.csv"),
            "patient_id,gender,stroke_type,date_of_scan,num_images\nP001,F,Ischemic,2024-03-01,2\nP002,M,Hemorrhagic,2024-03-09,4\n",
        )
        .unwrap();
        std::fs::write(
            data.join("clinical_notes.csv"),
            "patient_id,clinical_note,ehr_text,image_findings\nP001,Aphasia,NIHSS 12,Infarct\n",
        )
        .unwrap();
        std::fs::write(data.join("images/P001/ct1.png"), gradient_png(16, 16)).unwrap();
    }

    #[tokio::test]
    async fn dashboard_and_search() {
        let tmp = tempfile::tempdir().unwrap();
        write_records(tmp.path());
        let app = api_router(test_ctx("http://127.0.0.1:9/fhir", tmp.path()));

        let json = json_of(app.clone().oneshot(get_req("/dashboard")).await.unwrap()).await;
        assert_eq!(json["total_patients"], 2);
        assert_eq!(json["scans_per_month"][0]["period"], "2024-03");
        assert_eq!(json["scans_per_month"][0]["count"], 2);

        let json = json_of(
            app.clone()
                .oneshot(get_req("/dashboard/search?q=p002"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json["matches"].as_array().unwrap().len(), 1);
        assert_eq!(json["matches"][0]["stroke_type"], "Hemorrhagic");

        let response = app.oneshot(get_req("/dashboard/search?q=")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_dashboard_data_is_404() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_ctx("http://127.0.0.1:9/fhir", tmp.path()));
        let response = app.oneshot(get_req("/dashboard")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn workflow_lists_notes_and_serves_images() {
        let tmp = tempfile::tempdir().unwrap();
        write_records(tmp.path());
        let app = api_router(test_ctx("http://127.0.0.1:9/fhir", tmp.path()));

        let json = json_of(
            app.clone()
                .oneshot(get_req("/patients/P001/workflow"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json["notes"][0]["ehr_text"], "NIHSS 12");
        let url = json["images"][0]["url"].as_str().unwrap().to_string();
        assert_eq!(url, "/images/P001/ct1.png");

        let response = app.clone().oneshot(get_req(&url)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get_req("/patients/P999/workflow")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_preflight_is_allowed() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_ctx("http://127.0.0.1:9/fhir", tmp.path()));

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/features/")
            .header("origin", "http://dashboard.local")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}
