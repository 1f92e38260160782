//! In-process FHIR server recording every request it receives.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::Router;

#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub path: String,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    delay: Duration,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

pub struct MockSink {
    /// Base URL including the `/fhir` prefix.
    pub base_url: String,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl MockSink {
    pub const RESPONSE_BODY: &'static str = r#"{"resourceType":"OperationOutcome"}"#;

    /// Answer every request with `status`.
    pub async fn start(status: StatusCode) -> Self {
        Self::start_delayed(status, Duration::ZERO).await
    }

    /// Answer every request with `status` after `delay`.
    pub async fn start_delayed(status: StatusCode, delay: Duration) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status,
            delay,
            received: received.clone(),
        };
        let app = Router::new().fallback(record).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/fhir"),
            received,
        }
    }

    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.received.lock().unwrap().clone()
    }
}

async fn record(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let request = ReceivedRequest {
        path: uri.path().to_string(),
        content_type: header_str(header::CONTENT_TYPE),
        authorization: header_str(header::AUTHORIZATION),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    };
    state.received.lock().unwrap().push(request);

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (state.status, MockSink::RESPONSE_BODY)
}

/// A base URL nothing listens on: bind an ephemeral port, then release it.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/fhir")
}
