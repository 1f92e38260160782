use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use super::resources::{DocumentReference, Observation};
use super::{SinkError, SinkResponse};
use crate::config::SinkSettings;

const FHIR_JSON: &str = "application/fhir+json";

/// HTTP client for the FHIR server receiving enhanced images, feature
/// observations and generated notes.
pub struct FhirClient {
    base_url: String,
    bearer_token: Option<String>,
    client: reqwest::Client,
    timeout: std::time::Duration,
}

impl FhirClient {
    pub fn new(settings: &SinkSettings) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.timeout)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| SinkError::Client(e.to_string()))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            bearer_token: settings.bearer_token.clone(),
            client,
            timeout: settings.timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a DocumentReference with one base64 attachment.
    pub async fn push_document_reference(
        &self,
        patient_id: &str,
        data: &[u8],
        title: &str,
        content_type: &str,
    ) -> Result<SinkResponse, SinkError> {
        let doc = DocumentReference::with_attachment(patient_id, data, content_type, title);
        self.post("DocumentReference", &doc).await
    }

    /// POST an Observation with one string component per value.
    pub async fn push_observation(
        &self,
        patient_id: &str,
        label: &str,
        values: &[(&str, f64)],
    ) -> Result<SinkResponse, SinkError> {
        let obs = Observation::with_components(patient_id, label, values);
        self.post("Observation", &obs).await
    }

    async fn post<T: Serialize>(
        &self,
        resource_type: &str,
        resource: &T,
    ) -> Result<SinkResponse, SinkError> {
        let url = format!("{}/{}", self.base_url, resource_type);
        let body = serde_json::to_vec(resource).map_err(|e| SinkError::Client(e.to_string()))?;

        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, FHIR_JSON)
            .body(body);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SinkError::Timeout(self.timeout)
            } else if e.is_connect() {
                SinkError::Transport(format!("cannot reach {}: {e}", self.base_url))
            } else {
                SinkError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                SinkError::Timeout(self.timeout)
            } else {
                SinkError::Transport(e.to_string())
            }
        })?;

        tracing::debug!(resource_type, status, "Sink push answered");
        Ok(SinkResponse { status, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhir::test_support::{unreachable_base_url, MockSink};
    use axum::http::StatusCode;
    use std::time::Duration;

    fn settings(base_url: &str, token: Option<&str>) -> SinkSettings {
        SinkSettings {
            base_url: base_url.to_string(),
            bearer_token: token.map(str::to_string),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = FhirClient::new(&settings("http://fhir.local/fhir/", None)).unwrap();
        assert_eq!(client.base_url(), "http://fhir.local/fhir");
    }

    #[tokio::test]
    async fn document_reference_is_posted_with_headers() {
        let sink = MockSink::start(StatusCode::CREATED).await;
        let client = FhirClient::new(&settings(&sink.base_url, Some("s3cret"))).unwrap();

        let resp = client
            .push_document_reference("p7", b"note text", "auto_note.txt", "text/plain")
            .await
            .unwrap();
        assert_eq!(resp.status, 201);

        let received = sink.received();
        assert_eq!(received.len(), 1);
        let req = &received[0];
        assert_eq!(req.path, "/fhir/DocumentReference");
        assert_eq!(req.content_type.as_deref(), Some("application/fhir+json"));
        assert_eq!(req.authorization.as_deref(), Some("Bearer s3cret"));
        assert_eq!(req.body["subject"]["reference"], "Patient/p7");
        assert_eq!(req.body["content"][0]["attachment"]["title"], "auto_note.txt");
    }

    #[tokio::test]
    async fn observation_is_posted_without_token() {
        let sink = MockSink::start(StatusCode::OK).await;
        let client = FhirClient::new(&settings(&sink.base_url, None)).unwrap();

        client
            .push_observation("p7", "Automated Image Features", &[("entropy", 1.5)])
            .await
            .unwrap();

        let received = sink.received();
        assert_eq!(received[0].path, "/fhir/Observation");
        assert_eq!(received[0].authorization, None);
        assert_eq!(received[0].body["component"][0]["valueString"], "1.5");
    }

    #[tokio::test]
    async fn error_status_is_a_response_not_an_error() {
        let sink = MockSink::start(StatusCode::INTERNAL_SERVER_ERROR).await;
        let client = FhirClient::new(&settings(&sink.base_url, None)).unwrap();

        let resp = client
            .push_observation("p7", "label", &[])
            .await
            .unwrap();
        assert_eq!(resp.status, 500);
        assert_eq!(resp.text, MockSink::RESPONSE_BODY);
    }

    #[tokio::test]
    async fn unreachable_sink_is_a_transport_error() {
        let base = unreachable_base_url().await;
        let client = FhirClient::new(&settings(&base, None)).unwrap();

        let err = client
            .push_document_reference("p7", b"x", "a.png", "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Transport(_)), "{err:?}");
    }

    #[tokio::test]
    async fn slow_sink_times_out() {
        let sink = MockSink::start_delayed(StatusCode::OK, Duration::from_secs(3)).await;
        let mut s = settings(&sink.base_url, None);
        s.timeout = Duration::from_millis(200);
        let client = FhirClient::new(&s).unwrap();

        let err = client.push_observation("p7", "label", &[]).await.unwrap_err();
        assert!(matches!(err, SinkError::Timeout(_)), "{err:?}");
    }
}
