//! Ingestion sink: where (identifier, text) pairs are submitted.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use url::Url;

use confeed_shared::{ConfeedError, Result};

/// User-Agent string for sink requests.
const USER_AGENT: &str = concat!("confeed/", env!("CARGO_PKG_VERSION"));

/// A collaborator that accepts one `(identifier, text)` pair per call.
///
/// Success/failure semantics (deduplication, chunking, storage) are owned
/// entirely by the implementation; the ingestor only propagates errors.
pub trait IngestSink {
    fn ingest_text(
        &self,
        doc_id: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

// ---------------------------------------------------------------------------
// HTTP sink
// ---------------------------------------------------------------------------

/// Request body for the ingestion service's text endpoint.
#[derive(Debug, Serialize)]
struct IngestTextRequest<'a> {
    file_name: &'a str,
    text: &'a str,
}

/// Sink that posts each document to an HTTP ingestion service as JSON
/// (`{"file_name": <doc_id>, "text": ...}`). No batching, no retry.
pub struct HttpIngestSink {
    endpoint: Url,
    client: Client,
}

impl HttpIngestSink {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ConfeedError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { endpoint, client })
    }
}

impl IngestSink for HttpIngestSink {
    async fn ingest_text(&self, doc_id: &str, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&IngestTextRequest {
                file_name: doc_id,
                text,
            })
            .send()
            .await
            .map_err(|e| ConfeedError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConfeedError::Ingest(format!(
                "HTTP {status} for document {doc_id}: {body}"
            )));
        }

        debug!(doc_id, bytes = text.len(), "document submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_doc_id_and_text_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/ingest/text"))
            .and(body_json(serde_json::json!({
                "file_name": "7b502c3a1f48c8609ae212cdfb639dee39673f5e",
                "text": "Hello world",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = Url::parse(&format!("{}/v1/ingest/text", server.uri())).unwrap();
        let sink = HttpIngestSink::new(endpoint, Duration::from_secs(5)).unwrap();

        sink.ingest_text("7b502c3a1f48c8609ae212cdfb639dee39673f5e", "Hello world")
            .await
            .expect("submission should succeed");
    }

    #[tokio::test]
    async fn non_success_status_is_an_ingest_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/ingest/text"))
            .respond_with(ResponseTemplate::new(500).set_body_string("embedding backend down"))
            .mount(&server)
            .await;

        let endpoint = Url::parse(&format!("{}/v1/ingest/text", server.uri())).unwrap();
        let sink = HttpIngestSink::new(endpoint, Duration::from_secs(5)).unwrap();

        let err = sink
            .ingest_text("abc123", "some text")
            .await
            .err()
            .expect("submission should fail");
        assert!(matches!(err, ConfeedError::Ingest(_)), "got {err:?}");
        assert!(err.to_string().contains("embedding backend down"));
    }
}
