//! Embedding gateway client
//!
//! OpenAI-compatible `/v1/embeddings` endpoint. Transient failures are
//! retried with bounded exponential backoff; exhausting the retry budget
//! surfaces a permanent `TriageError::Embedding`.

use crate::{AdapterConfig, AdapterError, AdapterResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tobi_core::adapter::Embedder;
use tobi_core::error::TriageError;
use tobi_core::model::Alert;
use tracing::warn;

/// Retry budget for transient gateway failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry (zero-based): base * 2^attempt
    fn delay(&self, attempt: u32) -> std::time::Duration {
        std::time::Duration::from_millis(self.base_delay_ms << attempt)
    }
}

pub struct EmbeddingClient {
    config: AdapterConfig,
    client: Client,
    model: String,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    pub fn new(config: AdapterConfig, model: &str) -> Self {
        Self {
            client: Client::new(),
            config,
            model: model.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request_embedding(&self, text: &str) -> AdapterResult<Vec<f32>> {
        let url = format!("{}/v1/embeddings", self.config.endpoint);
        let body = json!({
            "model": self.model,
            "input": text
        });

        let mut request = self.client.post(&url).json(&body);
        for (key, value) in self.config.auth_headers() {
            request = request.header(&key, &value);
        }

        let response = request
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(AdapterError::Api {
                status,
                message: text,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AdapterError::Parse("embedding response carried no vectors".into()))
    }

    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>, TriageError> {
        let mut attempt = 0;
        loop {
            match self.request_embedding(text).await {
                Ok(vector) => return Ok(vector),
                Err(err) if err.is_transient() && attempt + 1 < self.retry.max_attempts => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "embedding gateway failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(TriageError::Embedding(err.to_string())),
            }
        }
    }
}

/// Text rendition of an alert for embedding: rule description plus the
/// fields that distinguish otherwise-identical rules
fn alert_text(alert: &Alert) -> String {
    let mut parts = vec![alert.rule.description.clone()];
    if let Some(name) = &alert.agent.name {
        parts.push(format!("host {}", name));
    }
    if let Some(src) = &alert.data.src_ip {
        parts.push(format!("source {}", src));
    }
    if let Some(user) = &alert.data.user {
        parts.push(format!("user {}", user));
    }
    if let Some(process) = &alert.data.process {
        if let Some(name) = &process.name {
            parts.push(format!("process {}", name));
        }
    }
    parts.join("; ")
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, TriageError> {
        self.embed_with_retry(text).await
    }

    async fn embed_alert(&self, alert: &Alert) -> Result<Vec<f32>, TriageError> {
        self.embed_with_retry(&alert_text(alert)).await
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let retry = RetryPolicy {
            max_attempts: 4,
            base_delay_ms: 100,
        };
        assert_eq!(retry.delay(0).as_millis(), 100);
        assert_eq!(retry.delay(1).as_millis(), 200);
        assert_eq!(retry.delay(2).as_millis(), 400);
    }

    #[tokio::test]
    async fn embedding_parses_vector() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "data": [{"embedding": [0.25, -0.5, 0.125]}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = EmbeddingClient::new(AdapterConfig::new(&server.url()), "text-embedding-3-small");
        let vector = client.embed_text("ssh brute force").await.unwrap();
        assert_eq!(vector, vec![0.25, -0.5, 0.125]);
    }

    #[tokio::test]
    async fn transient_failures_consume_the_retry_budget() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/v1/embeddings")
            .with_status(503)
            .with_body("overloaded")
            .expect(3)
            .create_async()
            .await;

        let client = EmbeddingClient::new(AdapterConfig::new(&server.url()), "m").with_retry(
            RetryPolicy {
                max_attempts: 3,
                base_delay_ms: 1,
            },
        );
        let err = client.embed_text("x").await.unwrap_err();
        assert!(matches!(err, TriageError::Embedding(_)));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/v1/embeddings")
            .with_status(401)
            .with_body("bad key")
            .expect(1)
            .create_async()
            .await;

        let client = EmbeddingClient::new(AdapterConfig::new(&server.url()), "m");
        let err = client.embed_text("x").await.unwrap_err();
        assert!(matches!(err, TriageError::Embedding(_)));
        m.assert_async().await;
    }

    #[test]
    fn alert_text_includes_salient_fields() {
        let mut alert = tobi_core::model::Alert {
            id: "a1".into(),
            index: "alerts".into(),
            timestamp: chrono::Utc::now(),
            rule: tobi_core::model::AlertRule {
                id: "1".into(),
                description: "SSH brute force".into(),
                level: 10,
                groups: vec![],
            },
            agent: Default::default(),
            data: Default::default(),
        };
        alert.agent.name = Some("web-01".into());
        alert.data.src_ip = Some("203.0.113.5".into());
        let text = alert_text(&alert);
        assert!(text.contains("SSH brute force"));
        assert!(text.contains("host web-01"));
        assert!(text.contains("source 203.0.113.5"));
    }
}
