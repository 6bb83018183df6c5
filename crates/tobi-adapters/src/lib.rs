//! HTTP-backed collaborator implementations
//!
//! This crate provides the concrete clients behind the engine's
//! collaborator traits:
//! - OpenSearch-compatible alert store (kNN + bool/time-range search)
//! - Neo4j graph store (HTTP transaction endpoint, parameterized Cypher)
//! - Embedding gateway (OpenAI-compatible, bounded exponential backoff)
//! - Chat-completion report generator
//!
//! The engine crates only ever see the traits in `tobi_core::adapter`.

pub mod embedding;
pub mod llm;
pub mod neo4j;
pub mod opensearch;

pub use embedding::{EmbeddingClient, RetryPolicy};
pub use llm::ChatReportGenerator;
pub use neo4j::Neo4jGraph;
pub use opensearch::OpenSearchStore;

use std::collections::HashMap;

/// Connection settings shared by every HTTP client
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_seconds: u64,
}

impl AdapterConfig {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: None,
            username: None,
            password: None,
            timeout_seconds: 30,
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Authentication headers: basic auth when credentials are set,
    /// bearer token otherwise
    pub(crate) fn auth_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            use base64::{engine::general_purpose, Engine as _};
            let credentials = format!("{}:{}", username, password);
            let encoded = general_purpose::STANDARD.encode(credentials);
            headers.insert("Authorization".to_string(), format!("Basic {}", encoded));
        } else if let Some(api_key) = &self.api_key {
            headers.insert("Authorization".to_string(), format!("Bearer {}", api_key));
        }

        headers
    }
}

/// Adapter operation result type
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Transport-level errors, mapped into `TriageError` per client
#[derive(thiserror::Error, Debug)]
pub enum AdapterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl AdapterError {
    /// Whether the failure is plausibly transient: connection trouble,
    /// timeouts, rate limiting, or a 5xx from the service
    pub fn is_transient(&self) -> bool {
        match self {
            AdapterError::Http(e) => e.is_timeout() || e.is_connect(),
            AdapterError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
