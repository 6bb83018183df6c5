//! Collaborator traits consumed by the engine
//!
//! The engine only sees these traits; concrete HTTP clients live in
//! `tobi-adapters`. Every call is a suspension point, and every handle is
//! passed in explicitly by the pipeline driver (no module-level clients).

use crate::bundle::EvidenceDoc;
use crate::error::TriageError;
use crate::model::{Alert, AnalysisChain, GraphEntity, GraphRelationship, TraversalTemplate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// Turns alert text into a fixed-length numeric vector.
///
/// Implementations retry transient failures with exponential backoff;
/// permanent failures surface as `TriageError::Embedding`.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, TriageError>;

    /// Embed a structured alert (rule description plus salient fields)
    async fn embed_alert(&self, alert: &Alert) -> Result<Vec<f32>, TriageError>;
}

/// Vector-similarity and keyword/time-window queries against the alert index
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// k-nearest-neighbour search over stored alert vectors
    async fn search_vector_similar(
        &self,
        vector: &[f32],
        k: usize,
        analyzed_only: bool,
    ) -> Result<Vec<EvidenceDoc>, TriageError>;

    /// Keyword search within `center ± window_minutes`, optionally
    /// restricted to one host
    async fn search_keyword_time_range(
        &self,
        keywords: &[String],
        host: Option<&str>,
        window_minutes: i64,
        center: DateTime<Utc>,
    ) -> Result<Vec<EvidenceDoc>, TriageError>;

    /// Alerts that do not yet carry an analysis object, oldest first
    async fn query_unanalyzed(&self, limit: usize) -> Result<Vec<Alert>, TriageError>;

    /// Partial update of one alert document
    async fn update_document(
        &self,
        index: &str,
        id: &str,
        patch: Value,
    ) -> Result<(), TriageError>;
}

/// Parameterized traversals and idempotent upserts against the knowledge graph
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run a traversal template with bound parameters
    async fn run_traversal(
        &self,
        template: TraversalTemplate,
        params: Value,
    ) -> Result<Vec<EvidenceDoc>, TriageError>;

    /// Upsert a node by id; returns true when the node was created
    async fn merge_node(&self, entity: &GraphEntity) -> Result<bool, TriageError>;

    /// Upsert an edge by `(type, source, target)`, matching both endpoints
    /// by id; returns true when the edge was created
    async fn merge_edge(&self, relationship: &GraphRelationship) -> Result<bool, TriageError>;

    /// Idempotently create a supporting index
    async fn ensure_index(&self, label: &str, property: &str) -> Result<(), TriageError>;
}

/// Black-box report generation service
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// Render the named analysis template with the given sections and
    /// return the report text
    async fn generate(
        &self,
        chain: AnalysisChain,
        sections: &BTreeMap<String, String>,
    ) -> Result<String, TriageError>;

    /// Provider name recorded on the analysis result
    fn provider(&self) -> &str;
}
