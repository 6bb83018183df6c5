//! Traditional retrieval: vector similarity plus keyword/time-range search

use crate::categorize::category_for_keyword_request;
use crate::RetrievalStrategy;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tobi_core::adapter::{AlertStore, Embedder};
use tobi_core::bundle::{ContextBundle, ContextCategory, EvidenceDoc};
use tobi_core::error::TriageError;
use tobi_core::model::{Alert, EvidenceQuery, EvidenceRequest};
use tracing::warn;

/// Runs evidence requests against the alert store, one concurrent task per
/// request, with per-task failure isolation.
pub struct TraditionalRetrieval {
    store: Arc<dyn AlertStore>,
    embedder: Arc<dyn Embedder>,
}

impl TraditionalRetrieval {
    pub fn new(store: Arc<dyn AlertStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    async fn run_request(
        &self,
        alert: &Alert,
        vector: Option<&[f32]>,
        request: &EvidenceRequest,
    ) -> Result<Vec<EvidenceDoc>, TriageError> {
        match &request.query {
            EvidenceQuery::VectorSimilarity { k, analyzed_only } => {
                let owned;
                let v = match vector {
                    Some(v) => v,
                    None => {
                        owned = self.embedder.embed_alert(alert).await?;
                        owned.as_slice()
                    }
                };
                self.store.search_vector_similar(v, *k, *analyzed_only).await
            }
            EvidenceQuery::KeywordTimeRange {
                keywords,
                window_minutes,
            } => {
                self.store
                    .search_keyword_time_range(
                        keywords,
                        alert.host_key(),
                        *window_minutes,
                        alert.timestamp,
                    )
                    .await
            }
            // Traversals belong to the graph strategy
            EvidenceQuery::GraphTraversal { .. } => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl RetrievalStrategy for TraditionalRetrieval {
    async fn gather(
        &self,
        alert: &Alert,
        vector: Option<&[f32]>,
        requests: &[EvidenceRequest],
    ) -> ContextBundle {
        let mut ordered: Vec<&EvidenceRequest> = requests.iter().collect();
        ordered.sort_by_key(|r| r.priority);

        // Results come back aligned by index with `ordered`, regardless of
        // which task finished first.
        let results = join_all(
            ordered
                .iter()
                .map(|request| self.run_request(alert, vector, request)),
        )
        .await;

        let mut bundle = ContextBundle::new();
        for (request, result) in ordered.iter().zip(results) {
            let docs = match result {
                Ok(docs) => docs,
                Err(err) => {
                    warn!(
                        alert = %alert.id,
                        request = %request.description,
                        error = %err,
                        "evidence request failed, degrading to empty result"
                    );
                    Vec::new()
                }
            };
            match &request.query {
                EvidenceQuery::VectorSimilarity { .. } => {
                    bundle.extend(ContextCategory::SimilarAlerts, docs);
                }
                EvidenceQuery::KeywordTimeRange { .. } => {
                    bundle.extend(category_for_keyword_request(&request.description), docs);
                }
                EvidenceQuery::GraphTraversal { .. } => {}
            }
        }
        bundle
    }
}
