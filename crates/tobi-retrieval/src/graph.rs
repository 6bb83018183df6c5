//! Graph-native retrieval: traversal queries over the knowledge graph

use crate::categorize::category_for_template;
use crate::RetrievalStrategy;
use async_trait::async_trait;
use chrono::Duration;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use tobi_core::adapter::GraphStore;
use tobi_core::bundle::{ContextBundle, EvidenceDoc};
use tobi_core::error::TriageError;
use tobi_core::model::{Alert, EvidenceQuery, EvidenceRequest, TraversalTemplate};
use tracing::warn;

/// Runs traversal requests against the graph store. Shares the traditional
/// strategy's isolation contract; a fully unreachable graph store yields an
/// all-empty bundle rather than an error.
pub struct GraphRetrieval {
    graph: Arc<dyn GraphStore>,
}

impl GraphRetrieval {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    /// Bind the current alert to a traversal template
    fn traversal_params(alert: &Alert, lookback_minutes: i64) -> serde_json::Value {
        let since = alert.timestamp - Duration::minutes(lookback_minutes);
        json!({
            "alert_id": alert.id,
            "agent_id": alert.host_key(),
            "source_ip": alert.data.src_ip,
            "user": alert.data.user,
            "lookback_minutes": lookback_minutes,
            "since_epoch_ms": since.timestamp_millis(),
        })
    }

    async fn run_traversal(
        &self,
        alert: &Alert,
        template: TraversalTemplate,
        lookback_minutes: i64,
    ) -> Result<Vec<EvidenceDoc>, TriageError> {
        self.graph
            .run_traversal(template, Self::traversal_params(alert, lookback_minutes))
            .await
    }
}

#[async_trait]
impl RetrievalStrategy for GraphRetrieval {
    async fn gather(
        &self,
        alert: &Alert,
        _vector: Option<&[f32]>,
        requests: &[EvidenceRequest],
    ) -> ContextBundle {
        let traversals: Vec<(&EvidenceRequest, TraversalTemplate, i64)> = requests
            .iter()
            .filter_map(|request| match &request.query {
                EvidenceQuery::GraphTraversal {
                    template,
                    lookback_minutes,
                } => Some((request, *template, *lookback_minutes)),
                _ => None,
            })
            .collect();

        let results = join_all(
            traversals
                .iter()
                .map(|(_, template, lookback)| self.run_traversal(alert, *template, *lookback)),
        )
        .await;

        let mut bundle = ContextBundle::new();
        for ((request, template, _), result) in traversals.iter().zip(results) {
            match result {
                Ok(docs) => bundle.extend(category_for_template(*template), docs),
                Err(err) => {
                    warn!(
                        alert = %alert.id,
                        traversal = template.name(),
                        request = %request.description,
                        error = %err,
                        "graph traversal failed, degrading to empty result"
                    );
                }
            }
        }
        bundle
    }
}
