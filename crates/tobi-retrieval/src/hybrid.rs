//! Hybrid retrieval: graph-native first, traditional supplement when the
//! graph evidence is too thin

use crate::{GraphRetrieval, RetrievalStrategy, TraditionalRetrieval};
use std::sync::atomic::{AtomicU64, Ordering};
use tobi_core::bundle::ContextBundle;
use tobi_core::model::{Alert, EvidenceRequest};
use tracing::info;

/// Policy knobs. The threshold is configuration, not load-bearing business
/// logic; 10 is the operational default.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Minimum total item count below which the graph bundle is
    /// supplemented with traditional retrieval
    pub sufficiency_threshold: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            sufficiency_threshold: 10,
        }
    }
}

/// Runs the graph-native strategy, then layers traditional supplements on
/// top when the graph evidence is insufficient. Graph evidence is never
/// discarded when supplementing.
pub struct HybridRetrieval {
    graph: GraphRetrieval,
    traditional: TraditionalRetrieval,
    config: RetrievalConfig,
    /// Supplement events since construction, for the batch summary
    fallback_count: AtomicU64,
}

impl HybridRetrieval {
    pub fn new(
        graph: GraphRetrieval,
        traditional: TraditionalRetrieval,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            graph,
            traditional,
            config,
            fallback_count: AtomicU64::new(0),
        }
    }

    /// Times the traditional supplement kicked in
    pub fn fallback_count(&self) -> u64 {
        self.fallback_count.load(Ordering::Relaxed)
    }

    pub async fn gather(
        &self,
        alert: &Alert,
        vector: Option<&[f32]>,
        graph_requests: &[EvidenceRequest],
        traditional_requests: &[EvidenceRequest],
    ) -> ContextBundle {
        let mut bundle = self.graph.gather(alert, None, graph_requests).await;

        let graph_items = bundle.total_items();
        if graph_items >= self.config.sufficiency_threshold {
            return bundle;
        }

        self.fallback_count.fetch_add(1, Ordering::Relaxed);
        info!(
            alert = %alert.id,
            graph_items,
            threshold = self.config.sufficiency_threshold,
            "graph evidence insufficient, supplementing with traditional retrieval"
        );

        let supplement = self
            .traditional
            .gather(alert, vector, traditional_requests)
            .await;

        bundle.traditional_similar_alerts = supplement.similar_alerts;

        let mut metrics = supplement.cpu_metrics;
        metrics.extend(supplement.memory_metrics);
        bundle.traditional_metrics = metrics;

        let mut logs = supplement.network_logs;
        logs.extend(supplement.ssh_logs);
        bundle.traditional_logs = logs;

        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tobi_core::adapter::{AlertStore, Embedder, GraphStore};
    use tobi_core::bundle::EvidenceDoc;
    use tobi_core::error::TriageError;
    use tobi_core::model::{
        AgentRef, AlertData, AlertRule, EvidenceQuery, GraphEntity, GraphRelationship, Priority,
        TraversalTemplate,
    };

    /// Graph store returning `per_traversal` records per traversal
    struct FixedGraph {
        per_traversal: usize,
    }

    #[async_trait]
    impl GraphStore for FixedGraph {
        async fn run_traversal(
            &self,
            template: TraversalTemplate,
            _params: Value,
        ) -> Result<Vec<EvidenceDoc>, TriageError> {
            Ok((0..self.per_traversal)
                .map(|i| EvidenceDoc::new(format!("{}-{i}", template.name()), None, json!({})))
                .collect())
        }
        async fn merge_node(&self, _e: &GraphEntity) -> Result<bool, TriageError> {
            Ok(true)
        }
        async fn merge_edge(&self, _r: &GraphRelationship) -> Result<bool, TriageError> {
            Ok(true)
        }
        async fn ensure_index(&self, _l: &str, _p: &str) -> Result<(), TriageError> {
            Ok(())
        }
    }

    struct FixedStore;

    #[async_trait]
    impl AlertStore for FixedStore {
        async fn search_vector_similar(
            &self,
            _vector: &[f32],
            _k: usize,
            _analyzed_only: bool,
        ) -> Result<Vec<EvidenceDoc>, TriageError> {
            Ok(vec![EvidenceDoc::new("sim-1", Some(0.9), json!({}))])
        }
        async fn search_keyword_time_range(
            &self,
            _keywords: &[String],
            _host: Option<&str>,
            _window_minutes: i64,
            _center: DateTime<Utc>,
        ) -> Result<Vec<EvidenceDoc>, TriageError> {
            Ok(vec![EvidenceDoc::new("kw-1", None, json!({}))])
        }
        async fn query_unanalyzed(&self, _limit: usize) -> Result<Vec<Alert>, TriageError> {
            Ok(Vec::new())
        }
        async fn update_document(
            &self,
            _index: &str,
            _id: &str,
            _patch: Value,
        ) -> Result<(), TriageError> {
            Ok(())
        }
    }

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed_text(&self, _t: &str) -> Result<Vec<f32>, TriageError> {
            Ok(vec![0.0; 4])
        }
        async fn embed_alert(&self, _a: &Alert) -> Result<Vec<f32>, TriageError> {
            Ok(vec![0.0; 4])
        }
    }

    fn alert() -> Alert {
        Alert {
            id: "a1".into(),
            index: "alerts".into(),
            timestamp: Utc::now(),
            rule: AlertRule {
                id: "1".into(),
                description: "test".into(),
                level: 5,
                groups: vec![],
            },
            agent: AgentRef::default(),
            data: AlertData::default(),
        }
    }

    fn graph_requests(n: usize) -> Vec<EvidenceRequest> {
        let templates = [
            TraversalTemplate::AttackPath,
            TraversalTemplate::LateralMovement,
            TraversalTemplate::TemporalCorrelation,
        ];
        templates[..n]
            .iter()
            .map(|t| {
                EvidenceRequest::new(
                    EvidenceQuery::GraphTraversal {
                        template: *t,
                        lookback_minutes: 60,
                    },
                    t.name(),
                    Priority::High,
                )
            })
            .collect()
    }

    fn traditional_requests() -> Vec<EvidenceRequest> {
        vec![
            EvidenceRequest::new(
                EvidenceQuery::VectorSimilarity {
                    k: 7,
                    analyzed_only: true,
                },
                "similar historical alerts",
                Priority::High,
            ),
            EvidenceRequest::new(
                EvidenceQuery::KeywordTimeRange {
                    keywords: vec!["cpu".into()],
                    window_minutes: 2,
                },
                "cpu usage metrics",
                Priority::High,
            ),
            EvidenceRequest::new(
                EvidenceQuery::KeywordTimeRange {
                    keywords: vec!["network".into()],
                    window_minutes: 3,
                },
                "network connection activity",
                Priority::High,
            ),
        ]
    }

    fn hybrid(per_traversal: usize) -> HybridRetrieval {
        HybridRetrieval::new(
            GraphRetrieval::new(Arc::new(FixedGraph { per_traversal })),
            TraditionalRetrieval::new(Arc::new(FixedStore), Arc::new(StubEmbedder)),
            RetrievalConfig::default(),
        )
    }

    #[tokio::test]
    async fn thin_graph_bundle_gets_supplemented() {
        let retrieval = hybrid(1); // 3 traversals x 1 = 3 < 10
        let bundle = retrieval
            .gather(&alert(), None, &graph_requests(3), &traditional_requests())
            .await;

        assert_eq!(bundle.traditional_similar_alerts.len(), 1);
        assert_eq!(bundle.traditional_metrics.len(), 1);
        assert_eq!(bundle.traditional_logs.len(), 1);
        // Graph evidence is kept, not replaced
        assert_eq!(bundle.attack_paths.len(), 1);
        assert_eq!(retrieval.fallback_count(), 1);
    }

    #[tokio::test]
    async fn sufficient_graph_bundle_skips_supplement() {
        let retrieval = hybrid(4); // 3 traversals x 4 = 12 >= 10
        let bundle = retrieval
            .gather(&alert(), None, &graph_requests(3), &traditional_requests())
            .await;

        assert!(bundle.traditional_similar_alerts.is_empty());
        assert!(bundle.traditional_metrics.is_empty());
        assert!(bundle.traditional_logs.is_empty());
        assert_eq!(retrieval.fallback_count(), 0);
    }

    #[tokio::test]
    async fn threshold_item_count_is_already_sufficient() {
        // Exactly at the threshold: only counts strictly below 10 supplement
        let retrieval = hybrid(5); // 2 traversals x 5 = 10
        let bundle = retrieval
            .gather(&alert(), None, &graph_requests(2), &traditional_requests())
            .await;

        assert_eq!(bundle.total_items(), 10);
        assert!(bundle.traditional_similar_alerts.is_empty());
        assert!(bundle.traditional_metrics.is_empty());
        assert!(bundle.traditional_logs.is_empty());
        assert_eq!(retrieval.fallback_count(), 0);
    }

    #[tokio::test]
    async fn fallback_counter_accumulates_across_alerts() {
        let retrieval = hybrid(0);
        for _ in 0..3 {
            retrieval
                .gather(&alert(), None, &graph_requests(3), &traditional_requests())
                .await;
        }
        assert_eq!(retrieval.fallback_count(), 3);
    }
}
