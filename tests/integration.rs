// Integration tests for Tobi components
// These tests verify end-to-end triage behavior across multiple crates
// using in-memory collaborators.

#![cfg(test)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tobi_core::adapter::{AlertStore, Embedder, GraphStore, ReportGenerator};
use tobi_core::bundle::EvidenceDoc;
use tobi_core::error::TriageError;
use tobi_core::model::{
    AgentRef, Alert, AlertData, AlertRule, AnalysisChain, GraphEntity, GraphRelationship,
    TraversalTemplate,
};
use tobi_engine::{BatchDriver, EngineConfig, TriagePipeline};

/// Alert store over in-memory vectors. Evidence searches return the
/// seeded documents; updates are recorded for assertions.
struct MemoryAlertStore {
    unanalyzed: Vec<Alert>,
    similar: Vec<EvidenceDoc>,
    keyword_hits: Vec<EvidenceDoc>,
    updates: Mutex<Vec<(String, Value)>>,
}

impl MemoryAlertStore {
    fn new(unanalyzed: Vec<Alert>) -> Self {
        Self {
            unanalyzed,
            similar: vec![
                EvidenceDoc::new(
                    "hist-1",
                    Some(0.92),
                    json!({"rule": {"description": "SSH brute force attack detected"},
                           "timestamp": "2026-08-29T10:00:00Z"}),
                ),
                EvidenceDoc::new("hist-2", Some(0.81), json!({})),
            ],
            keyword_hits: vec![EvidenceDoc::new("kw-1", None, json!({"full_log": "sshd: failed"}))],
            updates: Mutex::new(Vec::new()),
        }
    }

    fn updates_for(&self, id: &str) -> Vec<Value> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(doc, _)| doc == id)
            .map(|(_, patch)| patch.clone())
            .collect()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn search_vector_similar(
        &self,
        _vector: &[f32],
        k: usize,
        _analyzed_only: bool,
    ) -> Result<Vec<EvidenceDoc>, TriageError> {
        Ok(self.similar.iter().take(k).cloned().collect())
    }

    async fn search_keyword_time_range(
        &self,
        _keywords: &[String],
        _host: Option<&str>,
        _window_minutes: i64,
        _center: DateTime<Utc>,
    ) -> Result<Vec<EvidenceDoc>, TriageError> {
        Ok(self.keyword_hits.clone())
    }

    async fn query_unanalyzed(&self, limit: usize) -> Result<Vec<Alert>, TriageError> {
        Ok(self.unanalyzed.iter().take(limit).cloned().collect())
    }

    async fn update_document(
        &self,
        _index: &str,
        id: &str,
        patch: Value,
    ) -> Result<(), TriageError> {
        self.updates.lock().unwrap().push((id.to_string(), patch));
        Ok(())
    }
}

/// Graph store over hash maps, with the same idempotent merge semantics
/// the real store provides. Traversals return nothing: the interesting
/// integration paths are merge convergence and hybrid fallback.
#[derive(Default)]
struct MemoryGraph {
    nodes: Mutex<HashMap<String, serde_json::Map<String, Value>>>,
    edges: Mutex<HashSet<(String, String, String)>>,
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn run_traversal(
        &self,
        _template: TraversalTemplate,
        _params: Value,
    ) -> Result<Vec<EvidenceDoc>, TriageError> {
        Ok(Vec::new())
    }

    async fn merge_node(&self, entity: &GraphEntity) -> Result<bool, TriageError> {
        let mut nodes = self.nodes.lock().unwrap();
        match nodes.get_mut(&entity.id) {
            Some(existing) => {
                for (key, value) in &entity.properties {
                    existing.insert(key.clone(), value.clone());
                }
                Ok(false)
            }
            None => {
                nodes.insert(entity.id.clone(), entity.properties.clone());
                Ok(true)
            }
        }
    }

    async fn merge_edge(&self, relationship: &GraphRelationship) -> Result<bool, TriageError> {
        let key = (
            relationship.rel_type.name().to_string(),
            relationship.source_id.clone(),
            relationship.target_id.clone(),
        );
        Ok(self.edges.lock().unwrap().insert(key))
    }

    async fn ensure_index(&self, _label: &str, _property: &str) -> Result<(), TriageError> {
        Ok(())
    }
}

struct StubEmbedder;

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>, TriageError> {
        Ok(vec![0.1; 8])
    }
    async fn embed_alert(&self, _alert: &Alert) -> Result<Vec<f32>, TriageError> {
        Ok(vec![0.1; 8])
    }
}

struct StubGenerator {
    report: &'static str,
}

#[async_trait]
impl ReportGenerator for StubGenerator {
    async fn generate(
        &self,
        _chain: AnalysisChain,
        _sections: &BTreeMap<String, String>,
    ) -> Result<String, TriageError> {
        Ok(self.report.to_string())
    }
    fn provider(&self) -> &str {
        "stub"
    }
}

fn ssh_alert(id: &str) -> Alert {
    Alert {
        id: id.into(),
        index: "alerts".into(),
        timestamp: Utc::now(),
        rule: AlertRule {
            id: "5712".into(),
            description: "SSH brute force attack detected".into(),
            level: 10,
            groups: vec!["authentication".into(), "attack".into()],
        },
        agent: AgentRef {
            id: Some("001".into()),
            name: Some("web-01".into()),
            ip: Some("10.0.0.5".into()),
        },
        data: AlertData {
            src_ip: Some("203.0.113.9".into()),
            user: Some("root".into()),
            ..Default::default()
        },
    }
}

fn pipeline(
    store: Arc<MemoryAlertStore>,
    graph: Arc<MemoryGraph>,
    report: &'static str,
) -> Arc<TriagePipeline> {
    Arc::new(TriagePipeline::new(
        store,
        Arc::new(StubEmbedder),
        graph,
        Arc::new(StubGenerator { report }),
        EngineConfig::default(),
    ))
}

#[tokio::test]
async fn full_triage_writes_analysis_and_graph() {
    let store = Arc::new(MemoryAlertStore::new(Vec::new()));
    let graph = Arc::new(MemoryGraph::default());
    let p = pipeline(
        store.clone(),
        graph.clone(),
        "Confirmed intrusion. Risk level: critical",
    );

    let outcome = p.triage(&ssh_alert("a1")).await;
    assert!(outcome.succeeded());

    // Analysis patch carries the report, risk level and vector
    let updates = store.updates_for("a1");
    assert_eq!(updates.len(), 2);
    let analysis = &updates[0]["analysis"];
    assert_eq!(analysis["risk_level"], "critical");
    assert_eq!(analysis["provider"], "stub");
    assert!(updates[0]["vector"].is_array());
    assert!(updates[1]["graphMetadata"]["entities"].as_u64().unwrap() > 0);

    // Graph received the alert, host, source ip and user entities plus
    // the similar-alert entities materialized from context
    let nodes = graph.nodes.lock().unwrap();
    assert!(nodes.contains_key("alert_a1"));
    assert!(nodes.contains_key("host_001"));
    assert!(nodes.contains_key("ip_203.0.113.9"));
    assert!(nodes.contains_key("user_root"));
    assert!(nodes.contains_key("alert_hist-1"));

    let edges = graph.edges.lock().unwrap();
    assert!(edges.contains(&(
        "TRIGGERED_ON".to_string(),
        "alert_a1".to_string(),
        "host_001".to_string()
    )));
    assert!(edges.contains(&(
        "SIMILAR_TO".to_string(),
        "alert_a1".to_string(),
        "alert_hist-1".to_string()
    )));
}

#[tokio::test]
async fn repeated_triage_converges_in_the_graph() {
    let store = Arc::new(MemoryAlertStore::new(Vec::new()));
    let graph = Arc::new(MemoryGraph::default());
    let p = pipeline(store, graph.clone(), "Risk level: high");

    let first = p.triage(&ssh_alert("a1")).await;
    let first_report = first.graph.unwrap();
    assert!(first_report.nodes_created > 0);

    let node_count = graph.nodes.lock().unwrap().len();
    let edge_count = graph.edges.lock().unwrap().len();

    let second = p.triage(&ssh_alert("a1")).await;
    let second_report = second.graph.unwrap();
    assert!(second_report.success);
    assert_eq!(second_report.nodes_created, 0);
    assert_eq!(second_report.relationships_created, 0);
    assert_eq!(graph.nodes.lock().unwrap().len(), node_count);
    assert_eq!(graph.edges.lock().unwrap().len(), edge_count);
}

#[tokio::test]
async fn thin_graph_evidence_falls_back_to_traditional() {
    let store = Arc::new(MemoryAlertStore::new(Vec::new()));
    let graph = Arc::new(MemoryGraph::default());
    let p = pipeline(store.clone(), graph, "Risk level: medium");

    let outcome = p.triage(&ssh_alert("a1")).await;
    assert!(outcome.succeeded());
    assert_eq!(p.fallback_count(), 1);

    // The empty graph forced the traditional chain and the supplement
    // categories carry the store's evidence
    let analysis = outcome.analysis.unwrap();
    assert_eq!(analysis.strategy, "traditional_analysis");
    assert!(analysis
        .evidence_counts
        .contains_key("traditional_similar_alerts"));
    assert!(analysis.evidence_counts.contains_key("traditional_logs"));
}

#[tokio::test]
async fn batch_triages_all_unanalyzed_alerts() {
    let store = Arc::new(MemoryAlertStore::new(vec![
        ssh_alert("a1"),
        ssh_alert("a2"),
        ssh_alert("a3"),
    ]));
    let graph = Arc::new(MemoryGraph::default());
    let p = pipeline(store.clone(), graph, "Risk level: high");

    let (summary, outcomes) = BatchDriver::new(p).run().await.unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.fallback_count, 3);
    assert!(outcomes.iter().all(|o| o.succeeded()));

    // Every alert got its analysis written back
    for id in ["a1", "a2", "a3"] {
        assert!(!store.updates_for(id).is_empty());
    }
}

#[tokio::test]
async fn decision_output_drives_retrieval_categories() {
    // The decision engine's request mix for an SSH brute-force alert
    // surfaces as populated bundle categories on the analysis result.
    let store = Arc::new(MemoryAlertStore::new(Vec::new()));
    let graph = Arc::new(MemoryGraph::default());
    let p = pipeline(store, graph, "Risk level: high");

    let outcome = p.triage(&ssh_alert("a1")).await;
    let counts = outcome.analysis.unwrap().evidence_counts;

    assert_eq!(counts["traditional_similar_alerts"], 2);
    assert!(counts["traditional_logs"] >= 1);
}
