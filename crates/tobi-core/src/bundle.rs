//! Context bundle: the categorized output of one alert's retrieval cycle

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One retrieved evidence record. The engine reads the id and score;
/// the body is passed through opaquely to formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceDoc {
    pub id: String,
    pub score: Option<f64>,
    pub body: Value,
}

impl EvidenceDoc {
    pub fn new(id: impl Into<String>, score: Option<f64>, body: Value) -> Self {
        Self {
            id: id.into(),
            score,
            body,
        }
    }

    /// Read a string field from the body, looking one level deep as well
    pub fn field(&self, key: &str) -> Option<&str> {
        self.body
            .get(key)
            .and_then(Value::as_str)
            .or_else(|| self.body.get("data").and_then(|d| d.get(key)).and_then(Value::as_str))
    }
}

/// Every category a retrieval result can land in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextCategory {
    SimilarAlerts,
    CpuMetrics,
    MemoryMetrics,
    NetworkLogs,
    ProcessData,
    SshLogs,
    WebMetrics,
    UserActivity,
    FilesystemData,
    AdditionalContext,
    AttackPaths,
    LateralMovement,
    ProcessChains,
    FileInteractions,
    NetworkTopology,
    UserBehavior,
    IpReputation,
    ThreatLandscape,
    TemporalSequences,
    TraditionalSimilarAlerts,
    TraditionalMetrics,
    TraditionalLogs,
}

impl ContextCategory {
    pub fn name(&self) -> &'static str {
        match self {
            ContextCategory::SimilarAlerts => "similar_alerts",
            ContextCategory::CpuMetrics => "cpu_metrics",
            ContextCategory::MemoryMetrics => "memory_metrics",
            ContextCategory::NetworkLogs => "network_logs",
            ContextCategory::ProcessData => "process_data",
            ContextCategory::SshLogs => "ssh_logs",
            ContextCategory::WebMetrics => "web_metrics",
            ContextCategory::UserActivity => "user_activity",
            ContextCategory::FilesystemData => "filesystem_data",
            ContextCategory::AdditionalContext => "additional_context",
            ContextCategory::AttackPaths => "attack_paths",
            ContextCategory::LateralMovement => "lateral_movement",
            ContextCategory::ProcessChains => "process_chains",
            ContextCategory::FileInteractions => "file_interactions",
            ContextCategory::NetworkTopology => "network_topology",
            ContextCategory::UserBehavior => "user_behavior",
            ContextCategory::IpReputation => "ip_reputation",
            ContextCategory::ThreatLandscape => "threat_landscape",
            ContextCategory::TemporalSequences => "temporal_sequences",
            ContextCategory::TraditionalSimilarAlerts => "traditional_similar_alerts",
            ContextCategory::TraditionalMetrics => "traditional_metrics",
            ContextCategory::TraditionalLogs => "traditional_logs",
        }
    }
}

/// All retrieved evidence for one alert, by category.
///
/// A fixed struct rather than a string-keyed map: every consumer that
/// matches on categories gets compile-time coverage checking, and "every
/// section always present" holds by construction. Built fresh per alert,
/// never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextBundle {
    pub similar_alerts: Vec<EvidenceDoc>,
    pub cpu_metrics: Vec<EvidenceDoc>,
    pub memory_metrics: Vec<EvidenceDoc>,
    pub network_logs: Vec<EvidenceDoc>,
    pub process_data: Vec<EvidenceDoc>,
    pub ssh_logs: Vec<EvidenceDoc>,
    pub web_metrics: Vec<EvidenceDoc>,
    pub user_activity: Vec<EvidenceDoc>,
    pub filesystem_data: Vec<EvidenceDoc>,
    pub additional_context: Vec<EvidenceDoc>,

    pub attack_paths: Vec<EvidenceDoc>,
    pub lateral_movement: Vec<EvidenceDoc>,
    pub process_chains: Vec<EvidenceDoc>,
    pub file_interactions: Vec<EvidenceDoc>,
    pub network_topology: Vec<EvidenceDoc>,
    pub user_behavior: Vec<EvidenceDoc>,
    pub ip_reputation: Vec<EvidenceDoc>,
    pub threat_landscape: Vec<EvidenceDoc>,
    pub temporal_sequences: Vec<EvidenceDoc>,

    pub traditional_similar_alerts: Vec<EvidenceDoc>,
    pub traditional_metrics: Vec<EvidenceDoc>,
    pub traditional_logs: Vec<EvidenceDoc>,
}

impl ContextBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: ContextCategory) -> &[EvidenceDoc] {
        match category {
            ContextCategory::SimilarAlerts => &self.similar_alerts,
            ContextCategory::CpuMetrics => &self.cpu_metrics,
            ContextCategory::MemoryMetrics => &self.memory_metrics,
            ContextCategory::NetworkLogs => &self.network_logs,
            ContextCategory::ProcessData => &self.process_data,
            ContextCategory::SshLogs => &self.ssh_logs,
            ContextCategory::WebMetrics => &self.web_metrics,
            ContextCategory::UserActivity => &self.user_activity,
            ContextCategory::FilesystemData => &self.filesystem_data,
            ContextCategory::AdditionalContext => &self.additional_context,
            ContextCategory::AttackPaths => &self.attack_paths,
            ContextCategory::LateralMovement => &self.lateral_movement,
            ContextCategory::ProcessChains => &self.process_chains,
            ContextCategory::FileInteractions => &self.file_interactions,
            ContextCategory::NetworkTopology => &self.network_topology,
            ContextCategory::UserBehavior => &self.user_behavior,
            ContextCategory::IpReputation => &self.ip_reputation,
            ContextCategory::ThreatLandscape => &self.threat_landscape,
            ContextCategory::TemporalSequences => &self.temporal_sequences,
            ContextCategory::TraditionalSimilarAlerts => &self.traditional_similar_alerts,
            ContextCategory::TraditionalMetrics => &self.traditional_metrics,
            ContextCategory::TraditionalLogs => &self.traditional_logs,
        }
    }

    pub fn get_mut(&mut self, category: ContextCategory) -> &mut Vec<EvidenceDoc> {
        match category {
            ContextCategory::SimilarAlerts => &mut self.similar_alerts,
            ContextCategory::CpuMetrics => &mut self.cpu_metrics,
            ContextCategory::MemoryMetrics => &mut self.memory_metrics,
            ContextCategory::NetworkLogs => &mut self.network_logs,
            ContextCategory::ProcessData => &mut self.process_data,
            ContextCategory::SshLogs => &mut self.ssh_logs,
            ContextCategory::WebMetrics => &mut self.web_metrics,
            ContextCategory::UserActivity => &mut self.user_activity,
            ContextCategory::FilesystemData => &mut self.filesystem_data,
            ContextCategory::AdditionalContext => &mut self.additional_context,
            ContextCategory::AttackPaths => &mut self.attack_paths,
            ContextCategory::LateralMovement => &mut self.lateral_movement,
            ContextCategory::ProcessChains => &mut self.process_chains,
            ContextCategory::FileInteractions => &mut self.file_interactions,
            ContextCategory::NetworkTopology => &mut self.network_topology,
            ContextCategory::UserBehavior => &mut self.user_behavior,
            ContextCategory::IpReputation => &mut self.ip_reputation,
            ContextCategory::ThreatLandscape => &mut self.threat_landscape,
            ContextCategory::TemporalSequences => &mut self.temporal_sequences,
            ContextCategory::TraditionalSimilarAlerts => &mut self.traditional_similar_alerts,
            ContextCategory::TraditionalMetrics => &mut self.traditional_metrics,
            ContextCategory::TraditionalLogs => &mut self.traditional_logs,
        }
    }

    /// Append evidence to a category
    pub fn extend(&mut self, category: ContextCategory, docs: Vec<EvidenceDoc>) {
        self.get_mut(category).extend(docs);
    }

    pub const ALL_CATEGORIES: [ContextCategory; 22] = [
        ContextCategory::SimilarAlerts,
        ContextCategory::CpuMetrics,
        ContextCategory::MemoryMetrics,
        ContextCategory::NetworkLogs,
        ContextCategory::ProcessData,
        ContextCategory::SshLogs,
        ContextCategory::WebMetrics,
        ContextCategory::UserActivity,
        ContextCategory::FilesystemData,
        ContextCategory::AdditionalContext,
        ContextCategory::AttackPaths,
        ContextCategory::LateralMovement,
        ContextCategory::ProcessChains,
        ContextCategory::FileInteractions,
        ContextCategory::NetworkTopology,
        ContextCategory::UserBehavior,
        ContextCategory::IpReputation,
        ContextCategory::ThreatLandscape,
        ContextCategory::TemporalSequences,
        ContextCategory::TraditionalSimilarAlerts,
        ContextCategory::TraditionalMetrics,
        ContextCategory::TraditionalLogs,
    ];

    /// Total evidence items across all categories
    pub fn total_items(&self) -> usize {
        Self::ALL_CATEGORIES
            .iter()
            .map(|c| self.get(*c).len())
            .sum()
    }

    /// Whether any graph-native category holds evidence. Decides which
    /// analysis chain the report generator runs.
    pub fn is_graph_shaped(&self) -> bool {
        !self.attack_paths.is_empty()
            || !self.lateral_movement.is_empty()
            || !self.temporal_sequences.is_empty()
            || !self.ip_reputation.is_empty()
            || !self.user_behavior.is_empty()
            || !self.process_chains.is_empty()
    }

    /// Per-category item counts, skipping empty categories
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for category in Self::ALL_CATEGORIES {
            let len = self.get(category).len();
            if len > 0 {
                counts.insert(category.name().to_string(), len);
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str) -> EvidenceDoc {
        EvidenceDoc::new(id, Some(0.9), json!({"rule": {"description": "x"}}))
    }

    #[test]
    fn total_items_counts_every_category() {
        let mut bundle = ContextBundle::new();
        bundle.extend(ContextCategory::SimilarAlerts, vec![doc("a"), doc("b")]);
        bundle.extend(ContextCategory::AttackPaths, vec![doc("c")]);
        assert_eq!(bundle.total_items(), 3);
    }

    #[test]
    fn graph_shape_needs_a_graph_category() {
        let mut bundle = ContextBundle::new();
        bundle.extend(ContextCategory::SimilarAlerts, vec![doc("a")]);
        assert!(!bundle.is_graph_shaped());
        bundle.extend(ContextCategory::LateralMovement, vec![doc("b")]);
        assert!(bundle.is_graph_shaped());
    }

    #[test]
    fn counts_skip_empty_categories() {
        let mut bundle = ContextBundle::new();
        bundle.extend(ContextCategory::CpuMetrics, vec![doc("a")]);
        let counts = bundle.counts();
        assert_eq!(counts.get("cpu_metrics"), Some(&1));
        assert!(!counts.contains_key("memory_metrics"));
    }

    #[test]
    fn evidence_doc_reads_nested_fields() {
        let doc = EvidenceDoc::new("x", None, json!({"data": {"srcip": "1.2.3.4"}}));
        assert_eq!(doc.field("srcip"), Some("1.2.3.4"));
    }
}
