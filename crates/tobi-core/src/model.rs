//! Alert, evidence-request and graph data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One security alert as read from the alert index.
///
/// Alerts are immutable inputs: the engine only ever appends an `analysis`
/// object and a `vector` field back to the stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Document id in the alert index
    #[serde(default)]
    pub id: String,

    /// Index the document was read from
    #[serde(default)]
    pub index: String,

    /// Event timestamp
    #[serde(alias = "@timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Rule that fired
    pub rule: AlertRule,

    /// Originating host
    #[serde(default)]
    pub agent: AgentRef,

    /// Free-form event fields (source/destination IP, user, process, ...)
    #[serde(default)]
    pub data: AlertData,
}

/// Detection rule metadata carried on every alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub description: String,
    /// Severity level, 0-15+
    pub level: u8,
    /// Group tags ("system", "authentication", "attack", ...)
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Reference to the host the alert fired on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRef {
    pub id: Option<String>,
    pub name: Option<String>,
    pub ip: Option<String>,
}

/// Event data fields the engine reads; everything else stays in `extra`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertData {
    #[serde(alias = "srcip")]
    pub src_ip: Option<String>,
    #[serde(alias = "dstip")]
    pub dest_ip: Option<String>,
    #[serde(alias = "dstuser")]
    pub user: Option<String>,
    #[serde(alias = "srcuser")]
    pub src_user: Option<String>,
    pub process: Option<ProcessInfo>,
    #[serde(alias = "path")]
    pub file_path: Option<String>,
    pub protocol: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Process data embedded in an alert
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: Option<i64>,
    pub ppid: Option<i64>,
    pub name: Option<String>,
    pub cmdline: Option<String>,
}

impl Alert {
    /// Rule description lowercased, the form every keyword rule matches on
    pub fn description_lower(&self) -> String {
        self.rule.description.to_lowercase()
    }

    /// Best available host key: agent id, falling back to agent name
    pub fn host_key(&self) -> Option<&str> {
        self.agent
            .id
            .as_deref()
            .or(self.agent.name.as_deref())
            .filter(|k| !k.is_empty())
    }
}

/// Priority of an evidence request. Declaration order is the sort order:
/// critical requests run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

/// Graph traversal templates the graph store knows how to run.
///
/// The concrete query text lives with the graph adapter; the engine only
/// binds parameters (alert id, lookback) to a template name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalTemplate {
    AttackPath,
    LateralMovement,
    ProcessChain,
    FileInteraction,
    NetworkTopology,
    UserBehavior,
    IpReputation,
    ThreatLandscape,
    TemporalCorrelation,
}

impl TraversalTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            TraversalTemplate::AttackPath => "attack_path_analysis",
            TraversalTemplate::LateralMovement => "lateral_movement_detection",
            TraversalTemplate::ProcessChain => "process_chain_analysis",
            TraversalTemplate::FileInteraction => "file_interaction_analysis",
            TraversalTemplate::NetworkTopology => "network_topology_analysis",
            TraversalTemplate::UserBehavior => "user_behavior_analysis",
            TraversalTemplate::IpReputation => "ip_reputation_check",
            TraversalTemplate::ThreatLandscape => "threat_landscape_overview",
            TraversalTemplate::TemporalCorrelation => "temporal_correlation",
        }
    }
}

/// What to run against which store. Closed set: adding a kind means
/// touching every match on this enum, which is intended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidenceQuery {
    /// k-nearest-neighbour search over alert embeddings
    VectorSimilarity { k: usize, analyzed_only: bool },
    /// Keyword search restricted to a time window around the alert
    KeywordTimeRange {
        keywords: Vec<String>,
        window_minutes: i64,
    },
    /// Parameterized traversal over the knowledge graph
    GraphTraversal {
        template: TraversalTemplate,
        lookback_minutes: i64,
    },
}

/// A decision-engine output: one query specification plus scheduling hints.
/// Ephemeral, lives only within one alert's processing cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRequest {
    pub query: EvidenceQuery,
    pub description: String,
    pub priority: Priority,
}

impl EvidenceRequest {
    pub fn new(query: EvidenceQuery, description: &str, priority: Priority) -> Self {
        Self {
            query,
            description: description.to_string(),
            priority,
        }
    }
}

/// Risk level parsed out of a generated report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
    Informational,
}

impl RiskLevel {
    /// Scan report text for a risk keyword. Token-priority order,
    /// case-insensitive, first hit wins; absent tokens mean `Medium`.
    pub fn from_report(report: &str) -> Self {
        let lower = report.to_lowercase();
        for (token, level) in [
            ("critical", RiskLevel::Critical),
            ("high", RiskLevel::High),
            ("medium", RiskLevel::Medium),
            ("low", RiskLevel::Low),
            ("informational", RiskLevel::Informational),
        ] {
            if lower.contains(token) {
                return level;
            }
        }
        RiskLevel::Medium
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "critical",
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
            RiskLevel::Informational => "informational",
        }
    }
}

/// Which analysis template the report generator should run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisChain {
    /// Graph-shaped evidence: attack paths, lateral movement, reputation
    Comprehensive,
    /// Similarity/metrics/log evidence only
    Traditional,
}

impl AnalysisChain {
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisChain::Comprehensive => "comprehensive_graph_analysis",
            AnalysisChain::Traditional => "traditional_analysis",
        }
    }
}

/// The generated report plus triage metadata, written once per alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub report: String,
    pub provider: String,
    pub risk_level: RiskLevel,
    /// Evidence items that contributed, per context category
    pub evidence_counts: std::collections::BTreeMap<String, usize>,
    pub strategy: String,
    pub generated_at: DateTime<Utc>,
}

/// Node types in the knowledge graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Alert,
    Host,
    IpAddress,
    User,
    Process,
    File,
    ThreatIndicator,
}

impl EntityType {
    /// Graph label for this type
    pub fn label(&self) -> &'static str {
        match self {
            EntityType::Alert => "Alert",
            EntityType::Host => "Host",
            EntityType::IpAddress => "IPAddress",
            EntityType::User => "User",
            EntityType::Process => "Process",
            EntityType::File => "File",
            EntityType::ThreatIndicator => "ThreatIndicator",
        }
    }
}

/// A typed graph node with a deterministic, content-derived id.
///
/// The id being a pure function of the identifying properties is what makes
/// repeated extraction of the same real-world object converge to one node
/// under idempotent merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEntity {
    pub entity_type: EntityType,
    pub id: String,
    pub properties: serde_json::Map<String, Value>,
}

impl GraphEntity {
    pub fn new(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self {
            entity_type,
            id: id.into(),
            properties: serde_json::Map::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }
}

/// Edge types in the knowledge graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    TriggeredOn,
    HasSourceIp,
    InvolvesUser,
    InvolvesProcess,
    AccessesFile,
    SimilarTo,
    Precedes,
}

impl RelationshipType {
    pub fn name(&self) -> &'static str {
        match self {
            RelationshipType::TriggeredOn => "TRIGGERED_ON",
            RelationshipType::HasSourceIp => "HAS_SOURCE_IP",
            RelationshipType::InvolvesUser => "INVOLVES_USER",
            RelationshipType::InvolvesProcess => "INVOLVES_PROCESS",
            RelationshipType::AccessesFile => "ACCESSES_FILE",
            RelationshipType::SimilarTo => "SIMILAR_TO",
            RelationshipType::Precedes => "PRECEDES",
        }
    }
}

/// A typed edge between two entities. Merge semantics are idempotent on
/// `(type, source_id, target_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub rel_type: RelationshipType,
    pub source_id: String,
    pub target_id: String,
    pub properties: serde_json::Map<String, Value>,
}

impl GraphRelationship {
    pub fn new(
        rel_type: RelationshipType,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            rel_type,
            source_id: source_id.into(),
            target_id: target_id.into(),
            properties: serde_json::Map::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_sorts_critical_first() {
        let mut priorities = vec![Priority::Low, Priority::Critical, Priority::Medium, Priority::High];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![Priority::Critical, Priority::High, Priority::Medium, Priority::Low]
        );
    }

    #[test]
    fn risk_level_first_token_wins() {
        assert_eq!(
            RiskLevel::from_report("Overall risk: CRITICAL. Low chance of false positive."),
            RiskLevel::Critical
        );
        assert_eq!(RiskLevel::from_report("low severity noise"), RiskLevel::Low);
        assert_eq!(RiskLevel::from_report("nothing to report"), RiskLevel::Medium);
    }

    #[test]
    fn alert_host_key_prefers_agent_id() {
        let mut alert = sample_alert();
        assert_eq!(alert.host_key(), Some("001"));
        alert.agent.id = None;
        assert_eq!(alert.host_key(), Some("web-01"));
    }

    pub(crate) fn sample_alert() -> Alert {
        Alert {
            id: "alert-1".to_string(),
            index: "alerts-2026.08".to_string(),
            timestamp: chrono::Utc::now(),
            rule: AlertRule {
                id: "5710".to_string(),
                description: "sshd: attempt to login using a non-existent user".to_string(),
                level: 5,
                groups: vec!["authentication_failed".to_string(), "sshd".to_string()],
            },
            agent: AgentRef {
                id: Some("001".to_string()),
                name: Some("web-01".to_string()),
                ip: Some("10.0.4.12".to_string()),
            },
            data: AlertData::default(),
        }
    }
}
