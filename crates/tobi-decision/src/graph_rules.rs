//! Graph-oriented evidence rules: traversal requests over the knowledge graph

use crate::keywords::{groups_intersect, is_resource_exhaustion, is_security_event};
use crate::EvidenceRule;
use tobi_core::model::{EvidenceQuery, EvidenceRequest, Priority, TraversalTemplate};

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

fn traversal(
    template: TraversalTemplate,
    lookback_minutes: i64,
    description: &str,
    priority: Priority,
) -> EvidenceRequest {
    EvidenceRequest::new(
        EvidenceQuery::GraphTraversal {
            template,
            lookback_minutes,
        },
        description,
        priority,
    )
}

/// The graph rule table. Lookbacks vary with what each traversal looks for:
/// tight windows for temporal clustering, up to 30 days for IP reputation.
pub fn graph_rule_table() -> Vec<EvidenceRule> {
    vec![
        EvidenceRule {
            name: "attack_path",
            matches: is_security_event,
            emit: |alert| {
                let priority = if alert.rule.level >= 10 {
                    Priority::Critical
                } else {
                    Priority::High
                };
                vec![traversal(
                    TraversalTemplate::AttackPath,
                    MINUTES_PER_DAY,
                    "attack paths touching this host",
                    priority,
                )]
            },
        },
        EvidenceRule {
            name: "lateral_movement",
            matches: |alert| {
                groups_intersect(&alert.rule.groups, &["authentication", "attack"])
                    || alert.rule.level >= 7
            },
            emit: |_| {
                vec![traversal(
                    TraversalTemplate::LateralMovement,
                    4 * MINUTES_PER_HOUR,
                    "lateral movement around the host",
                    Priority::High,
                )]
            },
        },
        EvidenceRule {
            name: "process_chain",
            matches: |alert| alert.data.process.is_some() || is_resource_exhaustion(alert),
            emit: |_| {
                vec![traversal(
                    TraversalTemplate::ProcessChain,
                    2 * MINUTES_PER_HOUR,
                    "process ancestry chains",
                    Priority::Medium,
                )]
            },
        },
        EvidenceRule {
            name: "file_interaction",
            matches: |alert| {
                alert.data.file_path.is_some()
                    || alert.description_lower().contains("file")
                    || alert.rule.level >= 10
            },
            emit: |_| {
                vec![traversal(
                    TraversalTemplate::FileInteraction,
                    MINUTES_PER_DAY,
                    "file interactions across alerts",
                    Priority::Medium,
                )]
            },
        },
        EvidenceRule {
            name: "network_topology",
            matches: |alert| {
                alert.data.src_ip.is_some()
                    || alert.data.dest_ip.is_some()
                    || alert.description_lower().contains("network")
            },
            emit: |_| {
                vec![traversal(
                    TraversalTemplate::NetworkTopology,
                    6 * MINUTES_PER_HOUR,
                    "network topology around involved addresses",
                    Priority::Medium,
                )]
            },
        },
        EvidenceRule {
            name: "user_behavior",
            matches: |alert| alert.data.user.is_some() || alert.data.src_user.is_some(),
            emit: |_| {
                vec![traversal(
                    TraversalTemplate::UserBehavior,
                    7 * MINUTES_PER_DAY,
                    "historical behavior of involved users",
                    Priority::Medium,
                )]
            },
        },
        EvidenceRule {
            name: "ip_reputation",
            matches: |alert| alert.data.src_ip.is_some(),
            emit: |_| {
                vec![traversal(
                    TraversalTemplate::IpReputation,
                    30 * MINUTES_PER_DAY,
                    "reputation of the source address",
                    Priority::High,
                )]
            },
        },
        EvidenceRule {
            name: "threat_landscape",
            matches: |alert| alert.rule.level >= 10,
            emit: |_| {
                vec![traversal(
                    TraversalTemplate::ThreatLandscape,
                    7 * MINUTES_PER_DAY,
                    "recent threat landscape overview",
                    Priority::Low,
                )]
            },
        },
        EvidenceRule {
            name: "temporal_correlation",
            matches: |_| true,
            emit: |_| {
                vec![traversal(
                    TraversalTemplate::TemporalCorrelation,
                    30,
                    "temporally adjacent alerts",
                    Priority::Medium,
                )]
            },
        },
    ]
}
