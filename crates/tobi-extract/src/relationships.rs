//! Relationship derivation: typed edges from the alert entity outward

use crate::entities::ExtractedEntities;
use serde_json::json;
use tobi_core::model::{Alert, GraphRelationship, RelationshipType};

/// Phase two: edges referencing the extracted entities. The alert entity
/// is always the source, except for PRECEDES chains which order alert
/// entities by timestamp.
pub fn derive_relationships(
    alert: &Alert,
    extracted: &ExtractedEntities,
) -> Vec<GraphRelationship> {
    let alert_id = &extracted.alert_entity_id;
    let description = alert.description_lower();
    let mut relationships = Vec::new();

    for host_id in &extracted.host_ids {
        relationships.push(GraphRelationship::new(
            RelationshipType::TriggeredOn,
            alert_id,
            host_id,
        ));
    }

    for ip_id in &extracted.source_ip_ids {
        let mut edge = GraphRelationship::new(RelationshipType::HasSourceIp, alert_id, ip_id);
        if let Some(protocol) = &alert.data.protocol {
            edge = edge.with_property("protocol", json!(protocol));
        }
        relationships.push(edge);
    }

    for user_id in &extracted.user_ids {
        relationships.push(
            GraphRelationship::new(RelationshipType::InvolvesUser, alert_id, user_id)
                .with_property("action", json!(classify_user_action(&description))),
        );
    }

    for process_id in &extracted.process_ids {
        relationships.push(GraphRelationship::new(
            RelationshipType::InvolvesProcess,
            alert_id,
            process_id,
        ));
    }

    for file_id in &extracted.file_ids {
        relationships.push(
            GraphRelationship::new(RelationshipType::AccessesFile, alert_id, file_id)
                .with_property("access", json!(classify_file_access(&description))),
        );
    }

    for (similar_id, score) in &extracted.similar {
        relationships.push(
            GraphRelationship::new(RelationshipType::SimilarTo, alert_id, similar_id)
                .with_property("similarity", json!(score)),
        );
    }

    // PRECEDES chains only make sense with more than one dated alert entity
    if extracted.alert_timeline.len() > 1 {
        let mut timeline = extracted.alert_timeline.clone();
        timeline.sort_by_key(|(_, ts)| *ts);
        for pair in timeline.windows(2) {
            let (earlier_id, earlier_ts) = &pair[0];
            let (later_id, later_ts) = &pair[1];
            let delta = (*later_ts - *earlier_ts).num_seconds().abs();
            relationships.push(
                GraphRelationship::new(RelationshipType::Precedes, earlier_id, later_id)
                    .with_property("delta_seconds", json!(delta)),
            );
        }
    }

    relationships
}

/// Action type on INVOLVES_USER edges, from description keywords
fn classify_user_action(description: &str) -> &'static str {
    if ["login", "logon", "auth", "password", "credential"]
        .iter()
        .any(|k| description.contains(k))
    {
        "authentication"
    } else if ["ssh", "rdp", "remote", "vpn"]
        .iter()
        .any(|k| description.contains(k))
    {
        "remote_access"
    } else if description.contains("file") {
        "file_access"
    } else {
        "unknown"
    }
}

/// Access type on ACCESSES_FILE edges
fn classify_file_access(description: &str) -> &'static str {
    if ["writ", "creat", "modif", "chang", "add"]
        .iter()
        .any(|k| description.contains(k))
    {
        "write"
    } else if ["read", "open"].iter().any(|k| description.contains(k)) {
        "read"
    } else if ["delet", "remov"].iter().any(|k| description.contains(k)) {
        "delete"
    } else {
        "access"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityExtractor;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use tobi_core::bundle::{ContextBundle, ContextCategory, EvidenceDoc};
    use tobi_core::model::{AgentRef, AlertData, AlertRule};

    fn alert(description: &str) -> Alert {
        Alert {
            id: "a1".into(),
            index: "alerts".into(),
            timestamp: Utc::now(),
            rule: AlertRule {
                id: "1".into(),
                description: description.into(),
                level: 8,
                groups: vec![],
            },
            agent: AgentRef {
                id: Some("001".into()),
                name: Some("web-01".into()),
                ip: None,
            },
            data: AlertData {
                src_ip: Some("203.0.113.9".into()),
                user: Some("alice".into()),
                file_path: Some("/etc/shadow".into()),
                ..AlertData::default()
            },
        }
    }

    #[test]
    fn alert_is_the_source_of_every_direct_edge() {
        let extractor = EntityExtractor::default();
        let graph = extractor.extract(&alert("File integrity changed"), &ContextBundle::new(), "");
        for edge in &graph.relationships {
            if !matches!(edge.rel_type, RelationshipType::Precedes) {
                assert_eq!(edge.source_id, "alert_a1");
            }
        }
        assert!(graph
            .relationships
            .iter()
            .any(|e| matches!(e.rel_type, RelationshipType::TriggeredOn)));
        assert!(graph
            .relationships
            .iter()
            .any(|e| matches!(e.rel_type, RelationshipType::HasSourceIp)));
    }

    #[test]
    fn user_action_and_file_access_classification() {
        assert_eq!(classify_user_action("failed login attempt"), "authentication");
        assert_eq!(classify_user_action("ssh session opened"), "remote_access");
        assert_eq!(classify_user_action("file permissions altered"), "file_access");
        assert_eq!(classify_user_action("something odd"), "unknown");

        assert_eq!(classify_file_access("file was modified"), "write");
        assert_eq!(classify_file_access("file read by process"), "read");
        assert_eq!(classify_file_access("entry deleted from disk"), "delete");
        assert_eq!(classify_file_access("suspicious activity"), "access");
    }

    #[test]
    fn precedes_chain_orders_by_timestamp_with_deltas() {
        let extractor = EntityExtractor::default();
        let now = Utc::now();
        let mut bundle = ContextBundle::new();
        bundle.extend(
            ContextCategory::SimilarAlerts,
            vec![
                EvidenceDoc::new(
                    "old",
                    Some(0.9),
                    json!({"timestamp": (now - Duration::seconds(120)).to_rfc3339()}),
                ),
                EvidenceDoc::new(
                    "older",
                    Some(0.8),
                    json!({"timestamp": (now - Duration::seconds(300)).to_rfc3339()}),
                ),
            ],
        );
        let mut base = alert("correlated event");
        base.timestamp = now;
        let graph = extractor.extract(&base, &bundle, "");

        let precedes: Vec<_> = graph
            .relationships
            .iter()
            .filter(|e| matches!(e.rel_type, RelationshipType::Precedes))
            .collect();
        assert_eq!(precedes.len(), 2);
        assert_eq!(precedes[0].source_id, "alert_older");
        assert_eq!(precedes[0].target_id, "alert_old");
        assert_eq!(precedes[0].properties["delta_seconds"], 180);
        assert_eq!(precedes[1].source_id, "alert_old");
        assert_eq!(precedes[1].target_id, "alert_a1");
        assert_eq!(precedes[1].properties["delta_seconds"], 120);
    }

    #[test]
    fn similar_to_edges_carry_similarity() {
        let extractor = EntityExtractor::default();
        let mut bundle = ContextBundle::new();
        bundle.extend(
            ContextCategory::SimilarAlerts,
            (0..7)
                .map(|i| EvidenceDoc::new(format!("s{i}"), Some(0.9 - i as f64 / 10.0), json!({})))
                .collect(),
        );
        let graph = extractor.extract(&alert("repeat offender"), &bundle, "");
        let similar: Vec<_> = graph
            .relationships
            .iter()
            .filter(|e| matches!(e.rel_type, RelationshipType::SimilarTo))
            .collect();
        assert_eq!(similar.len(), 5);
        assert_eq!(similar[0].properties["similarity"], 0.9);
    }
}
