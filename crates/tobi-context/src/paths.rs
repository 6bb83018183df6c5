//! Simplified path notation for graph evidence
//!
//! Renders salient relationships one per line as
//! `(EntityType:value) -[RELATION: detail]-> (EntityType:value)`,
//! bounded per category to control prompt size.

use serde_json::Value;
use tobi_core::bundle::{ContextBundle, ContextCategory, EvidenceDoc};

/// Lines rendered per graph category
const MAX_LINES_PER_CATEGORY: usize = 5;

/// One path-notation line
pub fn path_line(
    src_type: &str,
    src_value: &str,
    relation: &str,
    detail: &str,
    dst_type: &str,
    dst_value: &str,
) -> String {
    format!("({src_type}:{src_value}) -[{relation}: {detail}]-> ({dst_type}:{dst_value})")
}

const GRAPH_CATEGORIES: [ContextCategory; 9] = [
    ContextCategory::AttackPaths,
    ContextCategory::LateralMovement,
    ContextCategory::ProcessChains,
    ContextCategory::FileInteractions,
    ContextCategory::NetworkTopology,
    ContextCategory::UserBehavior,
    ContextCategory::IpReputation,
    ContextCategory::ThreatLandscape,
    ContextCategory::TemporalSequences,
];

/// Render graph evidence as path lines. Falls back to traditional-evidence
/// summaries in the same notation, then to canned no-correlation lines.
pub fn render_correlation_paths(alert_id: &str, bundle: &ContextBundle) -> Vec<String> {
    let mut lines = Vec::new();

    for category in GRAPH_CATEGORIES {
        for doc in bundle.get(category).iter().take(MAX_LINES_PER_CATEGORY) {
            lines.push(render_doc(alert_id, category, doc));
        }
    }
    if !lines.is_empty() {
        return lines;
    }

    // No graph evidence: render what traditional retrieval found
    for doc in bundle
        .similar_alerts
        .iter()
        .chain(bundle.traditional_similar_alerts.iter())
        .take(MAX_LINES_PER_CATEGORY)
    {
        let detail = doc
            .score
            .map(|s| format!("{s:.2}"))
            .unwrap_or_else(|| "similar".to_string());
        lines.push(path_line(
            "Alert", alert_id, "SIMILAR_TO", &detail, "Alert", &doc.id,
        ));
    }
    for doc in bundle
        .traditional_logs
        .iter()
        .chain(bundle.network_logs.iter())
        .take(MAX_LINES_PER_CATEGORY)
    {
        lines.push(path_line(
            "Alert",
            alert_id,
            "OBSERVED_WITH",
            "time-window log",
            "Event",
            &doc.id,
        ));
    }
    if !lines.is_empty() {
        return lines;
    }

    vec![
        path_line(
            "Alert",
            alert_id,
            "NO_CORRELATION",
            "no graph paths",
            "Graph",
            "empty",
        ),
        path_line(
            "Alert",
            alert_id,
            "NO_CORRELATION",
            "no similar alerts",
            "Index",
            "empty",
        ),
    ]
}

/// One graph record as a path line. Structured source/target fields are
/// used when the traversal returned them; otherwise a generic line ties
/// the record to its category.
fn render_doc(alert_id: &str, category: ContextCategory, doc: &EvidenceDoc) -> String {
    let source = endpoint(&doc.body, "source");
    let target = endpoint(&doc.body, "target");
    let relation = doc
        .body
        .get("relation")
        .and_then(Value::as_str)
        .map(str::to_uppercase)
        .unwrap_or_else(|| "CORRELATES".to_string());
    let detail = doc
        .body
        .get("detail")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| category.name().replace('_', " "));

    match (source, target) {
        (Some((src_type, src_value)), Some((dst_type, dst_value))) => path_line(
            &src_type, &src_value, &relation, &detail, &dst_type, &dst_value,
        ),
        _ => path_line("Alert", alert_id, &relation, &detail, "Record", &doc.id),
    }
}

/// `{"type": ..., "value": ...}` endpoints, tolerating bare strings
fn endpoint(body: &Value, key: &str) -> Option<(String, String)> {
    let node = body.get(key)?;
    if let Some(value) = node.as_str() {
        return Some(("Node".to_string(), value.to_string()));
    }
    let value = node.get("value").and_then(Value::as_str)?;
    let node_type = node
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("Node");
    Some((node_type.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_records_render_endpoints() {
        let mut bundle = ContextBundle::new();
        bundle.extend(
            ContextCategory::LateralMovement,
            vec![EvidenceDoc::new(
                "r1",
                None,
                json!({
                    "source": {"type": "Host", "value": "web-01"},
                    "target": {"type": "Host", "value": "db-02"},
                    "relation": "moved_to",
                    "detail": "ssh within 4h",
                }),
            )],
        );
        let lines = render_correlation_paths("a1", &bundle);
        assert_eq!(lines, vec!["(Host:web-01) -[MOVED_TO: ssh within 4h]-> (Host:db-02)"]);
    }

    #[test]
    fn graph_lines_are_bounded_per_category() {
        let mut bundle = ContextBundle::new();
        bundle.extend(
            ContextCategory::AttackPaths,
            (0..9)
                .map(|i| EvidenceDoc::new(format!("p{i}"), None, json!({})))
                .collect(),
        );
        let lines = render_correlation_paths("a1", &bundle);
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn traditional_fallback_uses_same_notation() {
        let mut bundle = ContextBundle::new();
        bundle.extend(
            ContextCategory::SimilarAlerts,
            vec![EvidenceDoc::new("s1", Some(0.87), json!({}))],
        );
        let lines = render_correlation_paths("a1", &bundle);
        assert_eq!(lines, vec!["(Alert:a1) -[SIMILAR_TO: 0.87]-> (Alert:s1)"]);
    }

    #[test]
    fn empty_bundle_emits_canned_lines() {
        let lines = render_correlation_paths("a1", &ContextBundle::new());
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.contains("NO_CORRELATION")));
    }
}
