//! Named-section assembly and chain selection

use crate::paths::render_correlation_paths;
use serde_json::Value;
use std::collections::BTreeMap;
use tobi_core::bundle::{ContextBundle, EvidenceDoc};
use tobi_core::model::{Alert, AnalysisChain};

/// Sections the comprehensive (graph-shaped) template expects
pub const COMPREHENSIVE_SECTIONS: [&str; 8] = [
    "graph_context",
    "attack_path_analysis",
    "lateral_movement_analysis",
    "process_chain_analysis",
    "user_behavior_analysis",
    "ip_reputation_context",
    "temporal_analysis",
    "supplemental_context",
];

/// Sections the traditional template expects
pub const TRADITIONAL_SECTIONS: [&str; 6] = [
    "similar_alerts_context",
    "system_metrics_context",
    "process_context",
    "network_context",
    "user_activity_context",
    "additional_context",
];

const MAX_DOCS_PER_SECTION: usize = 5;

/// Chain selection is a pure function of bundle shape
pub fn select_chain(bundle: &ContextBundle) -> AnalysisChain {
    if bundle.is_graph_shaped() {
        AnalysisChain::Comprehensive
    } else {
        AnalysisChain::Traditional
    }
}

/// Format a bundle into the named sections its chain's template consumes.
/// Every expected section key is present; empty categories get an explicit
/// absence sentence.
pub fn assemble(alert: &Alert, bundle: &ContextBundle) -> (AnalysisChain, BTreeMap<String, String>) {
    let chain = select_chain(bundle);
    let sections = match chain {
        AnalysisChain::Comprehensive => comprehensive_sections(alert, bundle),
        AnalysisChain::Traditional => traditional_sections(bundle),
    };
    (chain, sections)
}

fn comprehensive_sections(alert: &Alert, bundle: &ContextBundle) -> BTreeMap<String, String> {
    let mut sections = BTreeMap::new();
    sections.insert(
        "graph_context".to_string(),
        render_correlation_paths(&alert.id, bundle).join("\n"),
    );
    insert(
        &mut sections,
        "attack_path_analysis",
        &[&bundle.attack_paths],
        "No attack paths were found in the knowledge graph.",
    );
    insert(
        &mut sections,
        "lateral_movement_analysis",
        &[&bundle.lateral_movement],
        "No lateral movement patterns were detected.",
    );
    insert(
        &mut sections,
        "process_chain_analysis",
        &[&bundle.process_chains],
        "No process ancestry chains were found.",
    );
    insert(
        &mut sections,
        "user_behavior_analysis",
        &[&bundle.user_behavior],
        "No historical user behavior was found.",
    );
    insert(
        &mut sections,
        "ip_reputation_context",
        &[&bundle.ip_reputation],
        "No reputation data was found for the involved addresses.",
    );
    insert(
        &mut sections,
        "temporal_analysis",
        &[&bundle.temporal_sequences],
        "No temporally adjacent alerts were found.",
    );
    insert(
        &mut sections,
        "supplemental_context",
        &[
            &bundle.traditional_similar_alerts,
            &bundle.traditional_metrics,
            &bundle.traditional_logs,
        ],
        "No supplemental evidence was retrieved.",
    );
    sections
}

fn traditional_sections(bundle: &ContextBundle) -> BTreeMap<String, String> {
    let mut sections = BTreeMap::new();
    insert(
        &mut sections,
        "similar_alerts_context",
        &[&bundle.similar_alerts],
        "No similar historical alerts were found.",
    );
    insert(
        &mut sections,
        "system_metrics_context",
        &[&bundle.cpu_metrics, &bundle.memory_metrics],
        "No system metrics were found for the alert window.",
    );
    insert(
        &mut sections,
        "process_context",
        &[&bundle.process_data],
        "No process information was found.",
    );
    insert(
        &mut sections,
        "network_context",
        &[&bundle.network_logs, &bundle.ssh_logs],
        "No network activity was found for the alert window.",
    );
    insert(
        &mut sections,
        "user_activity_context",
        &[&bundle.user_activity],
        "No user activity was found.",
    );
    insert(
        &mut sections,
        "additional_context",
        &[
            &bundle.web_metrics,
            &bundle.filesystem_data,
            &bundle.additional_context,
        ],
        "No additional context was retrieved.",
    );
    sections
}

fn insert(
    sections: &mut BTreeMap<String, String>,
    key: &str,
    sources: &[&Vec<EvidenceDoc>],
    absence: &str,
) {
    let text = summarize(sources).unwrap_or_else(|| absence.to_string());
    sections.insert(key.to_string(), text);
}

fn summarize(sources: &[&Vec<EvidenceDoc>]) -> Option<String> {
    let docs: Vec<&EvidenceDoc> = sources
        .iter()
        .flat_map(|s| s.iter())
        .take(MAX_DOCS_PER_SECTION)
        .collect();
    if docs.is_empty() {
        return None;
    }
    Some(
        docs.iter()
            .map(|doc| summarize_doc(doc))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

fn summarize_doc(doc: &EvidenceDoc) -> String {
    let mut line = format!("- {}", doc.id);
    if let Some(score) = doc.score {
        line.push_str(&format!(" (score {score:.2})"));
    }
    if let Some(text) = doc_description(&doc.body) {
        let snippet: String = text.chars().take(160).collect();
        line.push_str(": ");
        line.push_str(&snippet);
    }
    line
}

/// Best human-readable text on an evidence document
fn doc_description(body: &Value) -> Option<&str> {
    body.get("rule")
        .and_then(|r| r.get("description"))
        .and_then(Value::as_str)
        .or_else(|| body.get("description").and_then(Value::as_str))
        .or_else(|| body.get("message").and_then(Value::as_str))
        .or_else(|| body.get("full_log").and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tobi_core::bundle::ContextCategory;
    use tobi_core::model::{AgentRef, AlertData, AlertRule};

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

    #[test]
    fn empty_bundle_selects_traditional_with_all_sections() {
        let (chain, sections) = assemble(&alert(), &ContextBundle::new());
        assert_eq!(chain, AnalysisChain::Traditional);
        for key in TRADITIONAL_SECTIONS {
            let text = sections.get(key).expect("section present");
            assert!(text.starts_with("No "), "absence sentence for {key}: {text}");
        }
        assert_eq!(sections.len(), TRADITIONAL_SECTIONS.len());
    }

    #[test]
    fn graph_bundle_selects_comprehensive_with_all_sections() {
        let mut bundle = ContextBundle::new();
        bundle.extend(
            ContextCategory::AttackPaths,
            vec![EvidenceDoc::new(
                "p1",
                None,
                json!({"description": "reached domain controller"}),
            )],
        );
        let (chain, sections) = assemble(&alert(), &bundle);
        assert_eq!(chain, AnalysisChain::Comprehensive);
        for key in COMPREHENSIVE_SECTIONS {
            assert!(sections.contains_key(key), "missing section {key}");
        }
        assert!(sections["attack_path_analysis"].contains("reached domain controller"));
        assert!(sections["lateral_movement_analysis"].starts_with("No "));
    }

    #[test]
    fn sections_are_bounded() {
        let mut bundle = ContextBundle::new();
        bundle.extend(
            ContextCategory::SimilarAlerts,
            (0..12)
                .map(|i| EvidenceDoc::new(format!("s{i}"), Some(0.5), json!({})))
                .collect(),
        );
        let (_, sections) = assemble(&alert(), &bundle);
        let lines = sections["similar_alerts_context"].lines().count();
        assert_eq!(lines, MAX_DOCS_PER_SECTION);
    }

    #[test]
    fn merged_sections_combine_categories() {
        let mut bundle = ContextBundle::new();
        bundle.extend(
            ContextCategory::CpuMetrics,
            vec![EvidenceDoc::new("cpu1", None, json!({}))],
        );
        bundle.extend(
            ContextCategory::MemoryMetrics,
            vec![EvidenceDoc::new("mem1", None, json!({}))],
        );
        let (_, sections) = assemble(&alert(), &bundle);
        let metrics = &sections["system_metrics_context"];
        assert!(metrics.contains("cpu1"));
        assert!(metrics.contains("mem1"));
    }
}
