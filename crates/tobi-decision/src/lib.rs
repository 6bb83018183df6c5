//! Evidence decision engine
//!
//! Inspects one alert and produces the ordered list of evidence requests
//! that the retrieval orchestrator will execute. Pure functions, no I/O:
//! every rule is an independently testable `(predicate, emit)` pair and the
//! tables are walked in declaration order, so equal-priority requests keep
//! a stable position.

mod graph_rules;
mod keywords;
mod rules;

pub use graph_rules::graph_rule_table;
pub use keywords::{
    is_resource_exhaustion, is_security_event, RESOURCE_KEYWORDS, SECURITY_GROUPS,
    SECURITY_KEYWORDS, WEB_KEYWORDS,
};
pub use rules::rule_table;

use tobi_core::model::{Alert, EvidenceRequest};

/// An evidence rule: fires when `matches` holds, contributing the requests
/// `emit` builds. Rules are additive; several may fire for one alert.
pub struct EvidenceRule {
    pub name: &'static str,
    pub matches: fn(&Alert) -> bool,
    pub emit: fn(&Alert) -> Vec<EvidenceRequest>,
}

/// Stateless decision engine over the two rule tables
#[derive(Debug, Default)]
pub struct DecisionEngine;

impl DecisionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evidence requests against the alert store (vector + keyword/time-range)
    pub fn decide(&self, alert: &Alert) -> Vec<EvidenceRequest> {
        Self::run_table(&rule_table(), alert)
    }

    /// Evidence requests against the knowledge graph (traversals)
    pub fn decide_graph(&self, alert: &Alert) -> Vec<EvidenceRequest> {
        Self::run_table(&graph_rule_table(), alert)
    }

    fn run_table(table: &[EvidenceRule], alert: &Alert) -> Vec<EvidenceRequest> {
        let mut requests = Vec::new();
        for rule in table {
            if (rule.matches)(alert) {
                let emitted = (rule.emit)(alert);
                tracing::debug!(
                    rule = rule.name,
                    count = emitted.len(),
                    alert = %alert.id,
                    "evidence rule fired"
                );
                requests.extend(emitted);
            }
        }
        // Stable: ties keep declaration order
        requests.sort_by_key(|r| r.priority);
        requests
    }
}
