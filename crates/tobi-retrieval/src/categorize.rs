//! Data-driven routing of retrieval results into bundle categories

use tobi_core::bundle::ContextCategory;
use tobi_core::model::TraversalTemplate;

/// Ordered token table for keyword/time-range requests. The request's
/// description is scanned for the first matching token.
const KEYWORD_CATEGORY_TABLE: &[(&str, ContextCategory)] = &[
    ("cpu", ContextCategory::CpuMetrics),
    ("network", ContextCategory::NetworkLogs),
    ("process", ContextCategory::ProcessData),
    ("ssh", ContextCategory::SshLogs),
    ("web", ContextCategory::WebMetrics),
    ("user", ContextCategory::UserActivity),
    ("memory", ContextCategory::MemoryMetrics),
    ("file", ContextCategory::FilesystemData),
];

/// Bucket for a keyword/time-range request, by description token
pub fn category_for_keyword_request(description: &str) -> ContextCategory {
    let lower = description.to_lowercase();
    KEYWORD_CATEGORY_TABLE
        .iter()
        .find(|(token, _)| lower.contains(token))
        .map(|(_, category)| *category)
        .unwrap_or(ContextCategory::AdditionalContext)
}

/// Static traversal-template to category table
pub fn category_for_template(template: TraversalTemplate) -> ContextCategory {
    match template {
        TraversalTemplate::AttackPath => ContextCategory::AttackPaths,
        TraversalTemplate::LateralMovement => ContextCategory::LateralMovement,
        TraversalTemplate::ProcessChain => ContextCategory::ProcessChains,
        TraversalTemplate::FileInteraction => ContextCategory::FileInteractions,
        TraversalTemplate::NetworkTopology => ContextCategory::NetworkTopology,
        TraversalTemplate::UserBehavior => ContextCategory::UserBehavior,
        TraversalTemplate::IpReputation => ContextCategory::IpReputation,
        TraversalTemplate::ThreatLandscape => ContextCategory::ThreatLandscape,
        TraversalTemplate::TemporalCorrelation => ContextCategory::TemporalSequences,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_routing_uses_first_matching_token() {
        assert_eq!(
            category_for_keyword_request("cpu usage metrics"),
            ContextCategory::CpuMetrics
        );
        assert_eq!(
            category_for_keyword_request("memory usage metrics"),
            ContextCategory::MemoryMetrics
        );
        assert_eq!(
            category_for_keyword_request("filesystem activity"),
            ContextCategory::FilesystemData
        );
        assert_eq!(
            category_for_keyword_request("ssh authentication failures"),
            ContextCategory::SshLogs
        );
        assert_eq!(
            category_for_keyword_request("something unrecognized"),
            ContextCategory::AdditionalContext
        );
    }

    #[test]
    fn every_template_routes_to_a_graph_category() {
        use TraversalTemplate::*;
        for template in [
            AttackPath,
            LateralMovement,
            ProcessChain,
            FileInteraction,
            NetworkTopology,
            UserBehavior,
            IpReputation,
            ThreatLandscape,
            TemporalCorrelation,
        ] {
            let category = category_for_template(template);
            assert!(!category.name().is_empty());
        }
    }

    #[test]
    fn lateral_movement_template_routes_by_name() {
        assert_eq!(
            category_for_template(TraversalTemplate::LateralMovement),
            ContextCategory::LateralMovement
        );
        assert_eq!(
            TraversalTemplate::LateralMovement.name(),
            "lateral_movement_detection"
        );
    }
}
