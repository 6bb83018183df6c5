//! Traditional evidence rules: vector similarity and keyword/time-range

use crate::keywords::{contains_any, is_resource_exhaustion, is_security_event, WEB_KEYWORDS};
use crate::EvidenceRule;
use tobi_core::model::{Alert, EvidenceQuery, EvidenceRequest, Priority};

fn keyword_request(
    description: &str,
    keywords: &[&str],
    window_minutes: i64,
    priority: Priority,
) -> EvidenceRequest {
    EvidenceRequest::new(
        EvidenceQuery::KeywordTimeRange {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            window_minutes,
        },
        description,
        priority,
    )
}

/// The traditional rule table, walked in declaration order.
///
/// The security-event rule yields to the resource-exhaustion rule: an alert
/// already classified as resource pressure gets process/memory evidence
/// only, even when its severity alone would qualify it as a security event.
pub fn rule_table() -> Vec<EvidenceRule> {
    vec![
        EvidenceRule {
            name: "similar_history",
            matches: |_| true,
            emit: |_| {
                vec![EvidenceRequest::new(
                    EvidenceQuery::VectorSimilarity {
                        k: 7,
                        analyzed_only: true,
                    },
                    "similar historical alerts",
                    Priority::High,
                )]
            },
        },
        EvidenceRule {
            name: "resource_exhaustion",
            matches: is_resource_exhaustion,
            emit: |_| {
                vec![
                    keyword_request(
                        "process information listing",
                        &["process", "ps", "top"],
                        10,
                        Priority::Medium,
                    ),
                    keyword_request(
                        "memory usage metrics",
                        &["memory", "ram", "swap"],
                        15,
                        Priority::Medium,
                    ),
                ]
            },
        },
        EvidenceRule {
            name: "security_event",
            matches: |alert| is_security_event(alert) && !is_resource_exhaustion(alert),
            emit: |_| {
                vec![
                    keyword_request("cpu usage metrics", &["cpu", "load"], 2, Priority::High),
                    keyword_request(
                        "network connection activity",
                        &["network", "connection", "netstat"],
                        3,
                        Priority::High,
                    ),
                    keyword_request(
                        "user activity logs",
                        &["user", "login", "session"],
                        5,
                        Priority::High,
                    ),
                ]
            },
        },
        EvidenceRule {
            name: "ssh_patterns",
            matches: |alert| {
                let desc = alert.description_lower();
                desc.contains("ssh") || desc.contains("sshd")
            },
            emit: |alert| {
                let mut requests = vec![keyword_request(
                    "ssh connection patterns",
                    &["ssh", "sshd", "connection"],
                    5,
                    Priority::Medium,
                )];
                let desc = alert.description_lower();
                if desc.contains("brute") || desc.contains("failed") {
                    // Brute-force signal accumulates slowly, so the failure
                    // window is deliberately wider.
                    requests.push(keyword_request(
                        "ssh authentication failures",
                        &["ssh", "authentication failure", "failed password"],
                        10,
                        Priority::High,
                    ));
                }
                requests
            },
        },
        EvidenceRule {
            name: "web_server",
            matches: |alert| contains_any(&alert.description_lower(), WEB_KEYWORDS),
            emit: |_| {
                vec![
                    keyword_request(
                        "web server performance",
                        &["apache", "nginx", "http"],
                        3,
                        Priority::Medium,
                    ),
                    keyword_request(
                        "web access logs",
                        &["access log", "GET", "POST"],
                        2,
                        Priority::Medium,
                    ),
                ]
            },
        },
        EvidenceRule {
            name: "filesystem_activity",
            matches: |alert| alert.rule.level >= 10 || alert.description_lower().contains("file"),
            emit: |alert| {
                let priority = if alert.rule.level >= 10 {
                    Priority::High
                } else {
                    Priority::Medium
                };
                vec![keyword_request(
                    "filesystem activity",
                    &["file", "syscheck", "integrity"],
                    5,
                    priority,
                )]
            },
        },
    ]
}
