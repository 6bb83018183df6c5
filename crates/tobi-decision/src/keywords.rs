//! Keyword sets shared by the rule tables

use tobi_core::model::Alert;

/// Resource-exhaustion terms (rule descriptions are matched lowercased)
pub const RESOURCE_KEYWORDS: &[&str] = &["cpu", "memory", "disk", "load", "swap", "resource"];

/// Security / intrusion terms
pub const SECURITY_KEYWORDS: &[&str] = &[
    "attack",
    "intrusion",
    "malware",
    "exploit",
    "injection",
    "brute force",
    "unauthorized",
    "breach",
    "backdoor",
    "rootkit",
];

/// Rule groups that mark an alert as a security event
pub const SECURITY_GROUPS: &[&str] = &[
    "authentication",
    "attack",
    "malware",
    "intrusion_detection",
    "web",
];

/// Web-server indicators
pub const WEB_KEYWORDS: &[&str] = &[
    "web",
    "http",
    "apache",
    "nginx",
    "php",
    "sql injection",
    "xss",
];

pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

pub fn groups_intersect(groups: &[String], set: &[&str]) -> bool {
    groups
        .iter()
        .any(|g| set.iter().any(|s| g.eq_ignore_ascii_case(s)))
}

/// Does the alert look like resource exhaustion (cpu/memory/disk/load, or
/// the "system" group)?
pub fn is_resource_exhaustion(alert: &Alert) -> bool {
    contains_any(&alert.description_lower(), RESOURCE_KEYWORDS)
        || alert.rule.groups.iter().any(|g| g.eq_ignore_ascii_case("system"))
}

/// Does the alert look like a security event? Matches the keyword set, the
/// security groups, or a severity of 7 and above.
pub fn is_security_event(alert: &Alert) -> bool {
    contains_any(&alert.description_lower(), SECURITY_KEYWORDS)
        || groups_intersect(&alert.rule.groups, SECURITY_GROUPS)
        || alert.rule.level >= 7
}
