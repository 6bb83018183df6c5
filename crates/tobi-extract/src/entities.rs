//! Entity derivation from an alert, its context bundle and its report

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use tobi_core::bundle::ContextBundle;
use tobi_core::model::{Alert, EntityType, GraphEntity, RiskLevel};

/// Extraction bounds. Defaults match the operational limits: 5 similar
/// alerts, 5 context processes, 3 indicator IPs, 5 indicators overall.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub max_similar_entities: usize,
    pub max_context_processes: usize,
    pub max_indicator_ips: usize,
    pub max_indicators: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_similar_entities: 5,
            max_context_processes: 5,
            max_indicator_ips: 3,
            max_indicators: 5,
        }
    }
}

/// Entities for one alert plus the id lookup the relationship phase reads.
#[derive(Debug, Clone, Default)]
pub struct ExtractedEntities {
    pub entities: Vec<GraphEntity>,
    pub alert_entity_id: String,
    pub host_ids: Vec<String>,
    pub source_ip_ids: Vec<String>,
    pub user_ids: Vec<String>,
    pub process_ids: Vec<String>,
    pub file_ids: Vec<String>,
    /// Similar-alert entity ids with their similarity scores
    pub similar: Vec<(String, Option<f64>)>,
    /// Alert entities with a parseable timestamp, for PRECEDES chaining
    pub alert_timeline: Vec<(String, DateTime<Utc>)>,
}

/// Derives typed graph entities with deterministic ids.
///
/// Every id is a pure function of the identifying properties, so repeated
/// extraction of the same real-world object converges to the same node and
/// concurrent runs merge without coordination.
pub struct EntityExtractor {
    config: ExtractorConfig,
    ipv4_re: Regex,
    domain_re: Regex,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl EntityExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            // Octet ranges are validated by parsing, not by the pattern
            ipv4_re: Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("static ipv4 pattern"),
            domain_re: Regex::new(r"\b[A-Za-z0-9][A-Za-z0-9-]*(?:\.[A-Za-z0-9][A-Za-z0-9-]*)+\b")
                .expect("static domain pattern"),
        }
    }

    /// Phase one: entities only
    pub fn extract_entities(
        &self,
        alert: &Alert,
        bundle: &ContextBundle,
        report: &str,
    ) -> ExtractedEntities {
        let mut out = ExtractedEntities::default();
        let mut seen: HashSet<String> = HashSet::new();

        self.alert_entity(alert, report, &mut out, &mut seen);
        self.similar_alert_entities(bundle, &mut out, &mut seen);
        self.host_entity(alert, &mut out, &mut seen);
        self.ip_entities(alert, &mut out, &mut seen);
        self.user_entities(alert, &mut out, &mut seen);
        self.process_entities(alert, bundle, &mut out, &mut seen);
        self.file_entities(alert, &mut out, &mut seen);
        self.threat_indicator_entities(report, &mut out, &mut seen);

        out
    }

    fn push(
        out: &mut ExtractedEntities,
        seen: &mut HashSet<String>,
        entity: GraphEntity,
    ) -> bool {
        if seen.insert(entity.id.clone()) {
            out.entities.push(entity);
            true
        } else {
            false
        }
    }

    fn alert_entity(
        &self,
        alert: &Alert,
        report: &str,
        out: &mut ExtractedEntities,
        seen: &mut HashSet<String>,
    ) {
        let id = format!("alert_{}", alert.id);
        let entity = GraphEntity::new(EntityType::Alert, id.clone())
            .with_property("rule_id", json!(alert.rule.id))
            .with_property("rule_description", json!(alert.rule.description))
            .with_property("rule_level", json!(alert.rule.level))
            .with_property("rule_groups", json!(alert.rule.groups))
            .with_property("timestamp", json!(alert.timestamp.to_rfc3339()))
            .with_property("timestamp_ms", json!(alert.timestamp.timestamp_millis()))
            .with_property("agent_name", json!(alert.agent.name))
            .with_property("risk_level", json!(RiskLevel::from_report(report).as_str()))
            .with_property("triage_score", json!(triage_score(alert.rule.level, report)));
        Self::push(out, seen, entity);
        out.alert_entity_id = id.clone();
        out.alert_timeline.push((id, alert.timestamp));
    }

    fn similar_alert_entities(
        &self,
        bundle: &ContextBundle,
        out: &mut ExtractedEntities,
        seen: &mut HashSet<String>,
    ) {
        // Similar evidence can sit in either category depending on which
        // retrieval strategy produced it. The current alert is excluded
        // before the bound so a self-hit never consumes a slot.
        let self_id = out.alert_entity_id.clone();
        for doc in bundle
            .similar_alerts
            .iter()
            .chain(bundle.traditional_similar_alerts.iter())
            .filter(|doc| format!("alert_{}", doc.id) != self_id)
            .take(self.config.max_similar_entities)
        {
            let id = format!("alert_{}", doc.id);
            let mut entity = GraphEntity::new(EntityType::Alert, id.clone())
                .with_property("similarity", json!(doc.score));
            if let Some(description) = doc.field("description") {
                entity = entity.with_property("rule_description", json!(description));
            }
            let timestamp = doc_timestamp(&doc.body);
            if let Some(ts) = timestamp {
                entity = entity
                    .with_property("timestamp", json!(ts.to_rfc3339()))
                    .with_property("timestamp_ms", json!(ts.timestamp_millis()));
            }
            if Self::push(out, seen, entity) {
                out.similar.push((id.clone(), doc.score));
                if let Some(ts) = timestamp {
                    out.alert_timeline.push((id, ts));
                }
            }
        }
    }

    fn host_entity(
        &self,
        alert: &Alert,
        out: &mut ExtractedEntities,
        seen: &mut HashSet<String>,
    ) {
        let Some(key) = alert.host_key() else {
            return;
        };
        let id = format!("host_{key}");
        let entity = GraphEntity::new(EntityType::Host, id.clone())
            .with_property("agent_id", json!(alert.agent.id))
            .with_property("name", json!(alert.agent.name))
            .with_property("address", json!(alert.agent.ip));
        Self::push(out, seen, entity);
        out.host_ids.push(id);
    }

    fn ip_entities(
        &self,
        alert: &Alert,
        out: &mut ExtractedEntities,
        seen: &mut HashSet<String>,
    ) {
        let candidates = [
            (alert.data.src_ip.as_deref(), "source"),
            (alert.data.dest_ip.as_deref(), "destination"),
            (alert.agent.ip.as_deref(), "internal"),
        ];
        for (address, tag) in candidates {
            let Some(address) = address.filter(|a| !a.is_empty()) else {
                continue;
            };
            let id = format!("ip_{address}");
            let entity = GraphEntity::new(EntityType::IpAddress, id.clone())
                .with_property("address", json!(address))
                .with_property("role", json!(tag))
                .with_property("private", json!(is_private_ipv4(address)));
            // First tag wins for duplicate addresses
            if Self::push(out, seen, entity) && tag == "source" {
                out.source_ip_ids.push(id);
            }
        }
    }

    fn user_entities(
        &self,
        alert: &Alert,
        out: &mut ExtractedEntities,
        seen: &mut HashSet<String>,
    ) {
        for (name, role) in [
            (alert.data.user.as_deref(), "primary"),
            (alert.data.src_user.as_deref(), "source"),
        ] {
            let Some(name) = name.filter(|n| !n.is_empty()) else {
                continue;
            };
            let id = format!("user_{name}");
            let entity = GraphEntity::new(EntityType::User, id.clone())
                .with_property("name", json!(name))
                .with_property("role", json!(role));
            if Self::push(out, seen, entity) {
                out.user_ids.push(id);
            }
        }
    }

    fn process_entities(
        &self,
        alert: &Alert,
        bundle: &ContextBundle,
        out: &mut ExtractedEntities,
        seen: &mut HashSet<String>,
    ) {
        let mut candidates: Vec<(i64, String, Option<String>)> = Vec::new();

        if let Some(process) = &alert.data.process {
            if let Some(name) = process.name.as_deref().filter(|n| !n.is_empty()) {
                candidates.push((
                    process.pid.unwrap_or(0),
                    name.to_string(),
                    process.cmdline.clone(),
                ));
            }
        }
        for doc in bundle
            .process_data
            .iter()
            .take(self.config.max_context_processes)
        {
            // Entries lacking a name are dropped
            if let Some((pid, name)) = process_from_doc(&doc.body) {
                candidates.push((pid, name, None));
            }
        }

        for (pid, name, cmdline) in candidates {
            let id = format!("process_{pid}_{name}");
            let mut entity = GraphEntity::new(EntityType::Process, id.clone())
                .with_property("pid", json!(pid))
                .with_property("name", json!(name));
            if let Some(cmdline) = cmdline {
                entity = entity.with_property("cmdline", json!(cmdline));
            }
            if Self::push(out, seen, entity) {
                out.process_ids.push(id);
            }
        }
    }

    fn file_entities(
        &self,
        alert: &Alert,
        out: &mut ExtractedEntities,
        seen: &mut HashSet<String>,
    ) {
        let Some(path) = alert.data.file_path.as_deref().filter(|p| !p.is_empty()) else {
            return;
        };
        // Hash collisions are acceptable here: the id is an informational
        // dedup key, not a security boundary.
        let id = format!("file_{:016x}", seahash::hash(path.as_bytes()));
        let entity = GraphEntity::new(EntityType::File, id.clone())
            .with_property("path", json!(path));
        Self::push(out, seen, entity);
        out.file_ids.push(id);
    }

    fn threat_indicator_entities(
        &self,
        report: &str,
        out: &mut ExtractedEntities,
        seen: &mut HashSet<String>,
    ) {
        let mut total = 0usize;

        let mut ips = 0usize;
        for m in self.ipv4_re.find_iter(report) {
            if ips >= self.config.max_indicator_ips || total >= self.config.max_indicators {
                break;
            }
            let value = m.as_str();
            if value.parse::<Ipv4Addr>().is_err() {
                continue;
            }
            let entity = GraphEntity::new(EntityType::ThreatIndicator, format!("indicator_{value}"))
                .with_property("value", json!(value))
                .with_property("indicator_type", json!("ip"))
                .with_property("confidence", json!(0.7))
                .with_property("source", json!("analysis_report"));
            if Self::push(out, seen, entity) {
                ips += 1;
                total += 1;
            }
        }

        for m in self.domain_re.find_iter(report) {
            if total >= self.config.max_indicators {
                break;
            }
            let value = m.as_str();
            if !looks_like_domain(value) {
                continue;
            }
            let entity = GraphEntity::new(
                EntityType::ThreatIndicator,
                format!("indicator_{}", value.to_lowercase()),
            )
            .with_property("value", json!(value.to_lowercase()))
            .with_property("indicator_type", json!("domain"))
            .with_property("confidence", json!(0.5))
            .with_property("source", json!("analysis_report"));
            if Self::push(out, seen, entity) {
                total += 1;
            }
        }
    }
}

/// Rule level x10, scaled by report sentiment, clamped to [0, 100].
/// Multipliers are mutually exclusive, first match wins.
pub fn triage_score(rule_level: u8, report: &str) -> f64 {
    let base = rule_level as f64 * 10.0;
    let lower = report.to_lowercase();
    let scaled = if lower.contains("critical") {
        base * 1.5
    } else if lower.contains("high") {
        base * 1.2
    } else if lower.contains("low") {
        base * 0.8
    } else {
        base
    };
    scaled.clamp(0.0, 100.0)
}

/// Standard private-range classification (RFC 1918 plus loopback and
/// link-local). Unparsable addresses count as non-private.
pub fn is_private_ipv4(address: &str) -> bool {
    match address.parse::<Ipv4Addr>() {
        Ok(ip) => ip.is_private() || ip.is_loopback() || ip.is_link_local(),
        Err(_) => false,
    }
}

/// Domain heuristic: final label alphabetic and at least two characters.
/// Pure-numeric candidates are the IPv4 regex's business.
fn looks_like_domain(token: &str) -> bool {
    match token.rsplit('.').next() {
        Some(tld) => tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()),
        None => false,
    }
}

/// Pull `(pid, name)` out of a context evidence body, looking in the
/// common nesting spots
fn process_from_doc(body: &Value) -> Option<(i64, String)> {
    let process = body
        .get("process")
        .or_else(|| body.get("data").and_then(|d| d.get("process")))
        .unwrap_or(body);
    let name = process.get("name").and_then(Value::as_str)?;
    if name.is_empty() {
        return None;
    }
    let pid = process.get("pid").and_then(Value::as_i64).unwrap_or(0);
    Some((pid, name.to_string()))
}

/// Timestamp of a retrieved alert document, when it parses
fn doc_timestamp(body: &Value) -> Option<DateTime<Utc>> {
    let raw = body
        .get("timestamp")
        .or_else(|| body.get("@timestamp"))?
        .as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
