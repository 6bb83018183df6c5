//! Neo4j graph store over the HTTP transaction endpoint
//!
//! Every call is a single self-committing transaction with
//! `includeStats` enabled, so merge operations can report whether they
//! created anything. Labels and relationship types come from closed enums
//! in `tobi-core`, never from user input, so formatting them into Cypher
//! text is safe.

use crate::{AdapterConfig, AdapterError, AdapterResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tobi_core::adapter::GraphStore;
use tobi_core::bundle::EvidenceDoc;
use tobi_core::error::TriageError;
use tobi_core::model::{GraphEntity, GraphRelationship, TraversalTemplate};

pub struct Neo4jGraph {
    config: AdapterConfig,
    client: Client,
    database: String,
}

impl Neo4jGraph {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            database: "neo4j".to_string(),
        }
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    /// Run one statement in a self-committing transaction
    async fn commit(&self, statement: &str, parameters: Value) -> AdapterResult<TxResult> {
        let url = format!(
            "{}/db/{}/tx/commit",
            self.config.endpoint, self.database
        );
        let body = json!({
            "statements": [{
                "statement": statement,
                "parameters": parameters,
                "includeStats": true
            }]
        });

        let mut request = self.client.post(&url).json(&body);
        for (key, value) in self.config.auth_headers() {
            request = request.header(&key, &value);
        }

        let response = request
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(AdapterError::Api {
                status,
                message: text,
            });
        }

        let mut parsed: TxResponse = response.json().await?;
        if let Some(error) = parsed.errors.first() {
            return Err(AdapterError::Api {
                status: 400,
                message: format!("{}: {}", error.code, error.message),
            });
        }
        if parsed.results.is_empty() {
            return Err(AdapterError::Parse("empty transaction response".into()));
        }
        Ok(parsed.results.remove(0))
    }
}

// Any graph failure triggers the hybrid fallback path, so the whole
// taxonomy collapses to GraphUnavailable here.
fn graph_error(err: AdapterError) -> TriageError {
    TriageError::GraphUnavailable(err.to_string())
}

/// Cypher text for a traversal template. Each query returns rows of one
/// map column with `source`/`target`/`relation`/`detail` keys where a
/// concrete relationship exists, which the context renderer turns into
/// path notation.
fn traversal_cypher(template: TraversalTemplate) -> &'static str {
    match template {
        TraversalTemplate::AttackPath => {
            "MATCH (a:Alert {id: $alert_id})-[:HAS_SOURCE_IP]->(ip:IPAddress)<-[:HAS_SOURCE_IP]-(x:Alert)-[:TRIGGERED_ON]->(h:Host) \
             WHERE x.id <> $alert_id AND x.timestamp_ms >= $since_epoch_ms \
             RETURN {id: x.id, source: {type: 'IPAddress', value: ip.address}, target: {type: 'Host', value: coalesce(h.name, h.agent_id)}, relation: 'attack_path', detail: x.rule_description} AS record \
             ORDER BY x.timestamp_ms DESC LIMIT 20"
        }
        TraversalTemplate::LateralMovement => {
            "MATCH (a:Alert {id: $alert_id})-[:TRIGGERED_ON]->(h:Host)<-[:TRIGGERED_ON]-(x:Alert)-[:HAS_SOURCE_IP]->(ip:IPAddress)<-[:HAS_SOURCE_IP]-(y:Alert)-[:TRIGGERED_ON]->(other:Host) \
             WHERE other <> h AND y.timestamp_ms >= $since_epoch_ms \
             RETURN DISTINCT {id: y.id, source: {type: 'Host', value: coalesce(h.name, h.agent_id)}, target: {type: 'Host', value: coalesce(other.name, other.agent_id)}, relation: 'moved_to', detail: ip.address} AS record \
             LIMIT 20"
        }
        TraversalTemplate::ProcessChain => {
            "MATCH (a:Alert {id: $alert_id})-[:INVOLVES_PROCESS]->(p:Process)<-[:INVOLVES_PROCESS]-(x:Alert) \
             WHERE x.id <> $alert_id AND x.timestamp_ms >= $since_epoch_ms \
             RETURN {id: x.id, source: {type: 'Process', value: p.name}, target: {type: 'Alert', value: x.id}, relation: 'involves_process', detail: x.rule_description} AS record \
             ORDER BY x.timestamp_ms DESC LIMIT 20"
        }
        TraversalTemplate::FileInteraction => {
            "MATCH (a:Alert {id: $alert_id})-[r:ACCESSES_FILE]->(f:File)<-[r2:ACCESSES_FILE]-(x:Alert) \
             WHERE x.id <> $alert_id AND x.timestamp_ms >= $since_epoch_ms \
             RETURN {id: x.id, source: {type: 'File', value: f.path}, target: {type: 'Alert', value: x.id}, relation: 'accesses_file', detail: coalesce(r2.access, 'access')} AS record \
             ORDER BY x.timestamp_ms DESC LIMIT 20"
        }
        TraversalTemplate::NetworkTopology => {
            "MATCH (ip:IPAddress {address: $source_ip})<-[:HAS_SOURCE_IP]-(x:Alert)-[:TRIGGERED_ON]->(h:Host) \
             WHERE x.timestamp_ms >= $since_epoch_ms \
             RETURN {id: x.id, source: {type: 'IPAddress', value: ip.address}, target: {type: 'Host', value: coalesce(h.name, h.agent_id)}, relation: 'connects_to', detail: x.rule_description} AS record \
             ORDER BY x.timestamp_ms DESC LIMIT 20"
        }
        TraversalTemplate::UserBehavior => {
            "MATCH (u:User {name: $user})<-[r:INVOLVES_USER]-(x:Alert) \
             WHERE x.id <> $alert_id AND x.timestamp_ms >= $since_epoch_ms \
             RETURN {id: x.id, source: {type: 'User', value: u.name}, target: {type: 'Alert', value: x.id}, relation: coalesce(r.action, 'involves_user'), detail: x.rule_description} AS record \
             ORDER BY x.timestamp_ms DESC LIMIT 20"
        }
        TraversalTemplate::IpReputation => {
            "MATCH (ip:IPAddress {address: $source_ip})<-[:HAS_SOURCE_IP]-(x:Alert) \
             WHERE x.timestamp_ms >= $since_epoch_ms \
             RETURN {id: x.id, source: {type: 'IPAddress', value: ip.address}, target: {type: 'Alert', value: x.id}, relation: 'has_source_ip', detail: x.risk_level} AS record \
             ORDER BY x.timestamp_ms DESC LIMIT 50"
        }
        TraversalTemplate::ThreatLandscape => {
            "MATCH (x:Alert)-[:TRIGGERED_ON]->(h:Host) \
             WHERE x.timestamp_ms >= $since_epoch_ms AND x.risk_level IN ['critical', 'high'] \
             RETURN {id: x.id, source: {type: 'Alert', value: x.id}, target: {type: 'Host', value: coalesce(h.name, h.agent_id)}, relation: 'triggered_on', detail: x.rule_description} AS record \
             ORDER BY x.timestamp_ms DESC LIMIT 30"
        }
        TraversalTemplate::TemporalCorrelation => {
            "MATCH (a:Alert {id: $alert_id})-[:TRIGGERED_ON]->(h:Host)<-[:TRIGGERED_ON]-(x:Alert) \
             WHERE x.id <> $alert_id AND x.timestamp_ms >= $since_epoch_ms \
             RETURN {id: x.id, source: {type: 'Alert', value: $alert_id}, target: {type: 'Alert', value: x.id}, relation: 'precedes', detail: coalesce(x.rule_description, '')} AS record \
             ORDER BY x.timestamp_ms ASC LIMIT 20"
        }
    }
}

#[async_trait]
impl GraphStore for Neo4jGraph {
    async fn run_traversal(
        &self,
        template: TraversalTemplate,
        params: Value,
    ) -> Result<Vec<EvidenceDoc>, TriageError> {
        let result = self
            .commit(traversal_cypher(template), params)
            .await
            .map_err(graph_error)?;

        let docs = result
            .data
            .into_iter()
            .enumerate()
            .filter_map(|(i, row)| {
                let record = row.row.into_iter().next()?;
                let id = record
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}_{}", template.name(), i));
                Some(EvidenceDoc::new(id, None, record))
            })
            .collect();
        Ok(docs)
    }

    async fn merge_node(&self, entity: &GraphEntity) -> Result<bool, TriageError> {
        let statement = format!(
            "MERGE (n:{} {{id: $id}}) SET n += $props",
            entity.entity_type.label()
        );
        let params = json!({
            "id": entity.id,
            "props": Value::Object(entity.properties.clone())
        });

        let result = self.commit(&statement, params).await.map_err(graph_error)?;
        Ok(result.stats.map(|s| s.nodes_created > 0).unwrap_or(false))
    }

    async fn merge_edge(&self, relationship: &GraphRelationship) -> Result<bool, TriageError> {
        let statement = format!(
            "MATCH (a {{id: $source}}) MATCH (b {{id: $target}}) \
             MERGE (a)-[r:{}]->(b) SET r += $props",
            relationship.rel_type.name()
        );
        let params = json!({
            "source": relationship.source_id,
            "target": relationship.target_id,
            "props": Value::Object(relationship.properties.clone())
        });

        let result = self.commit(&statement, params).await.map_err(graph_error)?;
        Ok(result
            .stats
            .map(|s| s.relationships_created > 0)
            .unwrap_or(false))
    }

    async fn ensure_index(&self, label: &str, property: &str) -> Result<(), TriageError> {
        let statement = format!(
            "CREATE INDEX idx_{}_{} IF NOT EXISTS FOR (n:{}) ON (n.{})",
            label.to_lowercase(),
            property.to_lowercase(),
            label,
            property
        );
        self.commit(&statement, json!({}))
            .await
            .map_err(graph_error)?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
    stats: Option<TxStats>,
}

#[derive(Deserialize)]
struct TxRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Deserialize)]
struct TxError {
    code: String,
    message: String,
}

#[derive(Deserialize)]
struct TxStats {
    #[serde(default)]
    nodes_created: u64,
    #[serde(default)]
    relationships_created: u64,
}
