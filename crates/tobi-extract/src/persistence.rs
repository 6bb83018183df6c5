//! Idempotent merge of extracted entities and relationships
//!
//! Persistence is best-effort relative to the primary analysis pipeline:
//! a failure here is reported in the result record, never raised to the
//! caller.

use crate::ExtractedGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tobi_core::adapter::GraphStore;
use tobi_core::error::TriageError;
use tracing::warn;

/// Supporting indexes, safe to re-create on every call
const SUPPORTING_INDEXES: &[(&str, &str)] = &[
    ("Alert", "timestamp_ms"),
    ("Host", "agent_id"),
    ("IPAddress", "address"),
    ("User", "name"),
];

/// Outcome of one persistence call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceReport {
    pub success: bool,
    /// Nodes actually created this call (merges of existing nodes don't count)
    pub nodes_created: usize,
    pub relationships_created: usize,
    pub error: Option<String>,
    pub persisted_at: DateTime<Utc>,
}

impl PersistenceReport {
    fn unavailable(error: String, nodes_created: usize, relationships_created: usize) -> Self {
        Self {
            success: false,
            nodes_created,
            relationships_created,
            error: Some(error),
            persisted_at: Utc::now(),
        }
    }
}

/// Merges extracted graphs into the knowledge store.
///
/// Every entity is upserted by id and every relationship by
/// `(type, source, target)`, so repeated processing of evidence that
/// references the same real-world object converges instead of duplicating.
pub struct GraphPersistence {
    graph: Arc<dyn GraphStore>,
}

impl GraphPersistence {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    pub async fn persist(&self, extracted: &ExtractedGraph) -> PersistenceReport {
        if let Err(err) = self.ensure_indexes().await {
            return PersistenceReport::unavailable(err.to_string(), 0, 0);
        }

        let mut nodes_created = 0usize;
        let mut relationships_created = 0usize;
        let mut first_error: Option<String> = None;

        for entity in &extracted.entities {
            match self.graph.merge_node(entity).await {
                Ok(created) => {
                    if created {
                        nodes_created += 1;
                    }
                }
                Err(TriageError::GraphUnavailable(message)) => {
                    return PersistenceReport::unavailable(
                        message,
                        nodes_created,
                        relationships_created,
                    );
                }
                Err(err) => {
                    warn!(entity = %entity.id, error = %err, "node merge failed");
                    first_error.get_or_insert(err.to_string());
                }
            }
        }

        for relationship in &extracted.relationships {
            match self.graph.merge_edge(relationship).await {
                Ok(created) => {
                    if created {
                        relationships_created += 1;
                    }
                }
                Err(TriageError::GraphUnavailable(message)) => {
                    return PersistenceReport::unavailable(
                        message,
                        nodes_created,
                        relationships_created,
                    );
                }
                Err(err) => {
                    warn!(
                        relationship = relationship.rel_type.name(),
                        source = %relationship.source_id,
                        target = %relationship.target_id,
                        error = %err,
                        "edge merge failed"
                    );
                    first_error.get_or_insert(err.to_string());
                }
            }
        }

        PersistenceReport {
            success: first_error.is_none(),
            nodes_created,
            relationships_created,
            error: first_error,
            persisted_at: Utc::now(),
        }
    }

    async fn ensure_indexes(&self) -> Result<(), TriageError> {
        for (label, property) in SUPPORTING_INDEXES {
            self.graph.ensure_index(label, property).await?;
        }
        Ok(())
    }
}
