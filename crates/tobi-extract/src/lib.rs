//! Entity/relationship extraction and graph persistence
//!
//! Two-phase extraction: entities are derived first (with deterministic,
//! content-derived ids), then relationships reference them through an
//! in-memory lookup. Extraction never raises for missing optional fields;
//! a single unparsable sub-field degrades to empty rather than aborting.

mod entities;
mod persistence;
mod relationships;

pub use entities::{EntityExtractor, ExtractedEntities, ExtractorConfig};
pub use persistence::{GraphPersistence, PersistenceReport};
pub use relationships::derive_relationships;

use tobi_core::model::{Alert, GraphEntity, GraphRelationship};
use tobi_core::bundle::ContextBundle;

/// Entities plus relationships for one alert, ready to merge
#[derive(Debug, Clone, Default)]
pub struct ExtractedGraph {
    pub entities: Vec<GraphEntity>,
    pub relationships: Vec<GraphRelationship>,
}

impl EntityExtractor {
    /// Full extraction: entities, then the relationships between them
    pub fn extract(&self, alert: &Alert, bundle: &ContextBundle, report: &str) -> ExtractedGraph {
        let extracted = self.extract_entities(alert, bundle, report);
        let relationships = derive_relationships(alert, &extracted);
        ExtractedGraph {
            entities: extracted.entities,
            relationships,
        }
    }
}
