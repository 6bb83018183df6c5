//! Core data model for the Tobi alert triage engine
//!
//! This crate defines the types that flow between the decision engine, the
//! retrieval orchestrator, the entity extractor and the pipeline driver,
//! plus the collaborator traits (alert store, graph store, embedder, report
//! generator) that the adapter crate implements.

pub mod adapter;
pub mod bundle;
pub mod error;
pub mod model;

pub use adapter::{AlertStore, Embedder, GraphStore, ReportGenerator};
pub use bundle::{ContextBundle, ContextCategory, EvidenceDoc};
pub use error::TriageError;
pub use model::{
    Alert, AlertData, AlertRule, AnalysisChain, AnalysisResult, AgentRef, EvidenceQuery,
    EvidenceRequest,
    GraphEntity, GraphRelationship, EntityType, Priority, ProcessInfo, RelationshipType,
    RiskLevel, TraversalTemplate,
};
