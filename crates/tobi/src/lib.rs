//! # Tobi - Context-Correlation & Hybrid Retrieval Engine
//!
//! Tobi triages security alerts by correlating each alert with historical
//! evidence from an alert index and a knowledge graph, generating an
//! analyst-style report, and writing the verdict back to the alert store.
//!
//! ## Features
//!
//! - **Evidence decision engine**: rule tables turn one alert into an
//!   ordered list of vector, keyword/time-range and graph-traversal queries
//! - **Hybrid retrieval**: graph-native evidence first, supplemented with
//!   traditional search when the graph is thin, with isolated per-request
//!   failure handling
//! - **Knowledge-graph enrichment**: deterministic entity/relationship
//!   extraction and idempotent merge, so repeated runs converge
//! - **LLM reporting**: chain selection by bundle shape, named sections
//!   that are never omitted, risk level parsed from the report
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tobi::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let search = AdapterConfig::new("https://opensearch.example.com:9200")
//!         .with_credentials("admin", "admin");
//!     let graph = AdapterConfig::new("http://neo4j.example.com:7474")
//!         .with_credentials("neo4j", "password");
//!     let openai = AdapterConfig::new("https://api.openai.com").with_api_key("sk-...");
//!
//!     let pipeline = Arc::new(TriagePipeline::new(
//!         Arc::new(OpenSearchStore::new(search, "wazuh-alerts-*")),
//!         Arc::new(EmbeddingClient::new(openai.clone(), "text-embedding-3-small")),
//!         Arc::new(Neo4jGraph::new(graph)),
//!         Arc::new(ChatReportGenerator::new(openai, "gpt-4o-mini", "openai")),
//!         EngineConfig::default(),
//!     ));
//!
//!     let (summary, _outcomes) = BatchDriver::new(pipeline).run().await?;
//!     println!(
//!         "triaged {} alerts ({} failed, {} retrieval fallbacks)",
//!         summary.processed, summary.failed, summary.fallback_count
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Tobi consists of several specialized crates:
//!
//! - **`tobi-core`**: alert/evidence/graph data models and collaborator traits
//! - **`tobi-decision`**: evidence decision rule tables
//! - **`tobi-retrieval`**: traditional, graph-native and hybrid retrieval
//! - **`tobi-extract`**: entity/relationship extraction and graph persistence
//! - **`tobi-context`**: context assembly and analysis-chain selection
//! - **`tobi-adapters`**: OpenSearch, Neo4j, embedding and LLM clients
//! - **`tobi-engine`**: per-alert pipeline driver and batch runner

// Re-export public APIs from sub-crates (feature-gated)

#[cfg(feature = "tobi-core")]
pub use tobi_core as core;

#[cfg(feature = "tobi-decision")]
pub use tobi_decision as decision;

#[cfg(feature = "tobi-retrieval")]
pub use tobi_retrieval as retrieval;

#[cfg(feature = "tobi-extract")]
pub use tobi_extract as extract;

#[cfg(feature = "tobi-context")]
pub use tobi_context as context;

#[cfg(feature = "tobi-adapters")]
pub use tobi_adapters as adapters;

#[cfg(feature = "tobi-engine")]
pub use tobi_engine as engine;

// Convenience re-exports for common types
#[cfg(feature = "tobi-core")]
pub use tobi_core::model;

#[cfg(feature = "tobi-core")]
pub use tobi_core::error::TriageError;

#[cfg(feature = "tobi-engine")]
pub use tobi_engine::{BatchDriver, BatchSummary, EngineConfig, TriageOutcome, TriagePipeline};

// Commonly used external dependencies
pub use anyhow;
pub use serde;
pub use serde_json;
pub use tokio;

/// Prelude module for convenient imports
///
/// ```rust
/// use tobi::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "tobi-core")]
    pub use tobi_core::adapter::{AlertStore, Embedder, GraphStore, ReportGenerator};
    #[cfg(feature = "tobi-core")]
    pub use tobi_core::bundle::{ContextBundle, ContextCategory, EvidenceDoc};
    #[cfg(feature = "tobi-core")]
    pub use tobi_core::error::TriageError;
    #[cfg(feature = "tobi-core")]
    pub use tobi_core::model::{
        Alert, AnalysisChain, AnalysisResult, EvidenceQuery, EvidenceRequest, Priority, RiskLevel,
    };

    #[cfg(feature = "tobi-decision")]
    pub use tobi_decision::DecisionEngine;

    #[cfg(feature = "tobi-retrieval")]
    pub use tobi_retrieval::{
        GraphRetrieval, HybridRetrieval, RetrievalConfig, RetrievalStrategy, TraditionalRetrieval,
    };

    #[cfg(feature = "tobi-extract")]
    pub use tobi_extract::{EntityExtractor, GraphPersistence, PersistenceReport};

    #[cfg(feature = "tobi-context")]
    pub use tobi_context::{assemble, select_chain};

    #[cfg(feature = "tobi-adapters")]
    pub use tobi_adapters::{
        AdapterConfig, ChatReportGenerator, EmbeddingClient, Neo4jGraph, OpenSearchStore,
    };

    #[cfg(feature = "tobi-engine")]
    pub use tobi_engine::{
        BatchDriver, BatchSummary, EngineConfig, TriageOutcome, TriagePipeline, TriageStage,
    };

    // Common external types
    pub use anyhow::Result;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::Value;
    pub use tokio;
}

/// Current version of Tobi
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Health check function
///
/// Returns basic system information to verify Tobi is wired correctly.
pub fn health_check() -> serde_json::Value {
    serde_json::json!({
        "status": "healthy",
        "version": VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "modules": {
            "core": cfg!(feature = "tobi-core"),
            "decision": cfg!(feature = "tobi-decision"),
            "retrieval": cfg!(feature = "tobi-retrieval"),
            "extract": cfg!(feature = "tobi-extract"),
            "context": cfg!(feature = "tobi-context"),
            "adapters": cfg!(feature = "tobi-adapters"),
            "engine": cfg!(feature = "tobi-engine"),
        }
    })
}
