//! Triage pipeline driver
//!
//! Sequences the decision engine, hybrid retrieval, report generation,
//! storage and graph enrichment per alert, and runs batches of alerts
//! with bounded concurrency.

mod batch;
mod config;
mod pipeline;

pub use batch::{BatchDriver, BatchSummary};
pub use config::EngineConfig;
pub use pipeline::{StageTiming, TriageOutcome, TriagePipeline, TriageStage};
