//! Per-alert triage pipeline
//!
//! State machine: `Fetched → Vectorized → EvidenceDecided → Retrieved →
//! Analyzed → Stored → GraphExtracted → GraphPersisted → Done`, with
//! `Failed` reachable from any step. Failures before `Stored` fail the
//! alert; graph extraction and persistence are additive enrichment, so
//! their failures are logged and the alert still counts as triaged.

use crate::EngineConfig;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tobi_context::assemble;
use tobi_core::adapter::{AlertStore, Embedder, GraphStore, ReportGenerator};
use tobi_core::error::TriageError;
use tobi_core::model::{Alert, AnalysisResult, RiskLevel};
use tobi_decision::DecisionEngine;
use tobi_extract::{EntityExtractor, GraphPersistence, PersistenceReport};
use tobi_retrieval::{GraphRetrieval, HybridRetrieval, TraditionalRetrieval};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageStage {
    Fetched,
    Vectorized,
    EvidenceDecided,
    Retrieved,
    Analyzed,
    Stored,
    GraphExtracted,
    GraphPersisted,
    Done,
    Failed,
}

impl TriageStage {
    pub fn name(&self) -> &'static str {
        match self {
            TriageStage::Fetched => "fetched",
            TriageStage::Vectorized => "vectorized",
            TriageStage::EvidenceDecided => "evidence_decided",
            TriageStage::Retrieved => "retrieved",
            TriageStage::Analyzed => "analyzed",
            TriageStage::Stored => "stored",
            TriageStage::GraphExtracted => "graph_extracted",
            TriageStage::GraphPersisted => "graph_persisted",
            TriageStage::Done => "done",
            TriageStage::Failed => "failed",
        }
    }
}

/// Elapsed wall time of one completed stage
#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: &'static str,
    pub elapsed_ms: u64,
}

/// Terminal record of one alert's triage
#[derive(Debug)]
pub struct TriageOutcome {
    pub alert_id: String,
    pub stage: TriageStage,
    pub analysis: Option<AnalysisResult>,
    pub graph: Option<PersistenceReport>,
    pub error: Option<String>,
    pub timings: Vec<StageTiming>,
}

impl TriageOutcome {
    pub fn succeeded(&self) -> bool {
        self.stage == TriageStage::Done
    }

    fn failed(alert_id: &str, stage: TriageStage, error: TriageError, timings: Vec<StageTiming>) -> Self {
        Self {
            alert_id: alert_id.to_string(),
            stage: TriageStage::Failed,
            analysis: None,
            graph: None,
            error: Some(format!("{}: {}", stage.name(), error)),
            timings,
        }
    }
}

/// Drives one alert through the full triage state machine. Owns the
/// component instances; collaborator handles are injected at construction.
pub struct TriagePipeline {
    pub(crate) store: Arc<dyn AlertStore>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn ReportGenerator>,
    decision: DecisionEngine,
    retrieval: HybridRetrieval,
    extractor: EntityExtractor,
    persistence: GraphPersistence,
    pub(crate) config: EngineConfig,
}

impl TriagePipeline {
    pub fn new(
        store: Arc<dyn AlertStore>,
        embedder: Arc<dyn Embedder>,
        graph: Arc<dyn GraphStore>,
        generator: Arc<dyn ReportGenerator>,
        config: EngineConfig,
    ) -> Self {
        let retrieval = HybridRetrieval::new(
            GraphRetrieval::new(graph.clone()),
            TraditionalRetrieval::new(store.clone(), embedder.clone()),
            config.retrieval.clone(),
        );
        Self {
            persistence: GraphPersistence::new(graph),
            decision: DecisionEngine::new(),
            extractor: EntityExtractor::default(),
            store,
            embedder,
            generator,
            retrieval,
            config,
        }
    }

    /// Times the hybrid retrieval supplemented with traditional evidence
    pub fn fallback_count(&self) -> u64 {
        self.retrieval.fallback_count()
    }

    /// Triage one alert under the per-alert deadline
    pub async fn triage(&self, alert: &Alert) -> TriageOutcome {
        let deadline = std::time::Duration::from_secs(self.config.alert_timeout_secs);
        match tokio::time::timeout(deadline, self.run(alert)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(alert = %alert.id, timeout_secs = self.config.alert_timeout_secs, "triage timed out");
                TriageOutcome::failed(
                    &alert.id,
                    TriageStage::Failed,
                    TriageError::Timeout(deadline.as_millis() as u64),
                    Vec::new(),
                )
            }
        }
    }

    async fn run(&self, alert: &Alert) -> TriageOutcome {
        let mut timings = Vec::new();

        // Vectorized
        let started = Instant::now();
        let vector = match self.embedder.embed_alert(alert).await {
            Ok(vector) => vector,
            Err(err) => {
                return TriageOutcome::failed(&alert.id, TriageStage::Vectorized, err, timings)
            }
        };
        record(&mut timings, TriageStage::Vectorized, started);

        // EvidenceDecided: pure, both request lists
        let started = Instant::now();
        let traditional_requests = self.decision.decide(alert);
        let graph_requests = self.decision.decide_graph(alert);
        record(&mut timings, TriageStage::EvidenceDecided, started);

        // Retrieved: degraded requests become empty categories, never errors
        let started = Instant::now();
        let bundle = self
            .retrieval
            .gather(alert, Some(&vector), &graph_requests, &traditional_requests)
            .await;
        record(&mut timings, TriageStage::Retrieved, started);

        // Analyzed
        let started = Instant::now();
        let (chain, sections) = assemble(alert, &bundle);
        let report = match self.generator.generate(chain, &sections).await {
            Ok(report) => report,
            Err(err) => {
                return TriageOutcome::failed(&alert.id, TriageStage::Analyzed, err, timings)
            }
        };
        let analysis = AnalysisResult {
            provider: self.generator.provider().to_string(),
            risk_level: RiskLevel::from_report(&report),
            evidence_counts: bundle.counts(),
            strategy: chain.name().to_string(),
            generated_at: Utc::now(),
            report,
        };
        record(&mut timings, TriageStage::Analyzed, started);

        // Stored: the one write that commits the triage
        let started = Instant::now();
        let patch = json!({
            "analysis": analysis,
            "vector": vector,
        });
        if let Err(err) = self
            .store
            .update_document(&alert.index, &alert.id, patch)
            .await
        {
            return TriageOutcome::failed(&alert.id, TriageStage::Stored, err, timings);
        }
        record(&mut timings, TriageStage::Stored, started);

        // GraphExtracted / GraphPersisted: additive enrichment, failures
        // downgrade to warnings
        let started = Instant::now();
        let extracted = self.extractor.extract(alert, &bundle, &analysis.report);
        record(&mut timings, TriageStage::GraphExtracted, started);

        let started = Instant::now();
        let graph_report = self.persistence.persist(&extracted).await;
        if graph_report.success {
            let metadata = json!({
                "graphMetadata": {
                    "entities": extracted.entities.len(),
                    "relationships": extracted.relationships.len(),
                    "nodes_created": graph_report.nodes_created,
                    "relationships_created": graph_report.relationships_created,
                    "persisted_at": graph_report.persisted_at.to_rfc3339(),
                }
            });
            if let Err(err) = self
                .store
                .update_document(&alert.index, &alert.id, metadata)
                .await
            {
                warn!(alert = %alert.id, error = %err, "graph metadata update failed");
            }
        } else {
            warn!(
                alert = %alert.id,
                error = graph_report.error.as_deref().unwrap_or("unknown"),
                "graph persistence degraded"
            );
        }
        record(&mut timings, TriageStage::GraphPersisted, started);

        info!(
            alert = %alert.id,
            risk = analysis.risk_level.as_str(),
            strategy = %analysis.strategy,
            "alert triaged"
        );
        TriageOutcome {
            alert_id: alert.id.clone(),
            stage: TriageStage::Done,
            analysis: Some(analysis),
            graph: Some(graph_report),
            error: None,
            timings,
        }
    }
}

fn record(timings: &mut Vec<StageTiming>, stage: TriageStage, started: Instant) {
    timings.push(StageTiming {
        stage: stage.name(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    });
}
