//! Batch driver
//!
//! Fetches unanalyzed alerts and triages them with bounded concurrency.
//! Alerts are independent: one failure never aborts the batch.

use crate::{TriageOutcome, TriagePipeline};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tobi_core::error::TriageError;
use tracing::info;
use uuid::Uuid;

/// Summary of one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: String,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Hybrid-retrieval supplement events during this run
    pub fallback_count: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct BatchDriver {
    pipeline: Arc<TriagePipeline>,
}

impl BatchDriver {
    pub fn new(pipeline: Arc<TriagePipeline>) -> Self {
        Self { pipeline }
    }

    /// Run one batch. Fails only when the unanalyzed-alert scan itself
    /// fails; per-alert failures are tallied in the summary.
    pub async fn run(&self) -> Result<(BatchSummary, Vec<TriageOutcome>), TriageError> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let fallbacks_before = self.pipeline.fallback_count();

        let alerts = self
            .pipeline
            .store
            .query_unanalyzed(self.pipeline.config.batch_size)
            .await?;
        info!(run_id = %run_id, count = alerts.len(), "batch started");

        let outcomes: Vec<TriageOutcome> = stream::iter(alerts)
            .map(|alert| {
                let pipeline = self.pipeline.clone();
                async move { pipeline.triage(&alert).await }
            })
            .buffer_unordered(self.pipeline.config.concurrency.max(1))
            .collect()
            .await;

        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        let summary = BatchSummary {
            processed: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            fallback_count: self.pipeline.fallback_count() - fallbacks_before,
            started_at,
            finished_at: Utc::now(),
            run_id,
        };
        info!(
            run_id = %summary.run_id,
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            fallbacks = summary.fallback_count,
            "batch finished"
        );
        Ok((summary, outcomes))
    }
}
