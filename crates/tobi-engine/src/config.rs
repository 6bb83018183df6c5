//! Engine configuration

use tobi_retrieval::RetrievalConfig;

/// Policy knobs for the pipeline driver and batch runner. The defaults
/// are the operational values; none of them is load-bearing business
/// logic.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Unanalyzed alerts fetched per batch run
    pub batch_size: usize,
    /// Alerts triaged concurrently within a batch
    pub concurrency: usize,
    /// Deadline for one alert's full pipeline
    pub alert_timeout_secs: u64,
    /// Hybrid retrieval policy
    pub retrieval: RetrievalConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            concurrency: 4,
            alert_timeout_secs: 120,
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_alert_timeout(mut self, seconds: u64) -> Self {
        self.alert_timeout_secs = seconds;
        self
    }

    pub fn with_sufficiency_threshold(mut self, threshold: usize) -> Self {
        self.retrieval.sufficiency_threshold = threshold;
        self
    }
}
