//! Error taxonomy for the triage engine
//!
//! Propagation policy: only failures up through the `Stored` pipeline stage
//! fail an alert. Everything in graph extraction/persistence is caught at
//! the pipeline-driver boundary and downgraded to a warning.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriageError {
    /// Store or gateway temporarily unreachable. Retried only for the
    /// embedding gateway; everywhere else it degrades to an empty result.
    #[error("transient I/O failure: {0}")]
    Transient(String),

    /// Missing credentials / unsupported provider. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Alert store rejected or failed a query
    #[error("alert store failure: {0}")]
    Store(String),

    /// Graph store down; triggers full fallback to traditional retrieval
    /// and skips persistence.
    #[error("graph store unavailable: {0}")]
    GraphUnavailable(String),

    /// Embedding gateway failed permanently (non-retryable)
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Report generator unavailable or rate-limited
    #[error("analysis provider failure: {0}")]
    Analysis(String),

    /// The whole per-alert pipeline exceeded its deadline
    #[error("triage timed out after {0}ms")]
    Timeout(u64),
}

impl TriageError {
    /// Whether a retry within the same triage cycle could change the
    /// outcome. Only transient gateway failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TriageError::Transient(_))
    }
}
