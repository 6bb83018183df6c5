//! Retrieval orchestrator
//!
//! Executes the decision engine's evidence requests concurrently and folds
//! the results into a [`ContextBundle`]. Failure policy is isolation: a
//! single failing request is logged and replaced with an empty result,
//! never aborting the batch. The join runs over an index-aligned results
//! vector, so categorization is independent of task completion order.

mod categorize;
mod graph;
mod hybrid;
mod traditional;

pub use categorize::{category_for_keyword_request, category_for_template};
pub use graph::GraphRetrieval;
pub use hybrid::{HybridRetrieval, RetrievalConfig};
pub use traditional::TraditionalRetrieval;

use async_trait::async_trait;
use tobi_core::bundle::ContextBundle;
use tobi_core::model::{Alert, EvidenceRequest};

/// One retrieval strategy: turn evidence requests into a context bundle.
///
/// `vector` is the alert's embedding when the caller already computed it;
/// strategies that need one and receive `None` obtain it themselves.
/// Gathering never fails as a whole — degraded requests produce empty
/// categories.
#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    async fn gather(
        &self,
        alert: &Alert,
        vector: Option<&[f32]>,
        requests: &[EvidenceRequest],
    ) -> ContextBundle;
}
