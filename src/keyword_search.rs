//! Lexical (keyword) search service.
//!
//! Thin boundary over the [`KeywordIndex`] capability: applies the per-call
//! timeout and converts every backend failure into an empty result set so
//! an outage on the lexical side never fails a request.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::storage::{KeywordIndex, ScoredFragment};

pub struct KeywordSearchService {
    index: Arc<dyn KeywordIndex>,
    timeout: Duration,
}

impl KeywordSearchService {
    pub fn new(index: Arc<dyn KeywordIndex>, timeout: Duration) -> Self {
        Self { index, timeout }
    }

    /// BM25-like ranked fragments with raw scores. Only fragments matching
    /// at least one query token come back. Errors and timeouts degrade to
    /// empty.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<ScoredFragment> {
        match tokio::time::timeout(self.timeout, self.index.search(query, top_k)).await {
            Ok(Ok(results)) => {
                debug!(results = results.len(), "Keyword search completed");
                results
            }
            Ok(Err(e)) => {
                error!(error = %e, "Keyword search failed");
                Vec::new()
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Keyword search timed out");
                Vec::new()
            }
        }
    }
}
