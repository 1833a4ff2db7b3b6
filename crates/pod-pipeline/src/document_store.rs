//! `DocumentStore`: the seam `pod-chat`'s retrieval tools query against,
//! so ChatSearch never depends on a specific vector-store implementation
//! (§4.I). `Indexer` is the only implementation today.

use std::future::Future;

use crate::error::PipelineError;

/// One row returned from a grounded search, before citation resolution.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub title: String,
    pub text: String,
}

pub trait DocumentStore: Send + Sync {
    /// Runs `query` against the store, restricted to rows matching
    /// `filter` (an already-built, quote-escaped filter literal).
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::IndexOperationFailed` if the store query
    /// fails.
    fn search(
        &self,
        query: &str,
        filter: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<RetrievedChunk>, PipelineError>> + Send;
}
