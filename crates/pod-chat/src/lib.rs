//! Scoped retrieval tools for the chat surface (§4.I). This crate is a
//! thin adaptor over the Repository and the document store: it builds
//! metadata filters from a chat turn's scope, runs tool queries, and
//! resolves a grounded response's citations. The grounded-generation
//! call itself is a collaborator out of scope (§1).

pub mod citations;
pub mod error;
pub mod scope;
pub mod summary;
pub mod tools;

pub use citations::{Citation, GroundingChunk, extract_citations};
pub use error::ChatError;
pub use scope::ChatScope;
pub use summary::{EpisodeSummary, PodcastSummary};
pub use tools::ChatTools;

use serde::Serialize;

/// The structured, non-raising error contract chat tools present to
/// their caller (§7): `{response_text, citations: [], error}`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub response_text: String,
    pub citations: Vec<Citation>,
    pub error: Option<String>,
}

impl ToolOutcome {
    #[must_use]
    pub const fn ok(response_text: String, citations: Vec<Citation>) -> Self {
        Self { response_text, citations, error: None }
    }

    #[must_use]
    pub fn failed(error: &ChatError) -> Self {
        Self { response_text: String::new(), citations: Vec::new(), error: Some(error.to_string()) }
    }
}
