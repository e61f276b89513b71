//! Reranking providers: an HTTP cross-encoder endpoint (primary) and an
//! LLM-prompted reranker (fallback), behind one trait so the orchestrator
//! can chain them.

pub mod factory;
pub mod hf;
pub mod mistral;

use async_trait::async_trait;
use thiserror::Error;

use skimmer_core::chunk::RetrievedChunk;

pub use factory::{create_fallback_reranker, create_reranker};
pub use hf::HfEndpointReranker;
pub use mistral::MistralReranker;

/// Dedicated error type for reranker failures, so the orchestrator can tell
/// "try the fallback" apart from failures it has no way to recover from.
#[derive(Debug, Error)]
pub enum RerankError {
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} — {body}")]
    Api { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A reranker scores (query, passage) pairs and reorders candidates.
/// Implementations return new scored records — candidates are never mutated,
/// so a failed primary attempt leaves them untouched for the fallback.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[RetrievedChunk],
        topn: usize,
    ) -> Result<Vec<RetrievedChunk>, RerankError>;

    fn name(&self) -> &'static str;
}

/// Truncate a passage to at most `max_chars` characters (not bytes — cutting
/// mid-codepoint would panic on slicing).
pub(crate) fn truncate_passage(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
