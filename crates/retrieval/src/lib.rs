//! Hybrid retrieval over external full-text and vector indexes.
//!
//! Keyword and vector legs run concurrently, Reciprocal Rank Fusion merges
//! their ranked lists, and a cross-encoder reranker (with an LLM fallback)
//! reorders the fused candidates. See [`RetrievalPipeline`] for the
//! end-to-end flow.

pub mod fusion;
pub mod index;
pub mod keyword;
pub mod orchestrator;
pub mod rerank;
pub mod vector;

pub use fusion::rrf_merge;
pub use index::{FullTextIndex, IndexError, KeywordHit, VectorHit, VectorIndex};
pub use keyword::KeywordRetriever;
pub use orchestrator::{RetrievalError, RetrievalPipeline};
pub use rerank::{create_fallback_reranker, create_reranker, RerankError, Reranker};
pub use vector::VectorRetriever;
