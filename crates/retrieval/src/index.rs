//! Narrow query contracts for the two search backends. The pipeline never
//! talks to an index directly — it goes through these traits, and the real
//! full-text / vector engines live behind them as external collaborators.

use async_trait::async_trait;
use thiserror::Error;

use skimmer_core::chunk::{CollectionId, TenantId};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("full-text index error: {0}")]
    FullText(String),

    #[error("vector index error: {0}")]
    Vector(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// A row returned by the full-text index. FTS rows carry location metadata
/// but no filename — that lives in the vector payload.
#[derive(Debug, Clone)]
pub struct KeywordHit {
    pub chunk_id: String,
    pub document_id: String,
    pub content: String,
    pub page_number: Option<u32>,
    pub section_title: Option<String>,
    /// The index's native lexical relevance score.
    pub rank: f64,
}

/// A nearest-neighbor hit from the vector index, payload included.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub chunk_id: String,
    pub document_id: String,
    pub document_filename: String,
    pub content: String,
    pub page_number: Option<u32>,
    pub section_title: Option<String>,
    /// Similarity score, higher is closer.
    pub score: f64,
}

/// Ranked keyword query, tenant-scoped. `expression` is a pre-sanitized
/// OR-expression (`w1 | w2 | ...`); implementations embed it verbatim.
#[async_trait]
pub trait FullTextIndex: Send + Sync {
    async fn query(
        &self,
        tenant_id: TenantId,
        collection_ids: Option<&[CollectionId]>,
        expression: &str,
        topk: usize,
    ) -> Result<Vec<KeywordHit>, IndexError>;
}

/// Nearest-neighbor query, tenant-scoped, results ordered by similarity
/// descending. No score threshold — callers decide what to do with scores.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn search(
        &self,
        tenant_id: TenantId,
        collection_ids: Option<&[CollectionId]>,
        query_vector: &[f32],
        topk: usize,
    ) -> Result<Vec<VectorHit>, IndexError>;
}
