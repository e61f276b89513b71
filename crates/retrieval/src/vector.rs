//! Vector (semantic) retrieval leg.

use std::sync::Arc;

use tracing::debug;

use skimmer_core::chunk::{CollectionId, RetrievedChunk, TenantId};

use crate::index::{IndexError, VectorIndex};

/// Retriever over the vector index contract. Pure mapping layer — no score
/// threshold is applied here, callers decide how to use `score`.
pub struct VectorRetriever {
    index: Arc<dyn VectorIndex>,
}

impl VectorRetriever {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Nearest-neighbor search, scoped to one tenant. Collection semantics
    /// match the keyword leg: `None` / `Some(&[])` mean no collection filter.
    pub async fn search(
        &self,
        tenant_id: TenantId,
        collection_ids: Option<&[CollectionId]>,
        query_vector: &[f32],
        topk: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        let collections = collection_ids.filter(|ids| !ids.is_empty());
        let hits = self
            .index
            .search(tenant_id, collections, query_vector, topk)
            .await?;

        let chunks: Vec<RetrievedChunk> = hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                chunk_id: hit.chunk_id,
                document_id: hit.document_id,
                document_filename: hit.document_filename,
                content: hit.content,
                page_number: hit.page_number,
                section_title: hit.section_title,
                score: hit.score,
                fused_score: None,
                rerank_score: None,
            })
            .collect();

        debug!(results = chunks.len(), "vector search done");
        Ok(chunks)
    }
}
