//! Keyword (full-text) retrieval leg.

use std::sync::Arc;

use tracing::debug;

use skimmer_core::chunk::{CollectionId, RetrievedChunk, TenantId};

use crate::index::{FullTextIndex, IndexError};

/// Build an OR-combined search expression from a user query.
///
/// Tokenizes on word boundaries and lowercases; every token is alphanumeric
/// (plus `_`) by construction, so no search-syntax metacharacter can reach
/// the index — anything else is dropped, never escaped. Returns `None` when
/// no safe tokens remain.
pub fn build_or_expression(query: &str) -> Option<String> {
    let tokens: Vec<String> = query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" | "))
    }
}

/// Retriever over the full-text index contract.
pub struct KeywordRetriever {
    index: Arc<dyn FullTextIndex>,
}

impl KeywordRetriever {
    pub fn new(index: Arc<dyn FullTextIndex>) -> Self {
        Self { index }
    }

    /// Ranked keyword search, scoped to one tenant.
    ///
    /// `collection_ids`: `None` and `Some(&[])` both mean "no collection
    /// filter" — an empty selection searches the whole tenant, it does not
    /// match nothing. A query with no safe tokens returns `Ok(vec![])`
    /// without touching the backend.
    pub async fn search(
        &self,
        tenant_id: TenantId,
        collection_ids: Option<&[CollectionId]>,
        query: &str,
        topk: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        let Some(expression) = build_or_expression(query) else {
            return Ok(Vec::new());
        };

        let collections = collection_ids.filter(|ids| !ids.is_empty());
        let hits = self
            .index
            .query(tenant_id, collections, &expression, topk)
            .await?;

        let chunks: Vec<RetrievedChunk> = hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                chunk_id: hit.chunk_id,
                document_id: hit.document_id,
                // FTS rows carry no filename; RRF's payload merge fills it
                // in when the vector leg saw the same chunk.
                document_filename: String::new(),
                content: hit.content,
                page_number: hit.page_number,
                section_title: hit.section_title,
                score: hit.rank,
                fused_score: None,
                rerank_score: None,
            })
            .collect();

        debug!(results = chunks.len(), "keyword search done");
        Ok(chunks)
    }
}
