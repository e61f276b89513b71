//! Hybrid retrieval pipeline: embed → (keyword ∥ vector) → RRF → rerank.
//!
//! A linear, request-scoped pipeline. Its only terminal outcomes are
//! primary-rerank success, fallback success, degrade-to-RRF, and the
//! reranking-disabled short circuit. Rerank failures never reach the caller;
//! a search-backend failure aborts the call (see `RetrievalError`).

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use skimmer_core::chunk::{CollectionId, RetrievedChunk, TenantId};
use skimmer_core::config::{Config, HybridConfig, RerankConfig};
use skimmer_ingest::embedding::{EmbeddingError, EmbeddingService};

use crate::fusion::rrf_merge;
use crate::index::{FullTextIndex, IndexError, VectorIndex};
use crate::keyword::KeywordRetriever;
use crate::rerank::{create_fallback_reranker, create_reranker, Reranker};
use crate::vector::VectorRetriever;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// A search backend failed. This aborts the whole retrieval call — the
    /// single place to change if partial (single-source) degradation is ever
    /// wanted.
    #[error("search backend failed: {0}")]
    Index(#[from] IndexError),
}

pub struct RetrievalPipeline {
    embeddings: Arc<EmbeddingService>,
    keyword: KeywordRetriever,
    vector: VectorRetriever,
    primary: Option<Box<dyn Reranker>>,
    fallback: Option<Box<dyn Reranker>>,
    hybrid: HybridConfig,
    rerank: RerankConfig,
}

impl RetrievalPipeline {
    /// Wire the pipeline from config; rerankers come from the factory.
    pub fn new(
        embeddings: Arc<EmbeddingService>,
        fulltext: Arc<dyn FullTextIndex>,
        vectors: Arc<dyn VectorIndex>,
        config: &Config,
    ) -> Self {
        Self {
            embeddings,
            keyword: KeywordRetriever::new(fulltext),
            vector: VectorRetriever::new(vectors),
            primary: create_reranker(&config.rerank),
            fallback: create_fallback_reranker(&config.rerank),
            hybrid: config.hybrid.clone(),
            rerank: config.rerank.clone(),
        }
    }

    /// Replace the rerankers (custom wiring, tests).
    pub fn with_rerankers(
        mut self,
        primary: Option<Box<dyn Reranker>>,
        fallback: Option<Box<dyn Reranker>>,
    ) -> Self {
        self.primary = primary;
        self.fallback = fallback;
        self
    }

    /// Full hybrid retrieval: embed the query, run both search legs
    /// concurrently, RRF-merge, truncate, then rerank with fallback.
    ///
    /// Reranking failures degrade to RRF order; they are never surfaced.
    pub async fn retrieve_context(
        &self,
        query: &str,
        tenant_id: TenantId,
        collection_ids: Option<&[CollectionId]>,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let t0 = Instant::now();
        let topn = self.rerank.final_topn;

        // 1) Embed the query.
        let query_embedding = self.embeddings.embed_query(query).await?;
        let t_embed = Instant::now();

        // 2) Keyword + vector search, joined. Either failure aborts.
        let (keyword_results, vector_results) = tokio::try_join!(
            self.keyword.search(
                tenant_id,
                collection_ids,
                query,
                self.hybrid.keyword_topk
            ),
            self.vector.search(
                tenant_id,
                collection_ids,
                &query_embedding,
                self.hybrid.vector_topk
            ),
        )?;
        let t_search = Instant::now();

        info!(
            keyword = keyword_results.len(),
            vector = vector_results.len(),
            "hybrid search done"
        );

        // 3) RRF merge, 4) truncate to the rerank candidate budget.
        let merged = rrf_merge(&keyword_results, &vector_results, self.hybrid.rrf_k);
        let mut candidates: Vec<RetrievedChunk> = merged
            .into_iter()
            .take(self.rerank.max_candidates)
            .collect();

        let embed_ms = t_embed.duration_since(t0).as_millis();
        let search_ms = t_search.duration_since(t_embed).as_millis();

        // 5) Short circuit when reranking is off or there is nothing to rank.
        if self.rerank.enabled && !candidates.is_empty() {
            // 6) Primary, then fallback, then degrade.
            if let Some(primary) = &self.primary {
                match primary.rerank(query, &candidates, topn).await {
                    Ok(reranked) => {
                        let rerank_ms = t_search.elapsed().as_millis();
                        info!(
                            embed_ms,
                            search_ms,
                            rerank_ms,
                            total_ms = t0.elapsed().as_millis(),
                            provider = primary.name(),
                            "retrieval timing"
                        );
                        return Ok(reranked);
                    }
                    Err(e) => {
                        warn!(provider = primary.name(), error = %e, "primary reranker failed");
                    }
                }

                if let Some(fallback) = &self.fallback {
                    match fallback.rerank(query, &candidates, topn).await {
                        Ok(reranked) => {
                            let rerank_ms = t_search.elapsed().as_millis();
                            info!(
                                embed_ms,
                                search_ms,
                                rerank_ms,
                                total_ms = t0.elapsed().as_millis(),
                                fallback = fallback.name(),
                                "retrieval timing"
                            );
                            return Ok(reranked);
                        }
                        Err(e) => {
                            warn!(provider = fallback.name(), error = %e, "fallback reranker failed");
                        }
                    }
                }
            }
        }

        // Ultimate fallback: RRF order, no rerank scores.
        candidates.truncate(topn);
        info!(
            embed_ms,
            search_ms,
            total_ms = t0.elapsed().as_millis(),
            "retrieval timing (rrf order)"
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::index::{KeywordHit, VectorHit};
    use crate::rerank::RerankError;
    use skimmer_ingest::embedding::Embedder;

    // ── Fakes ───────────────────────────────────────────────────────────

    struct FakeEmbedder;

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn model(&self) -> &str {
            "fake"
        }
    }

    struct FakeFullText {
        ids: Vec<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl FullTextIndex for FakeFullText {
        async fn query(
            &self,
            _tenant_id: TenantId,
            _collection_ids: Option<&[CollectionId]>,
            _expression: &str,
            _topk: usize,
        ) -> Result<Vec<KeywordHit>, IndexError> {
            if self.fail {
                return Err(IndexError::FullText("connection refused".to_string()));
            }
            Ok(self
                .ids
                .iter()
                .enumerate()
                .map(|(i, id)| KeywordHit {
                    chunk_id: id.to_string(),
                    document_id: "d1".to_string(),
                    content: format!("content {id}"),
                    page_number: Some(1),
                    section_title: None,
                    rank: 1.0 - i as f64 * 0.1,
                })
                .collect())
        }
    }

    struct FakeVectors {
        ids: Vec<&'static str>,
    }

    #[async_trait]
    impl VectorIndex for FakeVectors {
        async fn search(
            &self,
            _tenant_id: TenantId,
            _collection_ids: Option<&[CollectionId]>,
            _query_vector: &[f32],
            _topk: usize,
        ) -> Result<Vec<VectorHit>, IndexError> {
            Ok(self
                .ids
                .iter()
                .enumerate()
                .map(|(i, id)| VectorHit {
                    chunk_id: id.to_string(),
                    document_id: "d1".to_string(),
                    document_filename: "manual.pdf".to_string(),
                    content: format!("content {id}"),
                    page_number: Some(2),
                    section_title: None,
                    score: 0.9 - i as f64 * 0.1,
                })
                .collect())
        }
    }

    struct FailingReranker;

    #[async_trait]
    impl Reranker for FailingReranker {
        async fn rerank(
            &self,
            _query: &str,
            _candidates: &[RetrievedChunk],
            _topn: usize,
        ) -> Result<Vec<RetrievedChunk>, RerankError> {
            Err(RerankError::Api {
                status: 503,
                body: "overloaded".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    /// Reverses the candidate order so tests can tell its output apart from
    /// RRF order.
    struct ReversingReranker;

    #[async_trait]
    impl Reranker for ReversingReranker {
        async fn rerank(
            &self,
            _query: &str,
            candidates: &[RetrievedChunk],
            topn: usize,
        ) -> Result<Vec<RetrievedChunk>, RerankError> {
            let mut out: Vec<RetrievedChunk> = candidates
                .iter()
                .rev()
                .enumerate()
                .map(|(i, c)| c.with_rerank_score(1.0 - i as f64 * 0.01))
                .collect();
            out.truncate(topn);
            Ok(out)
        }

        fn name(&self) -> &'static str {
            "reversing"
        }
    }

    fn pipeline(
        keyword_ids: Vec<&'static str>,
        vector_ids: Vec<&'static str>,
        rerank_enabled: bool,
    ) -> RetrievalPipeline {
        let mut config = Config {
            chunking: Default::default(),
            embedding: skimmer_core::config::EmbeddingConfig {
                provider: "openai".to_string(),
                model: "fake".to_string(),
                dimensions: 3,
                openai_api_key: None,
                mistral_api_key: None,
                base_url: None,
                cache_size: 16,
                batch_size: 64,
            },
            hybrid: Default::default(),
            rerank: Default::default(),
        };
        config.rerank.enabled = rerank_enabled;
        config.rerank.final_topn = 4;

        let embeddings = Arc::new(EmbeddingService::new(Arc::new(FakeEmbedder), 16));
        RetrievalPipeline::new(
            embeddings,
            Arc::new(FakeFullText {
                ids: keyword_ids,
                fail: false,
            }),
            Arc::new(FakeVectors { ids: vector_ids }),
            &config,
        )
        // Strip the factory-built rerankers; tests install their own.
        .with_rerankers(None, None)
    }

    // ── Tests ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn disabled_rerank_returns_rrf_order_unscored() {
        let p = pipeline(vec!["c1", "c2", "c3"], vec!["c1", "c4", "c5"], false);
        let out = p
            .retrieve_context("pump seal", Uuid::new_v4(), None)
            .await
            .unwrap();

        assert_eq!(out[0].chunk_id, "c1");
        assert!((out[0].fused_score.unwrap() - 2.0 / 61.0).abs() < 1e-12);
        for chunk in &out {
            assert!(chunk.rerank_score.is_none());
        }
        assert!(out.len() <= 4);
    }

    #[tokio::test]
    async fn fused_payload_takes_vector_filename() {
        let p = pipeline(vec!["c1"], vec!["c1"], false);
        let out = p
            .retrieve_context("pump", Uuid::new_v4(), None)
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].document_filename, "manual.pdf");
    }

    #[tokio::test]
    async fn primary_success_returns_its_order() {
        let p = pipeline(vec!["c1", "c2"], vec!["c3"], true)
            .with_rerankers(Some(Box::new(ReversingReranker)), None);
        let out = p
            .retrieve_context("pump", Uuid::new_v4(), None)
            .await
            .unwrap();

        // RRF order is c1, c2|c3...; reversed output must differ from it.
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].chunk_id, "c1");
        assert!(out.iter().all(|c| c.rerank_score.is_some()));
    }

    #[tokio::test]
    async fn primary_failure_uses_fallback_order_exactly() {
        let p = pipeline(vec!["c1", "c2", "c3"], vec!["c4"], true).with_rerankers(
            Some(Box::new(FailingReranker)),
            Some(Box::new(ReversingReranker)),
        );
        let out = p
            .retrieve_context("pump", Uuid::new_v4(), None)
            .await
            .unwrap();

        // c4 is rank 1 in the vector leg, so RRF order is [c1, c4, c2, c3]
        // (c1 and c4 tie at 1/61, first-seen wins); the fallback reverses it.
        let ids: Vec<&str> = out.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c2", "c4", "c1"]);
    }

    #[tokio::test]
    async fn both_rerankers_failing_degrades_to_rrf() {
        let p = pipeline(vec!["c1", "c2"], vec!["c1"], true).with_rerankers(
            Some(Box::new(FailingReranker)),
            Some(Box::new(FailingReranker)),
        );
        let out = p
            .retrieve_context("pump", Uuid::new_v4(), None)
            .await
            .unwrap();

        assert_eq!(out[0].chunk_id, "c1");
        assert!(out.iter().all(|c| c.rerank_score.is_none()));
    }

    #[tokio::test]
    async fn no_fallback_configured_degrades_to_rrf() {
        let p = pipeline(vec!["c1"], vec!["c2"], true)
            .with_rerankers(Some(Box::new(FailingReranker)), None);
        let out = p
            .retrieve_context("pump", Uuid::new_v4(), None)
            .await
            .unwrap();
        assert_eq!(out[0].chunk_id, "c1");
    }

    #[tokio::test]
    async fn empty_candidates_skip_reranking() {
        let p = pipeline(vec![], vec![], true)
            .with_rerankers(Some(Box::new(FailingReranker)), None);
        let out = p
            // The keyword leg sanitizes this to nothing and the vector fake
            // returns nothing, so the reranker must never run (it would
            // error if it did — but empty candidates short-circuit first).
            .retrieve_context("pump", Uuid::new_v4(), None)
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn search_backend_failure_aborts_the_call() {
        let config = Config {
            chunking: Default::default(),
            embedding: skimmer_core::config::EmbeddingConfig {
                provider: "openai".to_string(),
                model: "fake".to_string(),
                dimensions: 3,
                openai_api_key: None,
                mistral_api_key: None,
                base_url: None,
                cache_size: 16,
                batch_size: 64,
            },
            hybrid: Default::default(),
            rerank: Default::default(),
        };
        let embeddings = Arc::new(EmbeddingService::new(Arc::new(FakeEmbedder), 16));
        let p = RetrievalPipeline::new(
            embeddings,
            Arc::new(FakeFullText {
                ids: vec![],
                fail: true,
            }),
            Arc::new(FakeVectors { ids: vec!["c1"] }),
            &config,
        )
        .with_rerankers(None, None);

        let err = p
            .retrieve_context("pump", Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Index(_)));
    }

    #[tokio::test]
    async fn candidate_budget_caps_rerank_input() {
        let mut config = Config {
            chunking: Default::default(),
            embedding: skimmer_core::config::EmbeddingConfig {
                provider: "openai".to_string(),
                model: "fake".to_string(),
                dimensions: 3,
                openai_api_key: None,
                mistral_api_key: None,
                base_url: None,
                cache_size: 16,
                batch_size: 64,
            },
            hybrid: Default::default(),
            rerank: Default::default(),
        };
        config.rerank.enabled = false;
        config.rerank.max_candidates = 2;
        config.rerank.final_topn = 10;

        let embeddings = Arc::new(EmbeddingService::new(Arc::new(FakeEmbedder), 16));
        let p = RetrievalPipeline::new(
            embeddings,
            Arc::new(FakeFullText {
                ids: vec!["c1", "c2", "c3", "c4"],
                fail: false,
            }),
            Arc::new(FakeVectors { ids: vec![] }),
            &config,
        );

        let out = p
            .retrieve_context("pump", Uuid::new_v4(), None)
            .await
            .unwrap();
        assert_eq!(out.len(), 2, "truncated to max_candidates before topn");
    }
}
