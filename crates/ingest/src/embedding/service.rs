use std::sync::{Arc, Mutex};

use tracing::debug;

use skimmer_core::config::EmbeddingConfig;

use super::cache::EmbeddingCache;
use super::openai::OpenAiEmbedder;
use super::traits::{Embedder, EmbeddingError};

const DEFAULT_BATCH_SIZE: usize = 64;

/// Read-through caching front over an [`Embedder`].
///
/// The cache lock is held only for lookups and inserts, never across the
/// upstream call, so concurrent misses on the same text may both go upstream.
/// Upstream requests carry at most `batch_size` texts each; larger miss sets
/// are split into consecutive requests.
pub struct EmbeddingService {
    embedder: Arc<dyn Embedder>,
    cache: Mutex<EmbeddingCache>,
    batch_size: usize,
}

impl EmbeddingService {
    pub fn new(embedder: Arc<dyn Embedder>, cache_size: usize) -> Self {
        Self {
            embedder,
            cache: Mutex::new(EmbeddingCache::new(cache_size)),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Build the configured provider and wrap it with the configured cache
    /// and upstream batch cap.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let embedder = OpenAiEmbedder::from_config(config)?;
        Ok(Self::new(Arc::new(embedder), config.cache_size).with_batch_size(config.batch_size))
    }

    /// Override the upstream batch cap (clamped to at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Embed a query string, serving repeats from the cache.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbeddingError> {
        let model = self.embedder.model().to_string();
        if let Some(hit) = self.cache.lock().unwrap().get(&model, query) {
            debug!("embedding cache hit for query");
            return Ok(hit);
        }

        let vector = self.embedder.embed_query(query).await?;
        self.cache
            .lock()
            .unwrap()
            .put(&model, query, vector.clone());
        Ok(vector)
    }

    /// Embed a batch, fetching only cache misses upstream. Misses are sent
    /// in consecutive requests of at most `batch_size` texts. Output order
    /// matches input order.
    pub async fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let model = self.embedder.model().to_string();
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut miss_indices: Vec<usize> = Vec::new();

        {
            let mut cache = self.cache.lock().unwrap();
            for (i, text) in texts.iter().enumerate() {
                match cache.get(&model, text) {
                    Some(hit) => results[i] = Some(hit),
                    None => miss_indices.push(i),
                }
            }
        }

        if !miss_indices.is_empty() {
            let miss_texts: Vec<&str> = miss_indices.iter().map(|&i| texts[i]).collect();
            let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(miss_texts.len());
            for batch in miss_texts.chunks(self.batch_size) {
                let batch_vectors = self.embedder.embed_batch(batch).await?;
                if batch_vectors.len() != batch.len() {
                    return Err(EmbeddingError::Api(format!(
                        "provider returned {} vectors for {} inputs",
                        batch_vectors.len(),
                        batch.len()
                    )));
                }
                vectors.extend(batch_vectors);
            }
            let mut cache = self.cache.lock().unwrap();
            for (&i, vector) in miss_indices.iter().zip(vectors) {
                cache.put(&model, texts[i], vector.clone());
                results[i] = Some(vector);
            }
        }

        Ok(results.into_iter().map(|v| v.unwrap_or_default()).collect())
    }
}
