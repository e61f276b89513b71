use std::num::NonZeroUsize;

use lru::LruCache;

use skimmer_core::chunk::content_hash;

/// Cache key: model identifier plus SHA-256 of the text, so the same text
/// embedded under different models never collides.
pub fn cache_key(model: &str, text: &str) -> String {
    format!("{}:{}", model, content_hash(text))
}

/// LRU cache mapping (model, text hash) to embedding vector. Entries are
/// write-once per key — a racing miss costs one duplicate upstream call,
/// never a wrong vector.
pub struct EmbeddingCache {
    cache: LruCache<String, Vec<f32>>,
    hits: u64,
    misses: u64,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or_else(|| NonZeroUsize::new(1).unwrap()),
            ),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a cached embedding by model and text.
    pub fn get(&mut self, model: &str, text: &str) -> Option<Vec<f32>> {
        if let Some(vec) = self.cache.get(&cache_key(model, text)) {
            self.hits += 1;
            Some(vec.clone())
        } else {
            self.misses += 1;
            None
        }
    }

    /// Store an embedding for a text.
    pub fn put(&mut self, model: &str, text: &str, embedding: Vec<f32>) {
        self.cache.put(cache_key(model, text), embedding);
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
