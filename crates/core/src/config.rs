use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_usize(key: &str, default: usize) -> usize {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|v| matches!(v.as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub chunking: ChunkConfig,
    pub embedding: EmbeddingConfig,
    pub hybrid: HybridConfig,
    pub rerank: RerankConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            chunking: ChunkConfig::from_env(),
            embedding: EmbeddingConfig::from_env(),
            hybrid: HybridConfig::from_env(),
            rerank: RerankConfig::from_env(),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  chunking:  size={} overlap={}",
            self.chunking.chunk_size,
            self.chunking.chunk_overlap
        );
        tracing::info!(
            "  embedding: provider={} model={} dims={}",
            self.embedding.provider,
            self.embedding.model,
            self.embedding.dimensions
        );
        tracing::info!(
            "  hybrid:    keyword_topk={} vector_topk={} rrf_k={}",
            self.hybrid.keyword_topk,
            self.hybrid.vector_topk,
            self.hybrid.rrf_k
        );
        tracing::info!(
            "  rerank:    enabled={} provider={} fallback={}",
            self.rerank.enabled,
            self.rerank.provider,
            self.rerank.fallback_provider
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "chunking": {
                "chunk_size": self.chunking.chunk_size,
                "chunk_overlap": self.chunking.chunk_overlap,
            },
            "embedding": {
                "provider": self.embedding.provider,
                "model": self.embedding.model,
                "dimensions": self.embedding.dimensions,
                "configured": self.embedding.is_configured(),
            },
            "hybrid": {
                "keyword_topk": self.hybrid.keyword_topk,
                "vector_topk": self.hybrid.vector_topk,
                "rrf_k": self.hybrid.rrf_k,
            },
            "rerank": {
                "enabled": self.rerank.enabled,
                "provider": self.rerank.provider,
                "fallback_provider": self.rerank.fallback_provider,
                "endpoint_configured": self.rerank.hf_url.is_some(),
            },
        })
    }
}

// ── Chunking ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum tokens per chunk.
    pub chunk_size: usize,
    /// Tokens carried over into the next chunk window.
    pub chunk_overlap: usize,
}

impl ChunkConfig {
    fn from_env() -> Self {
        Self {
            chunk_size: env_usize("CHUNK_SIZE", 800),
            chunk_overlap: env_usize("CHUNK_OVERLAP", 100),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "openai" or "mistral" (OpenAI-compatible API, different base URL).
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub openai_api_key: Option<String>,
    pub mistral_api_key: Option<String>,
    /// Override for the API base URL (defaults per provider).
    pub base_url: Option<String>,
    /// LRU cache capacity in entries.
    pub cache_size: usize,
    /// Maximum texts per upstream embedding request.
    pub batch_size: usize,
}

impl EmbeddingConfig {
    fn from_env() -> Self {
        Self {
            provider: env_or("EMBEDDING_PROVIDER", "openai"),
            model: env_or("EMBEDDING_MODEL", "text-embedding-3-small"),
            dimensions: env_usize("EMBEDDING_DIMENSIONS", 1536),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            mistral_api_key: env_opt("MISTRAL_API_KEY"),
            base_url: env_opt("EMBEDDING_BASE_URL"),
            cache_size: env_usize("EMBEDDING_CACHE_SIZE", 2048),
            batch_size: env_usize("EMBEDDING_BATCH_SIZE", 64),
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        match self.provider.as_str() {
            "mistral" => self.mistral_api_key.as_deref(),
            _ => self.openai_api_key.as_deref(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }
}

// ── Hybrid search ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridConfig {
    /// Result cap for the full-text leg.
    pub keyword_topk: usize,
    /// Result cap for the vector leg.
    pub vector_topk: usize,
    /// RRF smoothing constant k.
    pub rrf_k: u32,
}

impl HybridConfig {
    fn from_env() -> Self {
        Self {
            keyword_topk: env_usize("HYBRID_KEYWORD_TOPK", 20),
            vector_topk: env_usize("HYBRID_VECTOR_TOPK", 20),
            rrf_k: env_u32("HYBRID_RRF_K", 60),
        }
    }
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            keyword_topk: 20,
            vector_topk: 20,
            rrf_k: 60,
        }
    }
}

// ── Reranking ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    pub enabled: bool,
    /// Primary provider name: "hf_endpoint" or "mistral".
    pub provider: String,
    /// Fallback provider name; "none" or empty disables the fallback.
    pub fallback_provider: String,
    /// How many RRF candidates are submitted to the reranker.
    pub max_candidates: usize,
    /// Final result count after reranking.
    pub final_topn: usize,
    /// Per-passage character cap before submission.
    pub max_passage_chars: usize,
    /// Request timeout for the endpoint reranker, seconds.
    pub timeout_seconds: u64,
    /// Additional retries on transport errors (endpoint reranker only).
    pub retry_max: u32,
    pub hf_url: Option<String>,
    pub hf_token: Option<String>,
    pub mistral_api_key: Option<String>,
    pub mistral_model: String,
    /// Request timeout for the LLM reranker, seconds.
    pub mistral_timeout_seconds: u64,
    pub temperature: f32,
}

impl RerankConfig {
    fn from_env() -> Self {
        Self {
            enabled: env_bool("RERANK_ENABLED", true),
            provider: env_or("RERANK_PROVIDER", "hf_endpoint"),
            fallback_provider: env_or("RERANK_FALLBACK_PROVIDER", "mistral"),
            max_candidates: env_usize("RERANK_MAX_CANDIDATES", 30),
            final_topn: env_usize("RERANK_FINAL_TOPN", 8),
            max_passage_chars: env_usize("RERANK_MAX_PASSAGE_CHARS", 1500),
            timeout_seconds: env_u64("RERANK_TIMEOUT_SECONDS", 8),
            retry_max: env_u32("RERANK_RETRY_MAX", 2),
            hf_url: env_opt("HF_RERANK_URL"),
            hf_token: env_opt("HF_RERANK_TOKEN"),
            mistral_api_key: env_opt("MISTRAL_API_KEY"),
            mistral_model: env_or("RERANK_MISTRAL_MODEL", "mistral-small-latest"),
            mistral_timeout_seconds: env_u64("RERANK_MISTRAL_TIMEOUT_SECONDS", 12),
            temperature: env_f32("RERANK_TEMPERATURE", 0.0),
        }
    }

    pub fn fallback_enabled(&self) -> bool {
        !self.fallback_provider.is_empty() && self.fallback_provider != "none"
    }
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "hf_endpoint".to_string(),
            fallback_provider: "mistral".to_string(),
            max_candidates: 30,
            final_topn: 8,
            max_passage_chars: 1500,
            timeout_seconds: 8,
            retry_max: 2,
            hf_url: None,
            hf_token: None,
            mistral_api_key: None,
            mistral_model: "mistral-small-latest".to_string(),
            mistral_timeout_seconds: 12,
            temperature: 0.0,
        }
    }
}
