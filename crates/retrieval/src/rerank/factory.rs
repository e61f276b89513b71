//! Provider selection by configured name. The registry is fixed:
//! "hf_endpoint" and "mistral"; "none" (or empty) as the fallback name
//! disables the safety net.

use tracing::warn;

use skimmer_core::config::RerankConfig;

use super::{HfEndpointReranker, MistralReranker, Reranker};

fn build(name: &str, config: &RerankConfig) -> Option<Box<dyn Reranker>> {
    match name {
        "hf_endpoint" => Some(Box::new(HfEndpointReranker::new(config))),
        "mistral" => Some(Box::new(MistralReranker::new(config))),
        other => {
            warn!(provider = other, "unknown rerank provider");
            None
        }
    }
}

/// The primary reranker, or `None` when reranking is disabled or the
/// configured name is unknown.
pub fn create_reranker(config: &RerankConfig) -> Option<Box<dyn Reranker>> {
    if !config.enabled {
        return None;
    }
    build(&config.provider, config)
}

/// The fallback reranker, or `None` when disabled ("none"/empty) or unknown.
pub fn create_fallback_reranker(config: &RerankConfig) -> Option<Box<dyn Reranker>> {
    if !config.fallback_enabled() {
        return None;
    }
    build(&config.fallback_provider, config)
}
