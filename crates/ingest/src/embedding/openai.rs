use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use skimmer_core::config::EmbeddingConfig;

use super::traits::{Embedder, EmbeddingError};

/// OpenAI-compatible embedding backend. Serves both OpenAI and Mistral —
/// Mistral's API speaks the same shape on a different base URL and without
/// the `dimensions` request field.
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
    supports_dimensions: bool,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        dimensions: usize,
        supports_dimensions: bool,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com".to_string()),
            dimensions,
            supports_dimensions,
        }
    }

    /// Build from config, picking base URL and key by provider name.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| {
                EmbeddingError::Api(format!(
                    "no API key configured for embedding provider '{}'",
                    config.provider
                ))
            })?
            .to_string();
        let (default_base, supports_dimensions) = match config.provider.as_str() {
            "mistral" => ("https://api.mistral.ai", false),
            _ => ("https://api.openai.com", true),
        };
        Ok(Self::new(
            api_key,
            config.model.clone(),
            Some(
                config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| default_base.to_string()),
            ),
            config.dimensions,
            supports_dimensions,
        ))
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedItem>,
}

#[derive(Deserialize)]
struct EmbedItem {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = EmbedRequest {
            model: self.model.clone(),
            input: texts.iter().map(|t| t.to_string()).collect(),
            dimensions: self.supports_dimensions.then_some(self.dimensions),
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(format!("{status}: {body}")));
        }

        let mut resp: EmbedResponse = response.json().await?;

        // Sort by index to maintain input order.
        resp.data.sort_by_key(|item| item.index);

        let embeddings: Vec<Vec<f32>> = resp.data.into_iter().map(|item| item.embedding).collect();

        // Validate dimensions on first vector.
        if let Some(first) = embeddings.first() {
            if first.len() != self.dimensions {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: first.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}
