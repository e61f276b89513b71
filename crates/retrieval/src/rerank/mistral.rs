//! LLM-prompted reranker (fallback provider), backed by Mistral chat
//! completions in JSON-object mode. One shot, no internal retry — the
//! orchestrator already sits above a fallback chain.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{error, info};

use skimmer_core::chunk::RetrievedChunk;
use skimmer_core::config::RerankConfig;

use super::{truncate_passage, RerankError, Reranker};

const MISTRAL_CHAT_URL: &str = "https://api.mistral.ai/v1/chat/completions";

fn build_prompt(query: &str, passages: &str) -> String {
    format!(
        "You are a reranking engine. Rank the given passages by how useful \
         they are to answer the user's query.\n\n\
         User query: {query}\n\n\
         Passages:\n{passages}\n\n\
         Output ONLY valid JSON with a 'ranking' array of objects, each with \
         'chunk_id' (string) and 'score' (float 0.0 to 1.0, higher is more \
         relevant).\n\
         Example: {{\"ranking\": [{{\"chunk_id\": \"abc\", \"score\": 0.95}}, ...]}}\n"
    )
}

pub struct MistralReranker {
    client: Client,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_passage_chars: usize,
    chat_url: String,
}

impl MistralReranker {
    pub fn new(config: &RerankConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(config.mistral_timeout_seconds))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key: config.mistral_api_key.clone().filter(|k| !k.is_empty()),
            model: config.mistral_model.clone(),
            temperature: config.temperature,
            max_passage_chars: config.max_passage_chars,
            chat_url: MISTRAL_CHAT_URL.to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }
}

/// Parse the model output into chunk_id → score. Malformed JSON or a missing
/// `ranking` list is a provider failure.
fn parse_ranking(content: &str) -> Result<HashMap<String, f64>, RerankError> {
    let parsed: Value = serde_json::from_str(content)
        .map_err(|e| RerankError::InvalidResponse(format!("invalid JSON: {e}")))?;
    let ranking = parsed
        .get("ranking")
        .and_then(Value::as_array)
        .ok_or_else(|| RerankError::InvalidResponse("missing 'ranking' list".to_string()))?;

    let mut scores = HashMap::with_capacity(ranking.len());
    for item in ranking {
        let chunk_id = match item.get("chunk_id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => continue,
        };
        let score = item.get("score").and_then(Value::as_f64).unwrap_or(0.0);
        scores.insert(chunk_id, score);
    }
    Ok(scores)
}

/// Score each candidate from the parsed ranking. Candidates the model left
/// out get `-inf` — sorted last, never dropped.
fn score_candidates(
    candidates: &[RetrievedChunk],
    scores: &HashMap<String, f64>,
    topn: usize,
) -> Vec<RetrievedChunk> {
    let mut out: Vec<RetrievedChunk> = candidates
        .iter()
        .map(|c| {
            c.with_rerank_score(scores.get(&c.chunk_id).copied().unwrap_or(f64::NEG_INFINITY))
        })
        .collect();
    out.sort_by(|a, b| {
        b.rerank_score
            .unwrap_or(f64::NEG_INFINITY)
            .total_cmp(&a.rerank_score.unwrap_or(f64::NEG_INFINITY))
    });
    out.truncate(topn);
    out
}

#[async_trait]
impl Reranker for MistralReranker {
    fn name(&self) -> &'static str {
        "mistral"
    }

    async fn rerank(
        &self,
        query: &str,
        candidates: &[RetrievedChunk],
        topn: usize,
    ) -> Result<Vec<RetrievedChunk>, RerankError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(RerankError::NotConfigured(
                "MISTRAL_API_KEY is not set".to_string(),
            ));
        };

        let passages = candidates
            .iter()
            .map(|c| {
                let snippet =
                    truncate_passage(&c.content, self.max_passage_chars).replace('\n', " ");
                format!("[{}] {}", c.chunk_id, snippet)
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let payload = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": build_prompt(query, &passages)}],
            "temperature": self.temperature,
            "response_format": {"type": "json_object"},
        });

        let response = self
            .client
            .post(&self.chat_url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "LLM reranker request failed");
                RerankError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RerankError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: Value = response.json().await?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                RerankError::InvalidResponse("missing choices[0].message.content".to_string())
            })?;

        let scores = parse_ranking(content)?;
        info!(candidates = candidates.len(), "LLM reranker scored candidates");
        Ok(score_candidates(candidates, &scores, topn))
    }
}
