//! Cross-encoder endpoint reranker (primary provider).
//!
//! Speaks the TEI (Text Embeddings Inference) rerank API:
//!   POST <base_url>/rerank
//!   {"query": "...", "texts": ["passage1", ...], "truncate": true}
//!   → [{"index": 0, "score": 0.98}, {"index": 1, "score": 0.12}, ...]

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use skimmer_core::chunk::RetrievedChunk;
use skimmer_core::config::RerankConfig;

use super::{truncate_passage, RerankError, Reranker};

pub struct HfEndpointReranker {
    client: Client,
    base_url: Option<String>,
    token: Option<String>,
    max_passage_chars: usize,
    retry_max: u32,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
    truncate: bool,
}

impl HfEndpointReranker {
    pub fn new(config: &RerankConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_seconds))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.hf_url.clone(),
            token: config.hf_token.clone(),
            max_passage_chars: config.max_passage_chars,
            retry_max: config.retry_max,
        }
    }

    async fn attempt(
        &self,
        url: &str,
        payload: &RerankRequest<'_>,
        n_candidates: usize,
    ) -> Result<Vec<(usize, f64)>, RerankError> {
        let mut request = self.client.post(url).json(payload);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RerankError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: Value = response.json().await?;
        parse_endpoint_response(&body, n_candidates)
    }
}

/// Parse the TEI response. Anything that is valid JSON but not an array is a
/// schema failure the retry loop must not retry.
fn parse_endpoint_response(
    body: &Value,
    n_candidates: usize,
) -> Result<Vec<(usize, f64)>, RerankError> {
    let Some(items) = body.as_array() else {
        return Err(RerankError::InvalidResponse(format!(
            "expected list, got {}",
            json_type_name(body)
        )));
    };

    let mut scores = Vec::with_capacity(items.len());
    for item in items {
        let Some(index) = item.get("index").and_then(Value::as_u64) else {
            continue;
        };
        let index = index as usize;
        if index >= n_candidates {
            continue;
        }
        let score = item.get("score").and_then(Value::as_f64).unwrap_or(0.0);
        scores.push((index, score));
    }
    Ok(scores)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Map `(index, score)` pairs back onto the candidates at those submitted
/// positions, then order by score descending (unscored candidates sort as
/// 0.0). Produces new records; input is untouched.
fn apply_scores(
    candidates: &[RetrievedChunk],
    scores: &[(usize, f64)],
    topn: usize,
) -> Vec<RetrievedChunk> {
    let mut out: Vec<RetrievedChunk> = candidates.to_vec();
    for &(index, score) in scores {
        if let Some(candidate) = out.get_mut(index) {
            candidate.rerank_score = Some(score);
        }
    }
    out.sort_by(|a, b| {
        b.rerank_score
            .unwrap_or(0.0)
            .total_cmp(&a.rerank_score.unwrap_or(0.0))
    });
    out.truncate(topn);
    out
}

#[async_trait]
impl Reranker for HfEndpointReranker {
    fn name(&self) -> &'static str {
        "hf_endpoint"
    }

    async fn rerank(
        &self,
        query: &str,
        candidates: &[RetrievedChunk],
        topn: usize,
    ) -> Result<Vec<RetrievedChunk>, RerankError> {
        let Some(base_url) = self.base_url.as_deref().filter(|u| !u.is_empty()) else {
            return Err(RerankError::NotConfigured(
                "HF_RERANK_URL is not set".to_string(),
            ));
        };
        let url = format!("{}/rerank", base_url.trim_end_matches('/'));

        let texts: Vec<String> = candidates
            .iter()
            .map(|c| truncate_passage(&c.content, self.max_passage_chars))
            .collect();
        let payload = RerankRequest {
            query,
            texts: &texts,
            truncate: true,
        };

        let mut last_error: Option<RerankError> = None;
        for attempt in 0..=self.retry_max {
            match self.attempt(&url, &payload, candidates.len()).await {
                Ok(scores) => {
                    info!(
                        candidates = candidates.len(),
                        attempt = attempt + 1,
                        "endpoint reranker scored candidates"
                    );
                    return Ok(apply_scores(candidates, &scores, topn));
                }
                // Schema failures are final; transport/API/decode errors
                // get retried.
                Err(e @ RerankError::InvalidResponse(_)) => return Err(e),
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "endpoint reranker attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            RerankError::InvalidResponse("no rerank attempts were made".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a fixed HTTP response on a local port, counting requests.
    /// `connection: close` forces one request per accepted connection.
    async fn serve_fixed(response: String) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        (base_url, requests)
    }

    fn chunk(id: &str, content: &str) -> RetrievedChunk {
        RetrievedChunk {
            chunk_id: id.to_string(),
            document_id: "d1".to_string(),
            document_filename: "f.pdf".to_string(),
            content: content.to_string(),
            page_number: Some(1),
            section_title: None,
            score: 0.5,
            fused_score: Some(0.01),
            rerank_score: None,
        }
    }

    #[tokio::test]
    async fn unconfigured_url_fails_without_http() {
        let reranker = HfEndpointReranker::new(&RerankConfig::default());
        let err = reranker
            .rerank("q", &[chunk("a", "x")], 5)
            .await
            .unwrap_err();
        assert!(matches!(err, RerankError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn status_failures_retry_up_to_bound() {
        let (url, requests) = serve_fixed(
            "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                .to_string(),
        )
        .await;
        let config = RerankConfig {
            hf_url: Some(url),
            retry_max: 2,
            ..RerankConfig::default()
        };
        let reranker = HfEndpointReranker::new(&config);

        let err = reranker
            .rerank("q", &[chunk("a", "x")], 5)
            .await
            .unwrap_err();
        assert!(matches!(err, RerankError::Api { status: 503, .. }));
        assert_eq!(
            requests.load(Ordering::SeqCst),
            3,
            "one attempt plus retry_max"
        );
    }

    #[tokio::test]
    async fn non_list_body_stops_after_one_attempt() {
        let body = r#"{"error":"wrong shape"}"#;
        let (url, requests) = serve_fixed(format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body,
        ))
        .await;
        let config = RerankConfig {
            hf_url: Some(url),
            retry_max: 2,
            ..RerankConfig::default()
        };
        let reranker = HfEndpointReranker::new(&config);

        let err = reranker
            .rerank("q", &[chunk("a", "x")], 5)
            .await
            .unwrap_err();
        assert!(matches!(err, RerankError::InvalidResponse(_)));
        assert_eq!(requests.load(Ordering::SeqCst), 1, "schema failure is final");
    }

    #[test]
    fn non_list_response_is_schema_failure() {
        let err = parse_endpoint_response(&json!({"wrong": "schema"}), 2).unwrap_err();
        assert!(matches!(err, RerankError::InvalidResponse(_)));
        assert!(err.to_string().contains("expected list"));
    }

    #[test]
    fn scores_map_to_submitted_indices() {
        let scores =
            parse_endpoint_response(&json!([{"index": 1, "score": 0.95}, {"index": 0, "score": 0.4}]), 2)
                .unwrap();
        let candidates = [chunk("a", "Hello"), chunk("b", "World")];
        let out = apply_scores(&candidates, &scores, 2);

        // Highest score belongs to index 1 = "b", regardless of order in
        // the response array.
        assert_eq!(out[0].chunk_id, "b");
        assert_eq!(out[0].rerank_score, Some(0.95));
        assert_eq!(out[1].chunk_id, "a");
        assert_eq!(out[1].rerank_score, Some(0.4));
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let scores =
            parse_endpoint_response(&json!([{"index": 7, "score": 0.9}, {"index": 0, "score": 0.2}]), 2)
                .unwrap();
        assert_eq!(scores, vec![(0, 0.2)]);
    }

    #[test]
    fn items_without_index_are_skipped() {
        let scores =
            parse_endpoint_response(&json!([{"score": 0.9}, {"index": 1, "score": 0.3}]), 2).unwrap();
        assert_eq!(scores, vec![(1, 0.3)]);
    }

    #[test]
    fn apply_scores_truncates_to_topn() {
        let candidates = [chunk("a", "x"), chunk("b", "y"), chunk("c", "z")];
        let out = apply_scores(&candidates, &[(0, 0.1), (1, 0.9), (2, 0.5)], 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].chunk_id, "b");
        assert_eq!(out[1].chunk_id, "c");
    }

    #[test]
    fn apply_scores_does_not_mutate_input() {
        let candidates = [chunk("a", "x")];
        let _ = apply_scores(&candidates, &[(0, 0.7)], 1);
        assert_eq!(candidates[0].rerank_score, None);
    }
}
