use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Tenant identifier — every index query is scoped to one tenant.
pub type TenantId = Uuid;

/// Collection identifier (a tenant groups documents into collections).
pub type CollectionId = Uuid;

/// Lowercase hex SHA-256 of `text`. Stable for identical content.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{:x}", digest)
}

// ── Parsed document input ───────────────────────────────────────────

/// One page of parsed text, as produced by the upstream parsing service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedPage {
    /// 1-based page number.
    pub page_number: u32,
    /// Extracted text of the page.
    pub content: String,
    /// Nearest heading for the page, when the parser found one.
    pub section_title: Option<String>,
}

/// A parsed document — the opaque unit handed to the chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub filename: String,
    pub pages: Vec<ParsedPage>,
}

impl ParsedDocument {
    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.content.len()).sum()
    }
}

// ── TextChunk ───────────────────────────────────────────────────────

/// An indexable text window produced at ingestion, persisted with its
/// document. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    /// Lowercase hex SHA-256 of `content`.
    pub content_hash: String,
    pub token_count: usize,
    /// Monotonic across the whole document, assigned after all pages.
    pub chunk_index: usize,
    pub page_number: Option<u32>,
    pub start_offset: Option<usize>,
    pub end_offset: Option<usize>,
    pub section_title: Option<String>,
}

// ── RetrievedChunk ──────────────────────────────────────────────────

/// A chunk as returned from search — transient, never persisted.
///
/// `score` is the source-native relevance (FTS rank or cosine similarity),
/// `fused_score` is set by RRF merging, `rerank_score` by a reranker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub document_filename: String,
    pub content: String,
    pub page_number: Option<u32>,
    pub section_title: Option<String>,
    pub score: f64,
    pub fused_score: Option<f64>,
    pub rerank_score: Option<f64>,
}

impl RetrievedChunk {
    /// Copy with a rerank score set (reranking never mutates candidates).
    pub fn with_rerank_score(&self, score: f64) -> Self {
        let mut out = self.clone();
        out.rerank_score = Some(score);
        out
    }

    /// Human-readable source attribution, e.g. `report.pdf, p. 3 (§ Results)`.
    pub fn citation(&self) -> String {
        let mut out = if self.document_filename.is_empty() {
            self.document_id.clone()
        } else {
            self.document_filename.clone()
        };
        if let Some(page) = self.page_number {
            out.push_str(&format!(", p. {}", page));
        }
        if let Some(title) = self.section_title.as_deref() {
            if !title.is_empty() {
                out.push_str(&format!(" (§ {})", title));
            }
        }
        out
    }
}
