//! Sentence-window chunking engine.
//!
//! Splits parsed documents into overlapping token-bounded windows: sentences
//! accumulate until the next one would overflow `chunk_size`, the window is
//! flushed, and the tail sentences that fit within `chunk_overlap` tokens seed
//! the next window. A single sentence longer than `chunk_size` is hard-split
//! directly on token boundaries. Purely local and deterministic — no I/O.

use skimmer_core::chunk::{content_hash, ParsedDocument, TextChunk};
use skimmer_core::config::ChunkConfig;

/// Token count via whitespace splitting. Kept in one place so the
/// tokenizer can be swapped without touching the window logic.
fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split text into sentences on boundary punctuation (`.`, `!`, `?`)
/// followed by whitespace. Punctuation stays with its sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            let s = current.trim();
            if !s.is_empty() {
                sentences.push(s.to_string());
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Fixed-size chunker with sentence-aware overlap.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(config: &ChunkConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap.min(config.chunk_size.saturating_sub(1)),
        }
    }

    fn make_chunk(
        &self,
        content: String,
        token_count: usize,
        page_number: Option<u32>,
        section_title: Option<&str>,
        start_offset: usize,
        end_offset: usize,
    ) -> TextChunk {
        TextChunk {
            content_hash: content_hash(&content),
            content,
            token_count,
            chunk_index: 0, // reassigned globally in chunk_document
            page_number,
            start_offset: Some(start_offset),
            end_offset: Some(end_offset),
            section_title: section_title.map(|s| s.to_string()),
        }
    }

    /// Chunk a single text block. Empty or whitespace-only input yields no
    /// chunks. `chunk_index` on the output is page-local (0-based); callers
    /// chunking whole documents get global indices from [`chunk_document`].
    pub fn chunk_text(
        &self,
        text: &str,
        page_number: Option<u32>,
        section_title: Option<&str>,
    ) -> Vec<TextChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Vec::new();
        }

        let mut chunks: Vec<TextChunk> = Vec::new();
        let mut window: Vec<String> = Vec::new();
        let mut window_tokens = 0usize;
        let mut text_offset = 0usize;

        for sentence in sentences {
            let sentence_tokens = count_tokens(&sentence);

            // A sentence that cannot fit in any window is split on token
            // boundaries with stride chunk_size - chunk_overlap.
            if sentence_tokens > self.chunk_size {
                if !window.is_empty() {
                    let content = window.join(" ");
                    let start = text_offset.saturating_sub(content.len());
                    chunks.push(self.make_chunk(
                        content,
                        window_tokens,
                        page_number,
                        section_title,
                        start,
                        text_offset,
                    ));
                    window.clear();
                    window_tokens = 0;
                }

                let words: Vec<&str> = sentence.split_whitespace().collect();
                let stride = (self.chunk_size - self.chunk_overlap).max(1);
                let mut i = 0;
                loop {
                    let end = (i + self.chunk_size).min(words.len());
                    let piece = words[i..end].join(" ");
                    let piece_len = piece.len();
                    chunks.push(self.make_chunk(
                        piece,
                        end - i,
                        page_number,
                        section_title,
                        text_offset,
                        text_offset + piece_len,
                    ));
                    text_offset += piece_len + 1;
                    if end == words.len() {
                        break;
                    }
                    i += stride;
                }
                continue;
            }

            // Flush when the next sentence would overflow the window, seeding
            // the new window with trailing sentences within chunk_overlap.
            if window_tokens + sentence_tokens > self.chunk_size && !window.is_empty() {
                let content = window.join(" ");
                let start = text_offset.saturating_sub(content.len());
                chunks.push(self.make_chunk(
                    content,
                    window_tokens,
                    page_number,
                    section_title,
                    start,
                    text_offset,
                ));

                let mut overlap_tokens = 0usize;
                let mut seed: Vec<String> = Vec::new();
                for s in window.iter().rev() {
                    let s_tokens = count_tokens(s);
                    if overlap_tokens + s_tokens <= self.chunk_overlap {
                        seed.insert(0, s.clone());
                        overlap_tokens += s_tokens;
                    } else {
                        break;
                    }
                }
                window = seed;
                window_tokens = overlap_tokens;
            }

            text_offset += sentence.len() + 1;
            window.push(sentence);
            window_tokens += sentence_tokens;
        }

        if !window.is_empty() {
            let content = window.join(" ");
            let start = text_offset.saturating_sub(content.len());
            chunks.push(self.make_chunk(
                content,
                window_tokens,
                page_number,
                section_title,
                start,
                text_offset,
            ));
        }

        // Page-local indices; chunk_document reassigns globally.
        for (i, c) in chunks.iter_mut().enumerate() {
            c.chunk_index = i;
        }
        chunks
    }

    /// Chunk a whole parsed document page by page. `chunk_index` is assigned
    /// sequentially across the document after all pages are chunked.
    pub fn chunk_document(&self, doc: &ParsedDocument) -> Vec<TextChunk> {
        let mut all_chunks: Vec<TextChunk> = Vec::new();

        for page in &doc.pages {
            let page_chunks = self.chunk_text(
                &page.content,
                Some(page.page_number),
                page.section_title.as_deref(),
            );
            all_chunks.extend(page_chunks);
        }

        for (i, chunk) in all_chunks.iter_mut().enumerate() {
            chunk.chunk_index = i;
        }

        tracing::debug!(
            filename = %doc.filename,
            pages = doc.pages.len(),
            chunks = all_chunks.len(),
            "chunked document"
        );
        all_chunks
    }
}
