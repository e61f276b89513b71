//! Reciprocal Rank Fusion of the keyword and vector result lists.

use std::collections::HashMap;

use skimmer_core::chunk::RetrievedChunk;

struct Fused {
    chunk: RetrievedChunk,
    score: f64,
}

/// Merge keyword and vector results with RRF:
/// `fused_score = Σ 1/(k + rank)` across the lists a chunk appears in,
/// ranks 1-based in list order.
///
/// Payload policy: when both lists carry the same chunk id, the record with a
/// non-empty `document_filename` wins (vector payloads are richer); this is a
/// data-completeness tie-break, independent of scoring.
///
/// Deterministic: entries live in a first-seen Vec and the final ordering is
/// a stable sort by score, so identical inputs always produce identical
/// output — no hash-iteration order anywhere.
pub fn rrf_merge(
    keyword_results: &[RetrievedChunk],
    vector_results: &[RetrievedChunk],
    k: u32,
) -> Vec<RetrievedChunk> {
    let mut entries: Vec<Fused> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    let mut absorb = |list: &[RetrievedChunk]| {
        for (i, chunk) in list.iter().enumerate() {
            let rank = i as u32 + 1;
            let contribution = 1.0 / f64::from(k + rank);
            match by_id.get(&chunk.chunk_id) {
                Some(&idx) => {
                    entries[idx].score += contribution;
                    if entries[idx].chunk.document_filename.is_empty()
                        && !chunk.document_filename.is_empty()
                    {
                        entries[idx].chunk = chunk.clone();
                    }
                }
                None => {
                    by_id.insert(chunk.chunk_id.clone(), entries.len());
                    entries.push(Fused {
                        chunk: chunk.clone(),
                        score: contribution,
                    });
                }
            }
        }
    };

    absorb(keyword_results);
    absorb(vector_results);

    // Stable sort: equal scores keep first-seen order.
    entries.sort_by(|a, b| b.score.total_cmp(&a.score));

    entries
        .into_iter()
        .map(|entry| {
            let mut chunk = entry.chunk;
            chunk.fused_score = Some(entry.score);
            chunk
        })
        .collect()
}
