//! Vector similarity and hybrid search utilities.
//!
//! Pure-Rust implementations of:
//! - Cosine similarity
//! - Reciprocal Rank Fusion (RRF) for merging keyword and vector rankings

use std::collections::HashMap;

use bariatric_core::knowledge::Passage;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank passages by cosine similarity to a query embedding.
///
/// Passages without embeddings, or scoring below `min_score`, are skipped.
pub fn vector_search<'a>(
    passages: &'a [Passage],
    query_embedding: &[f32],
    limit: usize,
    min_score: f32,
) -> Vec<&'a Passage> {
    let mut scored: Vec<(f32, &Passage)> = passages
        .iter()
        .filter_map(|p| {
            let emb = p.embedding.as_ref()?;
            let sim = cosine_similarity(emb, query_embedding);
            (sim >= min_score).then_some((sim, p))
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored.into_iter().map(|(_, p)| p).collect()
}

/// Reciprocal Rank Fusion: merge two ranked passage lists.
///
/// Each passage's score is the sum of 1/(k + rank) across both lists.
/// Deduplicated by passage ID; equal scores keep first-seen order.
pub fn reciprocal_rank_fusion<'a>(
    keyword_results: &[&'a Passage],
    vector_results: &[&'a Passage],
    k: u32,
    limit: usize,
) -> Vec<&'a Passage> {
    let k = k as f32;
    let mut merged: Vec<(f32, &'a Passage)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for list in [keyword_results, vector_results] {
        for (rank, passage) in list.iter().enumerate() {
            let rrf_score = 1.0 / (k + rank as f32 + 1.0);
            match index.get(passage.id.as_str()) {
                Some(&i) => merged[i].0 += rrf_score,
                None => {
                    index.insert(passage.id.as_str(), merged.len());
                    merged.push((rrf_score, passage));
                }
            }
        }
    }

    merged.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(limit);
    merged.into_iter().map(|(_, p)| p).collect()
}
