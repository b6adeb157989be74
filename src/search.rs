//! Brute-force cosine similarity search over a capped candidate pool.

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    error::Result,
    store::{Metadata, Store},
};

/// Upper bound on the number of chunks pulled from the store per query.
///
/// This is the system's central scalability ceiling: candidates are scored
/// by brute force, so the pool is capped as a precision/latency trade-off.
/// If the true best match is not among the first `MAX_CANDIDATES` chunks
/// the store returns, it will not appear in the results; there is no
/// re-query and no pool widening. Callers with corpora larger than this
/// should not expect exhaustive recall.
pub const MAX_CANDIDATES: usize = 200;

/// A scored search result, one per scorable candidate chunk.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub doc_id: String,
    pub chunk_id: String,
    pub text: String,
    /// Cosine similarity against the query vector, in [-1, 1].
    pub score: f32,
    pub meta: Metadata,
}

/// Score chunks against `query_embedding` and return the top `top_k`,
/// ordered by score descending.
///
/// Fetches at most [`MAX_CANDIDATES`] chunks via [`Store::scan`]
/// (restricted to `filter_doc_ids` when given), skips candidates whose
/// embedding is empty or of a different dimensionality than the query, and
/// keeps every remaining candidate regardless of score. Score ties order
/// by chunk id ascending so repeated queries return a stable sequence.
/// Fewer scorable candidates than `top_k` returns all of them; zero
/// matches return an empty Vec, never an error.
///
/// # Examples
///
/// ```no_run
/// use ragstore::{search, Store};
///
/// let store = Store::open("store.redb".as_ref()).unwrap();
/// let results = search::search(&store, &[0.1, 0.9], 5, None).unwrap();
/// for r in &results {
///     println!("{} [{:.3}]", r.chunk_id, r.score);
/// }
/// ```
pub fn search(
    store: &Store,
    query_embedding: &[f32],
    top_k: usize,
    filter_doc_ids: Option<&[String]>,
) -> Result<Vec<SearchResult>> {
    let candidates = store.scan(filter_doc_ids, MAX_CANDIDATES)?;

    // Score candidates in parallel; scoring is independent per chunk.
    let mut results: Vec<SearchResult> = candidates
        .into_par_iter()
        .filter_map(|chunk| {
            if chunk.embedding.is_empty() {
                return None;
            }
            if chunk.embedding.len() != query_embedding.len() {
                tracing::debug!(
                    chunk_id = %chunk.chunk_id,
                    query_dim = query_embedding.len(),
                    chunk_dim = chunk.embedding.len(),
                    "skipping chunk with mismatched embedding dimension"
                );
                return None;
            }
            let score = cosine_sim(query_embedding, &chunk.embedding);
            Some(SearchResult {
                doc_id: chunk.doc_id,
                chunk_id: chunk.chunk_id,
                text: chunk.text,
                score,
                meta: chunk.meta,
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });

    results.truncate(top_k);
    Ok(results)
}

/// Cosine similarity between two equal-length vectors.
///
/// A zero norm on either side yields 0.0: zero vectors carry no direction
/// and are scored as neutral rather than dividing by zero.
fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let a_norm = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let b_norm = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    dot / (a_norm * b_norm)
}

/// Format results for human-readable terminal output.
pub fn format_human(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    for (i, r) in results.iter().enumerate() {
        println!("{:>3}. [{:.3}] {}", i + 1, r.score, r.chunk_id);
        let preview: String = r.text.chars().take(72).collect();
        if !preview.is_empty() {
            println!("     {preview}");
        }
    }
    println!("\n{} result(s)", results.len());
}

/// Format results as a JSON document on stdout.
pub fn format_json(results: &[SearchResult]) -> Result<()> {
    let doc = serde_json::json!({
        "result_count": results.len(),
        "results": results,
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
