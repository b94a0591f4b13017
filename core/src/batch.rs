use crate::error::{Result, RetrievalError};
use crate::index::TermStatsIndex;
use crate::persist::{load_blob, save_blob, BlobKind};
use crate::scorer::{score, Bm25Params};
use crate::tokenizer::Tokenizer;
use crate::topk::{top_k, ScoredDoc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// Top-k hits for an ordered batch of queries, parallel to the query list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub k: usize,
    pub queries: Vec<String>,
    pub hits: Vec<Vec<ScoredDoc>>,
}

impl BatchResult {
    pub fn scores(&self) -> Vec<Vec<f32>> {
        self.hits.iter().map(|h| h.iter().map(|d| d.score).collect()).collect()
    }

    pub fn indices(&self) -> Vec<Vec<u32>> {
        self.hits.iter().map(|h| h.iter().map(|d| d.ordinal).collect()).collect()
    }

    /// Queries for which no document matched any term.
    pub fn degenerate_count(&self) -> usize {
        self.hits.iter().filter(|h| h.iter().all(|d| d.score == 0.0)).count()
    }
}

/// Score every query in parallel; the index is shared read-only across workers.
pub fn score_batch<T: Tokenizer + ?Sized>(
    index: &TermStatsIndex,
    tokenizer: &T,
    queries: &[String],
    k: usize,
    params: &Bm25Params,
) -> Result<BatchResult> {
    if k == 0 {
        return Err(RetrievalError::invalid_argument("k must be at least 1"));
    }
    let start = Instant::now();
    let hits = queries
        .par_iter()
        .map(|query| {
            let tokens = tokenizer.tokenize(query);
            let scores = score(index, &tokens, params);
            top_k(scores.as_slice(), k)
        })
        .collect::<Result<Vec<_>>>()?;
    let result = BatchResult { k, queries: queries.to_vec(), hits };
    tracing::info!(
        queries = queries.len(),
        k,
        degenerate = result.degenerate_count(),
        took_s = start.elapsed().as_secs_f64(),
        "scored query batch"
    );
    Ok(result)
}

/// Return the batch cached at `path`, or score it and cache the result.
///
/// The cache is keyed by the caller choosing `path`: a cached batch is returned as-is
/// even if it was produced for other queries or another `k`.
pub fn load_or_score_batch<T: Tokenizer + ?Sized>(
    path: &Path,
    index: &TermStatsIndex,
    tokenizer: &T,
    queries: &[String],
    k: usize,
    params: &Bm25Params,
) -> Result<BatchResult> {
    if k == 0 {
        return Err(RetrievalError::invalid_argument("k must be at least 1"));
    }
    if let Some(cached) = load_blob::<BatchResult>(path, BlobKind::QueryBatch)? {
        if cached.k != k || cached.queries != queries {
            tracing::warn!(path = %path.display(), cached_k = cached.k, k, "query batch cache was written for a different batch");
        }
        tracing::info!(path = %path.display(), queries = cached.queries.len(), "loaded query batch cache");
        return Ok(cached);
    }
    let result = score_batch(index, tokenizer, queries, k, params)?;
    save_blob(path, BlobKind::QueryBatch, &result)?;
    Ok(result)
}
