use crate::error::{Result, RetrievalError};
use crate::DocOrdinal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub ordinal: DocOrdinal,
    pub score: f32,
}

// score descending, then ordinal ascending
fn rank(a: &ScoredDoc, b: &ScoredDoc) -> Ordering {
    b.score.total_cmp(&a.score).then(a.ordinal.cmp(&b.ordinal))
}

/// The `min(k, scores.len())` highest scores. Equal scores rank the lower ordinal first,
/// so an all-zero vector yields the first `k` documents.
pub fn top_k(scores: &[f32], k: usize) -> Result<Vec<ScoredDoc>> {
    if k == 0 {
        return Err(RetrievalError::invalid_argument("k must be at least 1"));
    }
    let mut docs: Vec<ScoredDoc> = scores
        .iter()
        .enumerate()
        .map(|(i, &score)| ScoredDoc { ordinal: i as DocOrdinal, score })
        .collect();
    if k < docs.len() {
        docs.select_nth_unstable_by(k - 1, rank);
        docs.truncate(k);
    }
    docs.sort_unstable_by(rank);
    Ok(docs)
}
