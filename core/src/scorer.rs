//! BM25+ relevance scoring.
//!
//! ```text
//! score(d, q) = Σ_t idf(t) * ( (k1 + 1) * f(t,d) / (k1 * (1 - b + b * |d| / avgdl) + f(t,d)) + delta )
//! idf(t)      = ln( (N - df(t) + 0.5) / (df(t) + 0.5) + 1 )
//! ```
//!
//! Only documents in a query term's postings receive that term's contribution, so a
//! document sharing no term with the query scores exactly zero.

use crate::index::TermStatsIndex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f32,
    /// Length normalization.
    pub b: f32,
    /// Lower bound added for every matching term.
    pub delta: f32,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 1.5, b: 0.75, delta: 1.0 } }
}

/// One score per document ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector(Vec<f32>);

impl ScoreVector {
    pub fn as_slice(&self) -> &[f32] { &self.0 }

    pub fn into_inner(self) -> Vec<f32> { self.0 }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// True when no query term matched any document.
    pub fn is_degenerate(&self) -> bool { self.0.iter().all(|s| *s == 0.0) }
}

pub fn idf(num_docs: u32, df: u32) -> f32 {
    let n = num_docs as f32;
    let df = df as f32;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Score every document against an already tokenized query.
///
/// Repeated query terms contribute once per occurrence. Out-of-vocabulary terms
/// contribute nothing.
pub fn score(index: &TermStatsIndex, query: &[String], params: &Bm25Params) -> ScoreVector {
    let mut scores = vec![0.0f32; index.num_docs as usize];
    let Bm25Params { k1, b, delta } = *params;
    let avgdl = index.avg_doc_length.max(f32::EPSILON);

    for term in query {
        let Some(tid) = index.term_id(term) else { continue };
        let idf = idf(index.num_docs, index.df[tid as usize]);
        for p in &index.postings[tid as usize] {
            let dl = index.doc_lengths[p.doc as usize] as f32;
            let tf = p.tf as f32;
            let tf_norm = (k1 + 1.0) * tf / (k1 * (1.0 - b + b * dl / avgdl) + tf);
            scores[p.doc as usize] += idf * (tf_norm + delta);
        }
    }

    let out = ScoreVector(scores);
    if out.is_degenerate() {
        tracing::debug!(terms = query.len(), "query matched no indexed term");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::tokenizer::{Tokenizer, WhitespaceTokenizer};

    fn build(docs: Vec<(u64, &str, &str)>) -> TermStatsIndex {
        TermStatsIndex::build(&Corpus::from_documents(docs), &WhitespaceTokenizer).unwrap()
    }

    fn q(s: &str) -> Vec<String> { WhitespaceTokenizer.tokenize(s) }

    #[test]
    fn matches_formula_by_hand() {
        let idx = build(vec![(1, "", "cat sat"), (2, "", "dog ran far away")]);
        let s = score(&idx, &q("cat"), &Bm25Params::default());
        // N=2, df=1, |d|=2, avgdl=3, tf=1
        let idf = (1.5f32 / 1.5 + 1.0).ln();
        let tf_norm = 2.5 * 1.0 / (1.5 * (1.0 - 0.75 + 0.75 * 2.0 / 3.0) + 1.0);
        let expected = idf * (tf_norm + 1.0);
        assert!((s.as_slice()[0] - expected).abs() < 1e-6);
        assert_eq!(s.as_slice()[1], 0.0);
    }

    #[test]
    fn out_of_vocabulary_is_all_zero() {
        let idx = build(vec![(1, "", "cat sat"), (2, "", "dog ran")]);
        let s = score(&idx, &q("unicorn"), &Bm25Params::default());
        assert_eq!(s.len(), 2);
        assert!(s.is_degenerate());
        assert!(score(&idx, &[], &Bm25Params::default()).is_degenerate());
    }

    #[test]
    fn delta_keeps_long_documents_positive() {
        let long = format!("cat {}", "filler ".repeat(500));
        let idx = build(vec![(1, "", "cat"), (2, "", long.as_str()), (3, "", "dog")]);
        let s = score(&idx, &q("cat"), &Bm25Params::default());
        let floor = idf(3, 2) * 1.0;
        assert!(s.as_slice()[1] > floor);
        assert!(s.as_slice()[0] > s.as_slice()[1]);
    }

    #[test]
    fn repeated_query_terms_add_up() {
        let idx = build(vec![(1, "", "cat sat"), (2, "", "dog ran")]);
        let once = score(&idx, &q("cat"), &Bm25Params::default());
        let twice = score(&idx, &q("cat cat"), &Bm25Params::default());
        assert!((twice.as_slice()[0] - 2.0 * once.as_slice()[0]).abs() < 1e-6);
    }

    #[test]
    fn scoring_is_deterministic() {
        let idx = build(vec![(1, "", "a b c a"), (2, "", "b c d"), (3, "", "a d d")]);
        let a = score(&idx, &q("a d b"), &Bm25Params::default());
        let b = score(&idx, &q("a d b"), &Bm25Params::default());
        let bits = |v: &ScoreVector| v.as_slice().iter().map(|f| f.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }
}
