use crate::batch::{load_or_score_batch, score_batch};
use crate::corpus::Corpus;
use crate::error::{Result, RetrievalError};
use crate::index::TermStatsIndex;
use crate::persist::load_or_build;
use crate::scorer::{score, Bm25Params};
use crate::tokenizer::Tokenizer;
use crate::topk::top_k;
use crate::DocOrdinal;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    pub index_cache_path: PathBuf,
    /// Batch results are cached here; `None` always rescores.
    pub batch_cache_path: Option<PathBuf>,
    pub params: Bm25Params,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            index_cache_path: PathBuf::from("data/bm25.bin"),
            batch_cache_path: Some(PathBuf::from("data/bm25_batch.bin")),
            params: Bm25Params::default(),
        }
    }
}

/// Single-query result, parallel lists in rank order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub scores: Vec<f32>,
    pub ordinals: Vec<DocOrdinal>,
    pub passages: Vec<String>,
}

/// One question of an evaluation or inference dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub question: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<serde_json::Value>,
}

impl QueryRecord {
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Vec<QueryRecord>> {
        let f = File::open(path.as_ref())?;
        Ok(serde_json::from_reader(BufReader::new(f))?)
    }
}

/// What the reader stage consumes for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedRecord {
    pub question: String,
    pub id: String,
    pub context_id: Vec<DocOrdinal>,
    /// Retrieved passages joined by a single space.
    pub context: String,
    /// Ground truth, copied only when the input carried both context and answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<serde_json::Value>,
}

/// BM25+ retrieval over a fixed corpus.
///
/// Starts without an index; [`prepare`](Retriever::prepare) loads or builds it, after
/// which retrieval calls are stateless reads and may run from many threads.
pub struct Retriever<T: Tokenizer> {
    corpus: Corpus,
    tokenizer: T,
    config: RetrieverConfig,
    index: RwLock<Option<Arc<TermStatsIndex>>>,
}

impl<T: Tokenizer> Retriever<T> {
    pub fn new(corpus: Corpus, tokenizer: T, config: RetrieverConfig) -> Self {
        Self { corpus, tokenizer, config, index: RwLock::new(None) }
    }

    /// Load the index from its cache or build it. Calling it again is a no-op.
    pub fn prepare(&self) -> Result<()> {
        let mut slot = self.index.write();
        if slot.is_none() {
            let index = load_or_build(&self.config.index_cache_path, &self.corpus, &self.tokenizer)?;
            *slot = Some(Arc::new(index));
        }
        Ok(())
    }

    pub fn is_ready(&self) -> bool { self.index.read().is_some() }

    pub fn index(&self) -> Result<Arc<TermStatsIndex>> {
        self.index.read().clone().ok_or(RetrievalError::NotReady)
    }

    pub fn corpus(&self) -> &Corpus { &self.corpus }

    pub fn config(&self) -> &RetrieverConfig { &self.config }

    fn passage(&self, ordinal: DocOrdinal) -> String {
        self.corpus.text(ordinal).unwrap_or_default().to_string()
    }

    /// Top-k passages for one query. Never cached.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<SearchResult> {
        let index = self.index()?;
        let tokens = self.tokenizer.tokenize(query);
        let scores = score(&index, &tokens, &self.config.params);
        let hits = top_k(scores.as_slice(), k)?;
        Ok(SearchResult {
            scores: hits.iter().map(|h| h.score).collect(),
            ordinals: hits.iter().map(|h| h.ordinal).collect(),
            passages: hits.iter().map(|h| self.passage(h.ordinal)).collect(),
        })
    }

    /// Top-k passages for every record, using the batch cache when one is configured.
    pub fn retrieve_batch(&self, records: &[QueryRecord], k: usize) -> Result<Vec<RetrievedRecord>> {
        let index = self.index()?;
        if records.is_empty() {
            return Err(RetrievalError::invalid_argument("query batch is empty"));
        }
        let questions: Vec<String> = records.iter().map(|r| r.question.clone()).collect();
        let params = &self.config.params;
        let batch = match &self.config.batch_cache_path {
            Some(path) => load_or_score_batch(path, &index, &self.tokenizer, &questions, k, params)?,
            None => score_batch(&index, &self.tokenizer, &questions, k, params)?,
        };
        if batch.hits.len() != records.len() {
            return Err(RetrievalError::invalid_argument(format!(
                "cached batch holds {} queries but {} were requested",
                batch.hits.len(),
                records.len()
            )));
        }

        let out = records
            .iter()
            .zip(batch.hits)
            .map(|(record, hits)| {
                let context_id: Vec<DocOrdinal> = hits.iter().map(|h| h.ordinal).collect();
                let context = context_id.iter().map(|&o| self.passage(o)).collect::<Vec<_>>().join(" ");
                let (original_context, answers) = match (&record.context, &record.answers) {
                    (Some(c), Some(a)) => (Some(c.clone()), Some(a.clone())),
                    _ => (None, None),
                };
                RetrievedRecord {
                    question: record.question.clone(),
                    id: record.id.clone(),
                    context_id,
                    context,
                    original_context,
                    answers,
                }
            })
            .collect();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::WhitespaceTokenizer;
    use tempfile::tempdir;

    fn retriever(dir: &Path, batch_cache: bool) -> Retriever<WhitespaceTokenizer> {
        let corpus = Corpus::from_documents(vec![
            (1u64, "A ", "the cat sat"),
            (2u64, "B ", "the dog ran"),
        ]);
        let config = RetrieverConfig {
            index_cache_path: dir.join("bm25.bin"),
            batch_cache_path: batch_cache.then(|| dir.join("bm25_batch.bin")),
            params: Bm25Params::default(),
        };
        Retriever::new(corpus, WhitespaceTokenizer, config)
    }

    fn record(q: &str, truth: bool) -> QueryRecord {
        QueryRecord {
            question: q.into(),
            id: format!("q-{q}"),
            context: truth.then(|| "gold".to_string()),
            answers: truth.then(|| serde_json::json!({"text": ["cat"]})),
        }
    }

    #[test]
    fn retrieve_before_prepare_is_not_ready() {
        let dir = tempdir().unwrap();
        let r = retriever(dir.path(), false);
        assert!(matches!(r.retrieve("cat", 1), Err(RetrievalError::NotReady)));
        assert!(matches!(r.retrieve_batch(&[record("cat", false)], 1), Err(RetrievalError::NotReady)));
    }

    #[test]
    fn single_query_returns_passages() {
        let dir = tempdir().unwrap();
        let r = retriever(dir.path(), false);
        r.prepare().unwrap();
        r.prepare().unwrap();
        let res = r.retrieve("cat", 1).unwrap();
        assert_eq!(res.ordinals, vec![0]);
        assert_eq!(res.passages, vec!["the cat sat".to_string()]);
        assert!(res.scores[0] > 0.0);
        assert!(matches!(r.retrieve("cat", 0), Err(RetrievalError::InvalidArgument(_))));
    }

    #[test]
    fn batch_passes_ground_truth_through() {
        let dir = tempdir().unwrap();
        let r = retriever(dir.path(), true);
        r.prepare().unwrap();
        let out = r.retrieve_batch(&[record("dog", true), record("cat", false)], 2).unwrap();
        assert_eq!(out[0].context_id, vec![1, 0]);
        assert_eq!(out[0].context, "the dog ran the cat sat");
        assert_eq!(out[0].original_context.as_deref(), Some("gold"));
        assert!(out[0].answers.is_some());
        assert!(out[1].original_context.is_none() && out[1].answers.is_none());
        assert!(dir.path().join("bm25_batch.bin").exists());
    }

    #[test]
    fn cached_batch_of_other_size_is_rejected() {
        let dir = tempdir().unwrap();
        let r = retriever(dir.path(), true);
        r.prepare().unwrap();
        let first = r.retrieve_batch(&[record("cat", false), record("dog", false)], 1).unwrap();
        assert_eq!(first.len(), 2);

        let err = r
            .retrieve_batch(&[record("cat", false), record("dog", false), record("ran", false)], 1)
            .unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidArgument(msg) if msg.contains("holds 2 queries")));
    }

    #[test]
    fn cached_batch_is_reused_for_same_size_batch() {
        let dir = tempdir().unwrap();
        let r = retriever(dir.path(), true);
        r.prepare().unwrap();
        let first = r.retrieve_batch(&[record("cat", false)], 1).unwrap();
        // different question and k: the cache at the configured path wins
        let second = r.retrieve_batch(&[record("dog", false)], 2).unwrap();
        assert_eq!(second[0].context_id, first[0].context_id);
        assert_eq!(second[0].question, "dog");
    }

    #[test]
    fn empty_batch_is_invalid() {
        let dir = tempdir().unwrap();
        let r = retriever(dir.path(), false);
        r.prepare().unwrap();
        assert!(matches!(r.retrieve_batch(&[], 1), Err(RetrievalError::InvalidArgument(_))));
    }
}
