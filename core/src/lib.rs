//! Sparse lexical retrieval over an immutable passage corpus.
//!
//! The corpus is tokenized once into a [`TermStatsIndex`], queries are ranked with
//! BM25+ and the top-k passages are handed to a downstream reader. Both the built
//! index and batch results can be cached on disk, see [`persist`] and [`batch`].

pub mod batch;
pub mod corpus;
pub mod error;
pub mod index;
pub mod persist;
pub mod retriever;
pub mod scorer;
pub mod tokenizer;
pub mod topk;

pub use batch::{load_or_score_batch, score_batch, BatchResult};
pub use corpus::{Corpus, Document, DocumentId};
pub use error::{Result, RetrievalError};
pub use index::{Posting, TermStatsIndex};
pub use persist::load_or_build;
pub use retriever::{QueryRecord, RetrievedRecord, Retriever, RetrieverConfig, SearchResult};
pub use scorer::{score, Bm25Params, ScoreVector};
pub use tokenizer::{StemmingTokenizer, Tokenizer, WhitespaceTokenizer};
pub use topk::{top_k, ScoredDoc};

pub type TermId = u32;
/// Position of a document in the corpus array.
pub type DocOrdinal = u32;
