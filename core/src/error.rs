use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by index construction, caching and retrieval.
///
/// A query whose terms are all out of vocabulary is not an error: it yields an
/// all-zero [`crate::ScoreVector`].
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,

    #[error("index not ready: build or load the index before retrieving")]
    NotReady,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("corrupt cache file {path:?}: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("failed to encode cache: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RetrievalError {
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        RetrievalError::InvalidArgument(msg.into())
    }

    pub(crate) fn corrupt<P: Into<PathBuf>, S: ToString>(path: P, reason: S) -> Self {
        RetrievalError::CacheCorrupt { path: path.into(), reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
