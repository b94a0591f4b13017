//! On-disk caches.
//!
//! Every cache file is a single blob:
//!
//! ```text
//! [magic: 4 bytes][version: u32 LE][payload len: u64 LE][bincode payload][crc32(payload): u32 LE]
//! ```
//!
//! Writes go to a sibling `.tmp` file which is fsynced and renamed into place, so a
//! reader never observes a half-written cache. Anything that fails to decode is
//! reported as [`RetrievalError::CacheCorrupt`]; callers decide whether to rebuild.

use crate::corpus::Corpus;
use crate::error::{Result, RetrievalError};
use crate::index::TermStatsIndex;
use crate::tokenizer::Tokenizer;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 16;
const FOOTER_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Index,
    QueryBatch,
}

impl BlobKind {
    fn magic(self) -> &'static [u8; 4] {
        match self {
            BlobKind::Index => b"BMPI",
            BlobKind::QueryBatch => b"BMPQ",
        }
    }
}

pub fn encode_blob<T: Serialize>(kind: BlobKind, value: &T) -> Result<Vec<u8>> {
    let payload = bincode::serialize(value).map_err(|e| RetrievalError::Encode(e.to_string()))?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + FOOTER_LEN);
    out.extend_from_slice(kind.magic());
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    Ok(out)
}

pub fn decode_blob<T: DeserializeOwned>(kind: BlobKind, bytes: &[u8], path: &Path) -> Result<T> {
    if bytes.len() < HEADER_LEN + FOOTER_LEN {
        return Err(RetrievalError::corrupt(path, format!("file too short ({} bytes)", bytes.len())));
    }
    if &bytes[0..4] != kind.magic() {
        return Err(RetrievalError::corrupt(path, "bad magic"));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(RetrievalError::corrupt(path, format!("unsupported format version {version}")));
    }
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[8..16]);
    let len = u64::from_le_bytes(len_bytes);
    if len != (bytes.len() - HEADER_LEN - FOOTER_LEN) as u64 {
        return Err(RetrievalError::corrupt(
            path,
            format!("payload length {len} does not match file size {}", bytes.len()),
        ));
    }
    let payload = &bytes[HEADER_LEN..bytes.len() - FOOTER_LEN];
    let footer = &bytes[bytes.len() - FOOTER_LEN..];
    let stored = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
    let computed = crc32fast::hash(payload);
    if stored != computed {
        return Err(RetrievalError::corrupt(
            path,
            format!("CRC32 mismatch: expected {stored:#010x}, got {computed:#010x}"),
        ));
    }
    bincode::deserialize(payload).map_err(|e| RetrievalError::corrupt(path, e))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to `path` via temp file + rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = tmp_path(path);
    let written = File::create(&tmp)
        .and_then(|mut f| {
            f.write_all(bytes)?;
            f.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

pub fn save_blob<T: Serialize>(path: &Path, kind: BlobKind, value: &T) -> Result<()> {
    let bytes = encode_blob(kind, value)?;
    write_atomic(path, &bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "saved cache");
    Ok(())
}

/// `Ok(None)` when no file exists at `path`.
pub fn load_blob<T: DeserializeOwned>(path: &Path, kind: BlobKind) -> Result<Option<T>> {
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    decode_blob(kind, &bytes, path).map(Some)
}

#[derive(Deserialize)]
struct CachedIndex {
    tokenizer: String,
    index: TermStatsIndex,
}

// same field layout as CachedIndex
#[derive(Serialize)]
struct CachedIndexRef<'a> {
    tokenizer: &'a str,
    index: &'a TermStatsIndex,
}

pub fn save_index(path: &Path, tokenizer: &str, index: &TermStatsIndex) -> Result<()> {
    save_blob(path, BlobKind::Index, &CachedIndexRef { tokenizer, index })
}

/// Returns the cached index and the name of the tokenizer it was built with.
pub fn load_index(path: &Path) -> Result<Option<(String, TermStatsIndex)>> {
    Ok(load_blob::<CachedIndex>(path, BlobKind::Index)?.map(|c| (c.tokenizer, c.index)))
}

/// Load the index cached at `path`, or build it from `corpus` and cache it.
///
/// A cache hit never touches the corpus. A corrupt cache is an error, not a rebuild.
pub fn load_or_build<T: Tokenizer + ?Sized>(path: &Path, corpus: &Corpus, tokenizer: &T) -> Result<TermStatsIndex> {
    if let Some((built_with, index)) = load_index(path)? {
        if built_with != tokenizer.name() {
            tracing::warn!(path = %path.display(), cached = %built_with, current = %tokenizer.name(), "index cache was built with a different tokenizer");
        }
        tracing::info!(path = %path.display(), num_docs = index.num_docs, "loaded index cache");
        return Ok(index);
    }
    tracing::info!(path = %path.display(), "no index cache, building");
    let index = TermStatsIndex::build(corpus, tokenizer)?;
    save_index(path, tokenizer.name(), &index)?;
    Ok(index)
}
