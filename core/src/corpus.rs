use crate::error::Result;
use crate::DocOrdinal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Opaque external identifier of a document; corpora use either integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Num(u64),
    Text(String),
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Num(n) => write!(f, "{n}"),
            DocumentId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for DocumentId {
    fn from(n: u64) -> Self { DocumentId::Num(n) }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self { DocumentId::Text(s.to_string()) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub text: String,
    pub ordinal: DocOrdinal,
}

/// Record shape of the corpus JSON; extra fields are ignored.
#[derive(Debug, Deserialize)]
struct InputDoc {
    document_id: DocumentId,
    #[serde(default)]
    title: String,
    text: String,
}

/// Immutable, ordered, deduplicated collection of documents.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    docs: Vec<Document>,
}

impl Corpus {
    /// Build a corpus from `(id, title, text)` triples. Documents whose text was already
    /// seen are dropped (first occurrence wins) and ordinals follow input order.
    pub fn from_documents<I, D, T, X>(docs: I) -> Self
    where
        I: IntoIterator<Item = (D, T, X)>,
        D: Into<DocumentId>,
        T: Into<String>,
        X: Into<String>,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        for (id, title, text) in docs {
            let text = text.into();
            if !seen.insert(text.clone()) { continue; }
            out.push(Document { id: id.into(), title: title.into(), text, ordinal: out.len() as DocOrdinal });
        }
        Corpus { docs: out }
    }

    /// Load a JSON object `{key: {document_id, title, text, ..}}`, keeping file order.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(path.as_ref())?;
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_reader(BufReader::new(f))?;
        let total = raw.len();
        let mut docs = Vec::with_capacity(total);
        for (_key, value) in raw {
            let doc: InputDoc = serde_json::from_value(value)?;
            docs.push((doc.document_id, doc.title, doc.text));
        }
        let corpus = Self::from_documents(docs);
        tracing::info!(path = %path.as_ref().display(), total, unique = corpus.len(), "loaded corpus");
        Ok(corpus)
    }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn get(&self, ordinal: DocOrdinal) -> Option<&Document> { self.docs.get(ordinal as usize) }

    pub fn iter(&self) -> impl Iterator<Item = &Document> { self.docs.iter() }

    pub fn text(&self, ordinal: DocOrdinal) -> Option<&str> { self.get(ordinal).map(|d| d.text.as_str()) }
}
