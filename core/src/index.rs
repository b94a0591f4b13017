use crate::corpus::Corpus;
use crate::error::{Result, RetrievalError};
use crate::tokenizer::Tokenizer;
use crate::{DocOrdinal, TermId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc: DocOrdinal,
    /// Occurrences of the term in `doc`.
    pub tf: u32,
}

/// Corpus-wide term statistics, built once and read-only afterwards.
///
/// Per-document term frequencies are kept in their inverted form: `postings[term]`
/// lists every document containing the term, sorted by ordinal, so scoring only
/// visits matching documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermStatsIndex {
    pub dictionary: BTreeMap<String, TermId>,
    pub df: Vec<u32>,
    pub postings: Vec<Vec<Posting>>,
    pub doc_lengths: Vec<u32>,
    pub avg_doc_length: f32,
    pub num_docs: u32,
}

impl TermStatsIndex {
    /// Tokenize `title ++ text` of every document and accumulate statistics.
    pub fn build<T: Tokenizer + ?Sized>(corpus: &Corpus, tokenizer: &T) -> Result<Self> {
        if corpus.is_empty() {
            return Err(RetrievalError::EmptyCorpus);
        }
        let start = Instant::now();
        let mut index = TermStatsIndex { doc_lengths: Vec::with_capacity(corpus.len()), ..Default::default() };
        let mut total_length: u64 = 0;

        for doc in corpus.iter() {
            let tokens = tokenizer.tokenize(&format!("{}{}", doc.title, doc.text));
            let mut tf_counts: HashMap<TermId, u32> = HashMap::new();
            for term in tokens.iter() {
                let tid = index.intern(term);
                *tf_counts.entry(tid).or_insert(0) += 1;
            }
            // each key of tf_counts is a term seen in this doc, so df is bumped once per doc
            let mut terms: Vec<(TermId, u32)> = tf_counts.into_iter().collect();
            terms.sort_unstable_by_key(|(tid, _)| *tid);
            for (tid, tf) in terms {
                index.df[tid as usize] += 1;
                index.postings[tid as usize].push(Posting { doc: doc.ordinal, tf });
            }
            index.doc_lengths.push(tokens.len() as u32);
            total_length += tokens.len() as u64;
        }

        index.num_docs = corpus.len() as u32;
        index.avg_doc_length = (total_length as f64 / index.num_docs as f64) as f32;
        tracing::info!(
            num_docs = index.num_docs,
            num_terms = index.num_terms(),
            avg_doc_length = index.avg_doc_length,
            took_s = start.elapsed().as_secs_f64(),
            "built term statistics"
        );
        Ok(index)
    }

    fn intern(&mut self, term: &str) -> TermId {
        if let Some(&tid) = self.dictionary.get(term) {
            return tid;
        }
        let tid = self.df.len() as TermId;
        self.dictionary.insert(term.to_string(), tid);
        self.df.push(0);
        self.postings.push(Vec::new());
        tid
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> { self.dictionary.get(term).copied() }

    pub fn num_terms(&self) -> usize { self.dictionary.len() }

    /// Number of documents containing `term`; zero when out of vocabulary.
    pub fn doc_freq(&self, term: &str) -> u32 {
        self.term_id(term).map(|tid| self.df[tid as usize]).unwrap_or(0)
    }

    pub fn postings(&self, term: &str) -> &[Posting] {
        match self.term_id(term) {
            Some(tid) => &self.postings[tid as usize],
            None => &[],
        }
    }

    /// Occurrences of `term` in document `doc`.
    pub fn term_freq(&self, doc: DocOrdinal, term: &str) -> u32 {
        let plist = self.postings(term);
        plist
            .binary_search_by_key(&doc, |p| p.doc)
            .map(|i| plist[i].tf)
            .unwrap_or(0)
    }

    pub fn doc_length(&self, doc: DocOrdinal) -> Option<u32> { self.doc_lengths.get(doc as usize).copied() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::WhitespaceTokenizer;

    fn corpus() -> Corpus {
        Corpus::from_documents(vec![
            (1u64, "A ", "the cat sat"),
            (2u64, "B ", "the dog ran the race"),
        ])
    }

    #[test]
    fn empty_corpus_is_rejected() {
        let err = TermStatsIndex::build(&Corpus::default(), &WhitespaceTokenizer).unwrap_err();
        assert!(matches!(err, RetrievalError::EmptyCorpus));
    }

    #[test]
    fn counts_frequencies_and_lengths() {
        let idx = TermStatsIndex::build(&corpus(), &WhitespaceTokenizer).unwrap();
        assert_eq!(idx.num_docs, 2);
        assert_eq!(idx.doc_lengths, vec![4, 6]);
        assert_eq!(idx.avg_doc_length, 5.0);
        assert_eq!(idx.term_freq(1, "the"), 2);
        assert_eq!(idx.term_freq(0, "the"), 1);
        assert_eq!(idx.term_freq(0, "dog"), 0);
    }

    #[test]
    fn doc_freq_counts_each_doc_once() {
        let idx = TermStatsIndex::build(&corpus(), &WhitespaceTokenizer).unwrap();
        assert_eq!(idx.doc_freq("the"), 2);
        assert_eq!(idx.doc_freq("race"), 1);
        assert_eq!(idx.doc_freq("unicorn"), 0);
        assert!(idx.postings("unicorn").is_empty());
    }

    #[test]
    fn title_is_prepended_to_text() {
        let c = Corpus::from_documents(vec![(1u64, "Title", "body")]);
        let idx = TermStatsIndex::build(&c, &WhitespaceTokenizer).unwrap();
        assert_eq!(idx.doc_freq("titlebody"), 1);
        assert_eq!(idx.doc_lengths, vec![1]);
    }

    #[test]
    fn build_is_deterministic() {
        let a = TermStatsIndex::build(&corpus(), &WhitespaceTokenizer).unwrap();
        let b = TermStatsIndex::build(&corpus(), &WhitespaceTokenizer).unwrap();
        assert_eq!(a, b);
        assert_eq!(bincode::serialize(&a).unwrap(), bincode::serialize(&b).unwrap());
    }

    #[test]
    fn postings_are_sorted_by_ordinal() {
        let idx = TermStatsIndex::build(&corpus(), &WhitespaceTokenizer).unwrap();
        let docs: Vec<DocOrdinal> = idx.postings("the").iter().map(|p| p.doc).collect();
        assert_eq!(docs, vec![0, 1]);
    }
}
