use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

/// Turns raw text into an ordered sequence of terms.
///
/// The same tokenizer must be used to build an index and to query it; the
/// [`name`](Tokenizer::name) is stored in the index cache so a mismatch can be logged.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;

    fn name(&self) -> &str { "custom" }
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn tokenize(&self, text: &str) -> Vec<String> { self(text) }
}

impl Tokenizer for Box<dyn Tokenizer> {
    fn tokenize(&self, text: &str) -> Vec<String> { (**self).tokenize(text) }
    fn name(&self) -> &str { (**self).name() }
}

/// Lowercase, then split on Unicode whitespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(|w| w.to_lowercase()).collect()
    }

    fn name(&self) -> &str { "whitespace" }
}

/// Compatibility folding, accent stripping, lowercase, stopword removal and English stemming.
#[derive(Debug, Default, Clone, Copy)]
pub struct StemmingTokenizer;

impl Tokenizer for StemmingTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> { tokenize(text) }

    fn name(&self) -> &str { "stem-en" }
}

/// Look up a built-in tokenizer by its [`Tokenizer::name`].
pub fn by_name(name: &str) -> Option<Box<dyn Tokenizer>> {
    match name {
        "whitespace" => Some(Box::new(WhitespaceTokenizer)),
        "stem-en" => Some(Box::new(StemmingTokenizer)),
        _ => None,
    }
}

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// NFKD, drop combining marks, recompose: `ﬁ` becomes `fi` and `café` becomes `cafe`.
fn fold(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// Tokenize text using compatibility folding, accent stripping, lowercase, stopword removal, and stemming.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = fold(text).to_lowercase();
    RE.find_iter(&normalized)
        .map(|m| m.as_str())
        .filter(|token| !is_stopword(token))
        .map(|token| STEMMER.stem(token).into_owned())
        .collect()
}
