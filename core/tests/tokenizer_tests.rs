use retrieval_core::tokenizer::{tokenize, StemmingTokenizer, Tokenizer, WhitespaceTokenizer};

#[test]
fn it_normalizes_and_stems() {
    let words = tokenize("Running Runners RUN! The café's menu.");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // Unicode normalization: café -> cafe
    assert!(words.contains(&"cafe".to_string()));
}

#[test]
fn it_filters_stopwords() {
    let words = tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
}

#[test]
fn boxed_tokenizers_keep_their_name() {
    let tokenizers: Vec<Box<dyn Tokenizer>> = vec![Box::new(WhitespaceTokenizer), Box::new(StemmingTokenizer)];
    let names: Vec<&str> = tokenizers.iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["whitespace", "stem-en"]);
}

#[test]
fn empty_text_yields_no_tokens() {
    assert!(tokenize("").is_empty());
    assert!(WhitespaceTokenizer.tokenize("   ").is_empty());
}
