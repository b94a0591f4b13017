use criterion::{criterion_group, criterion_main, Criterion};
use retrieval_core::{score, top_k, Bm25Params, Corpus, TermStatsIndex, Tokenizer, WhitespaceTokenizer};

fn synthetic_corpus(n: usize) -> Corpus {
    let words = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa"];
    Corpus::from_documents((0..n).map(|i| {
        let text: Vec<&str> = (0..40).map(|j| words[(i * 7 + j * 3 + j / 5) % words.len()]).collect();
        (i as u64, format!("doc{i} "), format!("{} {i}", text.join(" ")))
    }))
}

fn bench_scoring(c: &mut Criterion) {
    let corpus = synthetic_corpus(5_000);
    c.bench_function("build_5k", |b| b.iter(|| TermStatsIndex::build(&corpus, &WhitespaceTokenizer).unwrap()));

    let index = TermStatsIndex::build(&corpus, &WhitespaceTokenizer).unwrap();
    let query = WhitespaceTokenizer.tokenize("gamma theta kappa 42");
    let params = Bm25Params::default();
    c.bench_function("score_top10_5k", |b| {
        b.iter(|| top_k(score(&index, &query, &params).as_slice(), 10).unwrap())
    });
}

criterion_group!(benches, bench_scoring);
criterion_main!(benches);
