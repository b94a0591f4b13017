use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use retrieval_core::tokenizer::by_name;
use retrieval_core::{load_or_build, Corpus, QueryRecord, Retriever, RetrieverConfig, Tokenizer};
use tracing_subscriber::{EnvFilter, fmt};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a BM25+ index and run sparse retrieval over a passage corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct IndexArgs {
    /// Corpus JSON: {key: {document_id, title, text}}
    #[arg(long, default_value = "data/wikipedia_documents.json")]
    corpus: PathBuf,
    /// Index cache file
    #[arg(long, default_value = "data/bm25.bin")]
    index: PathBuf,
    /// Tokenizer name: "stem-en" or "whitespace"
    #[arg(long, default_value = "stem-en")]
    tokenizer: String,
}

impl IndexArgs {
    fn tokenizer(&self) -> Result<Box<dyn Tokenizer>> {
        by_name(&self.tokenizer).ok_or_else(|| anyhow!("unknown tokenizer {:?}", self.tokenizer))
    }

    fn retriever(&self, batch_cache: Option<PathBuf>) -> Result<Retriever<Box<dyn Tokenizer>>> {
        let corpus = Corpus::load_json(&self.corpus).with_context(|| format!("loading corpus {:?}", self.corpus))?;
        let config = RetrieverConfig { index_cache_path: self.index.clone(), batch_cache_path: batch_cache, ..Default::default() };
        let retriever = Retriever::new(corpus, self.tokenizer()?, config);
        retriever.prepare()?;
        Ok(retriever)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load the index cache, building and saving it if absent
    Build {
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Retrieve the top-k passages for a single query
    Query {
        #[command(flatten)]
        index: IndexArgs,
        #[arg(long)]
        q: String,
        #[arg(long, default_value_t = 1)]
        k: usize,
    },
    /// Retrieve passages for every question of a JSON dataset
    Batch {
        #[command(flatten)]
        index: IndexArgs,
        /// JSON array of {question, id, context?, answers?}
        #[arg(long)]
        queries: PathBuf,
        #[arg(long, default_value_t = 1)]
        k: usize,
        /// Batch result cache; omit to always rescore
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Where to write the retrieved records (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { index } => build_index(&index),
        Commands::Query { index, q, k } => run_query(&index, &q, k),
        Commands::Batch { index, queries, k, cache, output } => run_batch(&index, &queries, k, cache, output),
    }
}

fn build_index(args: &IndexArgs) -> Result<()> {
    let corpus = Corpus::load_json(&args.corpus).with_context(|| format!("loading corpus {:?}", args.corpus))?;
    let index = load_or_build(&args.index, &corpus, &args.tokenizer()?)?;
    tracing::info!(num_docs = index.num_docs, num_terms = index.num_terms(), path = %args.index.display(), "index ready");
    Ok(())
}

fn run_query(args: &IndexArgs, q: &str, k: usize) -> Result<()> {
    let retriever = args.retriever(None)?;
    let result = retriever.retrieve(q, k)?;
    println!("[Search query]\n{q}\n");
    for (rank, (score, passage)) in result.scores.iter().zip(&result.passages).enumerate() {
        println!("Top-{} passage with score {score:.4}", rank + 1);
        println!("{passage}");
    }
    Ok(())
}

fn run_batch(args: &IndexArgs, queries: &Path, k: usize, cache: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let records = QueryRecord::load_json(queries).with_context(|| format!("loading queries {queries:?}"))?;
    let retriever = args.retriever(cache)?;
    let retrieved = retriever.retrieve_batch(&records, k)?;

    let mut out: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };
    serde_json::to_writer_pretty(&mut out, &retrieved)?;
    writeln!(out)?;
    out.flush()?;
    tracing::info!(records = retrieved.len(), k, "batch retrieval complete");
    Ok(())
}
