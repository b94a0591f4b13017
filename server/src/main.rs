use anyhow::{anyhow, Context, Result};
use axum::Router;
use clap::Parser;
use retrieval_core::tokenizer::by_name;
use retrieval_core::{Corpus, Retriever, RetrieverConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};
use server::build_app;
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Corpus JSON: {key: {document_id, title, text}}
    #[arg(long, default_value = "data/wikipedia_documents.json")]
    corpus: PathBuf,
    /// Index cache file, built on first start
    #[arg(long, default_value = "data/bm25.bin")]
    index: PathBuf,
    /// Tokenizer name: "stem-en" or "whitespace"
    #[arg(long, default_value = "stem-en")]
    tokenizer: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let tokenizer = by_name(&args.tokenizer).ok_or_else(|| anyhow!("unknown tokenizer {:?}", args.tokenizer))?;
    let corpus = Corpus::load_json(&args.corpus).with_context(|| format!("loading corpus {:?}", args.corpus))?;
    let config = RetrieverConfig { index_cache_path: args.index.clone(), batch_cache_path: None, ..Default::default() };
    let retriever = Arc::new(Retriever::new(corpus, tokenizer, config));
    let ready = retriever.clone();
    tokio::task::spawn_blocking(move || ready.prepare()).await??;

    let app: Router = build_app(retriever);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
