//! park-rag CLI: offline ingestion and one-shot questions

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use park_rag::config::RagConfig;
use park_rag::ingestion::IngestPipeline;
use park_rag::providers::{EmbeddingProvider, OllamaEmbedder};
use park_rag::storage::ChunkStore;
use park_rag::RagEngine;

#[derive(Parser)]
#[command(name = "park-rag", about = "Question answering over a themed-park knowledge base")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest new text files from a source directory into the index
    Sync {
        /// Directory of extracted plain-text documents
        #[arg(short, long)]
        source_dir: PathBuf,
    },
    /// Ask a single question against the index
    Ask {
        /// The question
        question: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RagConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RagConfig::default(),
    };

    match cli.command {
        Command::Sync { source_dir } => {
            let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
                OllamaEmbedder::connect(&config.llm, &config.embeddings)
                    .await
                    .context("embedding provider failed to start")?,
            );
            let store = Arc::new(
                ChunkStore::create(&config.index.path, embedder.dimensions())
                    .context("failed to open the chunk store")?,
            );
            let pipeline = IngestPipeline::new(
                store,
                embedder,
                &config.chunking,
                config.embeddings.batch_size,
            )
            .context("invalid chunking configuration")?;
            let summary = pipeline
                .sync(&source_dir)
                .await
                .context("ingestion failed")?;
            println!(
                "{} files seen, {} ingested ({} chunks), {} skipped empty",
                summary.files_seen,
                summary.files_new,
                summary.chunks_added,
                summary.files_skipped_empty
            );
        }
        Command::Ask { question } => {
            let engine = RagEngine::new(&config)
                .await
                .context("failed to start the query pipeline")?;
            let answer = engine.ask(&question).await?;
            println!("{}", answer.text);
            if !answer.sources.is_empty() {
                println!();
                println!("参考来源:");
                for source in &answer.sources {
                    println!("- {}", source);
                }
            }
        }
    }

    Ok(())
}
