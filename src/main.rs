mod banner;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use cg_core::{AnswerMode, AnswerRequest, RAGEngine, RagConfig, VectorIndex};
use cg_providers::{ProviderConfig, build_embedder, build_generator};
use cg_rag::{CareerRagEngine, FlatIndex, prepare_index, reingest};
use cg_store::{StoreConfig, open_stores};
use cg_web::{AppState, ServerConfig};

use banner::{ComponentStatus, display_banner};

#[derive(Parser)]
#[command(name = "career-guide")]
#[command(about = "Career guidance chat service with retrieval-augmented answers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API (default)
    Serve {
        /// Address to listen on, overrides BIND_ADDRESS
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Build the knowledge-base index from the configured document
    Ingest {
        /// Rebuild even when a matching index already exists
        #[arg(long)]
        force: bool,
    },
    /// Ask a single question and print the answer
    Ask { question: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let providers = ProviderConfig::from_env();
    let rag_config = RagConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => serve(providers, rag_config, bind).await,
        Commands::Ingest { force } => ingest(providers, rag_config, force).await,
        Commands::Ask { question } => ask(providers, rag_config, &question).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,career_guide=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Build the engine with whatever providers and index are available
async fn build_engine(
    providers: &ProviderConfig,
    rag_config: RagConfig,
) -> (CareerRagEngine, String) {
    let generator = build_generator(providers);
    let embedder = build_embedder(providers);

    let (index, source) = prepare_index(&rag_config, embedder.as_deref()).await;
    let engine = CareerRagEngine::new(Arc::new(index), rag_config)
        .with_generator(generator)
        .with_embedder(embedder);

    (engine, source.describe())
}

async fn serve(
    providers: ProviderConfig,
    rag_config: RagConfig,
    bind: Option<String>,
) -> Result<()> {
    let mut server_config = ServerConfig::from_env();
    if let Some(bind) = bind {
        server_config = server_config.with_bind_address(bind);
    }
    let addr = server_config.socket_addr()?;

    let history_window = rag_config.history_window;
    let (engine, index_status) = build_engine(&providers, rag_config).await;
    let stores = open_stores(&StoreConfig::from_env());

    let stats = engine.stats();
    let bind = addr.to_string();
    display_banner(&ComponentStatus {
        stats: &stats,
        store: stores.backend_name(),
        index: &index_status,
        bind: Some(&bind),
    });

    let state = AppState::new(Arc::new(engine), stores, history_window)
        .with_index_status(index_status);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    cg_web::serve(listener, state, shutdown_signal()).await?;
    println!("{}", "👋 Goodbye!".green());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn ingest(providers: ProviderConfig, rag_config: RagConfig, force: bool) -> Result<()> {
    let Some(embedder) = build_embedder(&providers) else {
        bail!("no embedding provider available; set GOOGLE_API_KEY or EMBEDDING_PROVIDER=hashing");
    };

    if !force {
        if let Ok(index) = FlatIndex::open(&rag_config.index_dir) {
            if index.embedding_model() == Some(embedder.model_id()) && !index.is_empty() {
                println!(
                    "{} Index at {} is up to date ({} chunks), use --force to rebuild",
                    "✅".green(),
                    rag_config.index_dir.display(),
                    index.len()
                );
                return Ok(());
            }
        }
    }

    println!("{} Indexing {}...", "📚".blue(), rag_config.document_path.display());
    let (_, result) = reingest(&rag_config, &*embedder)
        .await
        .context("failed to build knowledge base index")?;

    println!(
        "{} Indexed {} chunks ({} characters) with {}",
        "✅".green(),
        result.chunks_indexed,
        result.characters,
        result.embedding_model.bold()
    );
    Ok(())
}

async fn ask(providers: ProviderConfig, rag_config: RagConfig, question: &str) -> Result<()> {
    let (engine, _) = build_engine(&providers, rag_config).await;

    println!("{} Thinking...", "🤖".blue());
    let answer = engine.answer(AnswerRequest::new(question, "cli")).await;

    match answer.mode {
        AnswerMode::Grounded => println!("{} {} sources", "📖".cyan(), answer.used_context.len()),
        AnswerMode::Ungrounded => println!("{}", "⚠️  No knowledge base context available".yellow()),
        AnswerMode::Degraded => {}
    }
    println!("{}", answer.response_text);
    Ok(())
}
