use anyhow::{Context, Result};
use clap::Parser;
use pdfqa::config::{self, Config};
use pdfqa::embedder::gemini::GeminiEmbedder;
use pdfqa::llm::gemini::GeminiChat;
use pdfqa::pipeline::RagPipeline;
use pdfqa::web::server::{WebContext, WebServer};
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdfqa", version, about = "Ask questions about a PDF")]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, default_value = "config.json")]
    config: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    config::load_dotenv();

    info!("Starting pdfqa...");

    // 1. Load config
    let config = Config::load(&cli.config)?;
    config.validate().context("invalid configuration")?;
    let api_key = config::api_key_from_env()?;

    // 2. Init providers. The blocking HTTP clients are built (and later
    // dropped) outside the async runtime.
    let embedder = GeminiEmbedder::new(&config.api_base_url, &config.embedding, api_key.clone())
        .context("failed to create embedding client")?;
    let chat = GeminiChat::new(&config.api_base_url, &config.chat, api_key)
        .context("failed to create chat client")?;

    // 3. Load, split and index the document
    let pipeline = RagPipeline::build(&config, Box::new(embedder), Box::new(chat))
        .with_context(|| format!("failed to index {}", config.pdf_path))?;
    let chunk_count = pipeline.chunk_count();
    info!(
        "Ready: {chunk_count} chunks from {}, model {}, top {}",
        config.pdf_path,
        pipeline.model(),
        pipeline.top_k()
    );
    let pipeline = Arc::new(TokioMutex::new(pipeline));

    // 4. Serve
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let server = WebServer::new(WebContext::new(pipeline.clone(), chunk_count));
    let served = runtime.block_on(server.start(&config.server.bind));

    drop(runtime);
    drop(pipeline);
    served
}
