//! marksearch server entry point

use clap::Parser;
use marksearch::{
    bookmarks::BookmarkClient,
    config::Config,
    embed::create_embedder,
    error::{Error, Result},
    server::{self, AppState},
    store::VectorIndex,
    sync::SyncEngine,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "marksearch")]
#[command(version, about = "Semantic search sidecar for a bookmark service", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load configuration
    let config = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    info!("marksearch starting");
    info!("Bookmark service: {}", config.bookmarks.url);
    info!("Qdrant: {}", config.qdrant.url);

    // Initialize components
    let api_key = config.bookmarks_api_key().ok_or_else(|| {
        Error::Config(format!(
            "Bookmark service API key missing: set {}",
            config.bookmarks.api_key_env
        ))
    })?;
    let bookmarks = BookmarkClient::new(&config.bookmarks.url, &api_key)?;

    let embedder = create_embedder(&config.embedding)?;
    info!(
        "Embedding model: {} ({} dimensions)",
        embedder.model_name(),
        embedder.dimension()
    );

    let index = Arc::new(VectorIndex::new(
        &config.qdrant.url,
        &config.qdrant.collection,
        embedder,
    )?);

    let engine = SyncEngine::new(bookmarks, index.clone());

    let state = Arc::new(AppState {
        engine,
        index,
        config,
    });

    server::serve(state).await
}
