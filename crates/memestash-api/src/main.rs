//! Memestash binary: wires configuration, storage, the metadata store, the
//! OCR backend, the bot dispatch loop, and the asset-serving HTTP server.

mod error;
mod routes;
mod state;
mod transport;

use memestash_core::Config;
use memestash_db::MemeRepository;
use memestash_ocr::create_extractor;
use memestash_services::{bot, Dispatcher, IngestionPipeline, LinkMinter, SearchEngine};
use memestash_storage::AssetStore;
use state::AppState;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    match &config.allowed_senders {
        Some(senders) => tracing::info!(count = senders.len(), "sender allow-list active"),
        None => tracing::warn!("MEMESTASH_ALLOWED_SENDERS unset, accepting events from anyone"),
    }

    tokio::fs::create_dir_all(&config.data_dir).await?;
    let pool = memestash_db::open_file(&config.database_path(), config.db_max_connections).await?;
    let repo = MemeRepository::new(pool);
    let store = AssetStore::new(&config.data_dir).await?;
    let extractor = create_extractor(&config.ocr)?;

    let secret = config.signing_secret.as_bytes().to_vec();
    let pipeline = IngestionPipeline::new(repo.clone(), store.clone(), extractor);
    let search = SearchEngine::new(repo);
    let links = LinkMinter::new(config.public_url.clone(), secret.clone());
    let dispatcher = Arc::new(Dispatcher::new(
        pipeline,
        search,
        links,
        config.allowed_senders.clone(),
    ));

    // The sender half is the attachment point for a messaging adapter; the
    // loop exits when every sender is dropped.
    let (_event_tx, source) = transport::channel(64);
    let sink = Arc::new(transport::LoggingReplySink);
    tokio::spawn(bot::run_dispatch_loop(dispatcher, source, sink));

    let app = routes::build_router(Arc::new(AppState { store, secret }));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server_port)).await?;
    tracing::info!(port = config.server_port, "asset server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
