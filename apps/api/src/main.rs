mod config;
mod db;
mod embed;
mod errors;
mod matching;
mod models;
mod notify;
mod pipeline;
mod resume;
mod routes;
mod sources;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, init_schema};
use crate::embed::GeminiEmbedder;
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::routes::build_router;
use crate::sources::{JobSource, JsonFeedSource};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobScout API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite and schema
    let db = create_pool(&config.database_url).await?;
    init_schema(&db).await?;

    // Retention sweep for jobs past the configured window
    store::jobs::cleanup_old_jobs(&db, config.matching.retention_days).await?;

    // Embedding client
    let embedder = Arc::new(GeminiEmbedder::new(
        config.gemini_api_key.clone(),
        config.embedding_model.clone(),
    ));
    info!("Embedding client initialized (model: {})", config.embedding_model);

    // Notifier: webhook when configured, log-only otherwise
    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            info!("Webhook notifier initialized");
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => {
            warn!("NOTIFY_WEBHOOK_URL not set, matches will only be logged");
            Arc::new(LogNotifier)
        }
    };

    // Job feed sources
    let sources: Vec<Arc<dyn JobSource>> = config
        .job_feeds
        .iter()
        .map(|spec| Arc::new(JsonFeedSource::new(spec)) as Arc<dyn JobSource>)
        .collect();
    info!("Initialized {} job sources", sources.len());

    // Build app state
    let state = AppState {
        db,
        embedder,
        notifier,
        sources: Arc::new(sources),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
