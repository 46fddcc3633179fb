use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::embed::Embedder;
use crate::notify::Notifier;
use crate::sources::JobSource;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Pluggable embedding backend. Production: Gemini embedContent.
    pub embedder: Arc<dyn Embedder>,
    /// Pluggable delivery backend. Webhook when configured, log otherwise.
    pub notifier: Arc<dyn Notifier>,
    /// One source per configured portal feed.
    pub sources: Arc<Vec<Arc<dyn JobSource>>>,
    pub config: Config,
}
