use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Creates and returns a SQLite connection pool, creating the database
/// file if it does not exist yet.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Connecting to SQLite at {database_url}...");

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("SQLite connection pool established");
    Ok(pool)
}

/// Creates all tables and indexes if they don't exist. Safe to call on
/// every startup.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            enabled BOOLEAN NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            profile_id INTEGER NOT NULL,
            job_hash TEXT NOT NULL,
            title TEXT NOT NULL,
            company TEXT NOT NULL,
            location TEXT,
            url TEXT,
            description TEXT,
            salary TEXT,
            posted_date TEXT,
            source TEXT NOT NULL,
            match_score REAL NOT NULL,
            ai_similarity REAL NOT NULL,
            keyword_match REAL NOT NULL,
            urgency_score REAL NOT NULL,
            keywords_matched TEXT NOT NULL,
            created_at TEXT NOT NULL,
            notified BOOLEAN NOT NULL DEFAULT 0,
            notification_sent_at TEXT,
            FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE,
            UNIQUE(profile_id, job_hash)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS run_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            profile_id INTEGER NOT NULL,
            status TEXT NOT NULL,
            jobs_found INTEGER NOT NULL DEFAULT 0,
            jobs_scraped INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    for stmt in [
        "CREATE INDEX IF NOT EXISTS idx_profile_jobs ON jobs(profile_id)",
        "CREATE INDEX IF NOT EXISTS idx_job_hash ON jobs(job_hash)",
        "CREATE INDEX IF NOT EXISTS idx_created_at ON jobs(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_match_score ON jobs(match_score)",
        "CREATE INDEX IF NOT EXISTS idx_run_history ON run_history(profile_id)",
    ] {
        sqlx::query(stmt).execute(pool).await?;
    }

    info!("Database schema initialized");
    Ok(())
}

/// In-memory pool for tests. A single connection keeps the shared
/// `:memory:` database alive for the pool's lifetime.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory SQLite pool");
    init_schema(&pool).await.expect("schema init");
    pool
}
