//! Run history: one row brackets each pipeline run for observability.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::models::run::{RunRow, RunStatus};

/// Opens a run record in the `running` state and returns its id.
pub async fn start_run(pool: &SqlitePool, profile_id: i64) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO run_history (profile_id, status, started_at) VALUES (?, ?, ?)",
    )
    .bind(profile_id)
    .bind(RunStatus::Running.as_str())
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Closes a run record with its terminal status and counts.
pub async fn complete_run(
    pool: &SqlitePool,
    run_id: i64,
    status: RunStatus,
    jobs_found: i64,
    jobs_scraped: i64,
    error_message: Option<&str>,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE run_history
        SET status = ?, jobs_found = ?, jobs_scraped = ?, error_message = ?, completed_at = ?
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(jobs_found)
    .bind(jobs_scraped)
    .bind(error_message)
    .bind(Utc::now())
    .bind(run_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn run_history(
    pool: &SqlitePool,
    profile_id: i64,
    limit: i64,
) -> sqlx::Result<Vec<RunRow>> {
    sqlx::query_as::<_, RunRow>(
        "SELECT * FROM run_history WHERE profile_id = ? ORDER BY started_at DESC LIMIT ?",
    )
    .bind(profile_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Aggregate numbers for the dashboard endpoint.
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_profiles: i64,
    pub jobs_last_7_days: i64,
    pub success_rate: f64,
    pub avg_jobs_per_run: f64,
}

pub async fn dashboard_stats(pool: &SqlitePool) -> sqlx::Result<DashboardStats> {
    let total_profiles: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE enabled = 1")
            .fetch_one(pool)
            .await?;

    let jobs_last_7_days: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM jobs WHERE created_at >= datetime('now', '-7 days')",
    )
    .fetch_one(pool)
    .await?;

    let success_rate: Option<f64> = sqlx::query_scalar(
        r#"
        SELECT COUNT(CASE WHEN status = 'success' THEN 1 END) * 100.0 / COUNT(*)
        FROM (SELECT status FROM run_history ORDER BY started_at DESC LIMIT 10)
        "#,
    )
    .fetch_one(pool)
    .await?;

    let avg_jobs_per_run: Option<f64> = sqlx::query_scalar(
        r#"
        SELECT AVG(jobs_found) FROM run_history
        WHERE status = 'success' AND started_at >= datetime('now', '-7 days')
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(DashboardStats {
        total_profiles,
        jobs_last_7_days,
        success_rate: (success_rate.unwrap_or(0.0) * 10.0).round() / 10.0,
        avg_jobs_per_run: (avg_jobs_per_run.unwrap_or(0.0) * 10.0).round() / 10.0,
    })
}
