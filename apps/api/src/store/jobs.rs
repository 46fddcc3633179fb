//! Persisted posting state per profile: dedup lookups, idempotent saves,
//! and notification tracking.
//!
//! Saves are keyed UNIQUE(profile_id, job_hash) with insert-or-ignore, so
//! re-running a batch is always safe. Two concurrent runs can both see a
//! not-yet-saved fingerprint as new; the duplicate insert that follows is a
//! no-op, which makes the race an accepted at-least-once duplication.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::matching::fingerprint::fingerprint;
use crate::models::job::{JobRow, RawPosting, ScoredPosting};

/// True iff no record with this fingerprint exists for the profile.
pub async fn is_new_job(
    pool: &SqlitePool,
    profile_id: i64,
    job_hash: &str,
) -> sqlx::Result<bool> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM jobs WHERE profile_id = ? AND job_hash = ? LIMIT 1")
            .bind(profile_id)
            .bind(job_hash)
            .fetch_optional(pool)
            .await?;
    Ok(existing.is_none())
}

/// Drops postings already persisted for this profile, preserving input
/// order. Read-only: new fingerprints are recorded at save time, not here.
pub async fn filter_new_postings(
    pool: &SqlitePool,
    profile_id: i64,
    postings: Vec<RawPosting>,
) -> sqlx::Result<Vec<RawPosting>> {
    let mut new_postings = Vec::with_capacity(postings.len());
    for posting in postings {
        if is_new_job(pool, profile_id, &fingerprint(&posting)).await? {
            new_postings.push(posting);
        }
    }
    Ok(new_postings)
}

/// Persists scored postings for a profile. Duplicate fingerprints are
/// silently ignored (first seen wins). Returns the number actually inserted.
pub async fn save_jobs(
    pool: &SqlitePool,
    profile_id: i64,
    scored: &[ScoredPosting],
) -> sqlx::Result<u64> {
    let mut saved = 0u64;
    for job in scored {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO jobs (
                profile_id, job_hash, title, company, location, url,
                description, salary, posted_date, source, match_score,
                ai_similarity, keyword_match, urgency_score, keywords_matched,
                created_at, notified
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(profile_id)
        .bind(fingerprint(&job.posting))
        .bind(&job.posting.title)
        .bind(&job.posting.company)
        .bind(&job.posting.location)
        .bind(&job.posting.url)
        .bind(&job.posting.description)
        .bind(&job.posting.salary)
        .bind(&job.posting.posted_date)
        .bind(&job.posting.source)
        .bind(job.match_score)
        .bind(job.ai_similarity)
        .bind(job.keyword_match)
        .bind(job.urgency_score)
        .bind(sqlx::types::Json(&job.keywords_matched))
        .bind(Utc::now())
        .execute(pool)
        .await?;
        saved += result.rows_affected();
    }

    info!("Saved {saved} jobs ({} offered)", scored.len());
    Ok(saved)
}

/// Persisted records not yet delivered, best matches first. Ties break on
/// urgency, then recency. Bounded by `limit`.
pub async fn unnotified_jobs(
    pool: &SqlitePool,
    profile_id: i64,
    min_score: f64,
    limit: i64,
) -> sqlx::Result<Vec<JobRow>> {
    sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs
        WHERE profile_id = ? AND notified = 0 AND match_score >= ?
        ORDER BY match_score DESC, urgency_score DESC, created_at DESC
        LIMIT ?
        "#,
    )
    .bind(profile_id)
    .bind(min_score)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Total undelivered matches above the score floor, for "N more matches"
/// messaging alongside the capped digest.
pub async fn count_unnotified(
    pool: &SqlitePool,
    profile_id: i64,
    min_score: f64,
) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM jobs WHERE profile_id = ? AND notified = 0 AND match_score >= ?",
    )
    .bind(profile_id)
    .bind(min_score)
    .fetch_one(pool)
    .await
}

/// Flips notified and stamps the delivery time, one id at a time. Marking
/// an already-notified id is a no-op, so retries are safe.
pub async fn mark_jobs_notified(pool: &SqlitePool, job_ids: &[i64]) -> sqlx::Result<()> {
    for id in job_ids {
        sqlx::query(
            "UPDATE jobs SET notified = 1, notification_sent_at = ? WHERE id = ? AND notified = 0",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    }
    info!("Marked {} jobs as notified", job_ids.len());
    Ok(())
}

/// Recent high-scoring matches for a profile, for the dashboard view.
pub async fn recent_jobs(
    pool: &SqlitePool,
    profile_id: i64,
    days: i64,
    min_score: f64,
) -> sqlx::Result<Vec<JobRow>> {
    let cutoff = Utc::now() - Duration::days(days);
    sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs
        WHERE profile_id = ? AND created_at >= ? AND match_score >= ?
        ORDER BY match_score DESC, created_at DESC
        "#,
    )
    .bind(profile_id)
    .bind(cutoff)
    .bind(min_score)
    .fetch_all(pool)
    .await
}

/// Removes jobs past the retention window. The only deletion path.
pub async fn cleanup_old_jobs(pool: &SqlitePool, retention_days: i64) -> sqlx::Result<u64> {
    let cutoff = Utc::now() - Duration::days(retention_days);
    let result = sqlx::query("DELETE FROM jobs WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    let deleted = result.rows_affected();
    if deleted > 0 {
        info!("Cleaned up {deleted} old jobs");
    }
    Ok(deleted)
}
