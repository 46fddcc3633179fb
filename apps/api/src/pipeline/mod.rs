//! Run orchestrator: one linear pass per profile.
//!
//! Scrape → dedup → score → rank → persist → fetch unnotified → deliver →
//! mark notified. An empty intermediate batch ends the run early as a
//! normal success, not a failure. Delivery failure is a warning: the rows
//! stay unnotified and re-surface on the next cycle that reaches delivery.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::{MatchConfig, MAX_MATCHES_PER_CYCLE};
use crate::embed::Embedder;
use crate::errors::AppError;
use crate::matching::{rank::rank, scorer::score_postings};
use crate::models::job::RawPosting;
use crate::models::profile::ProfileRow;
use crate::models::run::{RunStatus, RunSummary};
use crate::notify::{MatchDigest, Notifier};
use crate::resume::ResumeContext;
use crate::sources::JobSource;
use crate::store::{jobs, runs};

#[derive(Debug, Default)]
struct StageCounts {
    scraped: usize,
    new: usize,
    matched: usize,
    saved: u64,
    notified: usize,
}

/// Runs the pipeline once for one profile, bracketed by a run-history row.
/// Fatal errors (bad input, database) mark the run failed and propagate;
/// per-posting and per-source failures degrade inside the run.
pub async fn run_pipeline(
    pool: &SqlitePool,
    sources: &[Arc<dyn JobSource>],
    embedder: &dyn Embedder,
    notifier: &dyn Notifier,
    cfg: &MatchConfig,
    profile: &ProfileRow,
    resume: &ResumeContext,
) -> Result<RunSummary, AppError> {
    info!("Starting run for profile {} ({})", profile.id, profile.name);
    let run_id = runs::start_run(pool, profile.id).await?;

    match execute(pool, sources, embedder, notifier, cfg, profile, resume).await {
        Ok(counts) => {
            runs::complete_run(
                pool,
                run_id,
                RunStatus::Success,
                counts.matched as i64,
                counts.scraped as i64,
                None,
            )
            .await?;
            info!(
                "Run {run_id} completed: {} scraped, {} new, {} matched, {} notified",
                counts.scraped, counts.new, counts.matched, counts.notified
            );
            Ok(RunSummary {
                run_id,
                status: RunStatus::Success,
                scraped: counts.scraped,
                new: counts.new,
                matched: counts.matched,
                saved: counts.saved,
                notified: counts.notified,
            })
        }
        Err(e) => {
            let message = e.to_string();
            runs::complete_run(pool, run_id, RunStatus::Failed, 0, 0, Some(&message)).await?;
            Err(e)
        }
    }
}

async fn execute(
    pool: &SqlitePool,
    sources: &[Arc<dyn JobSource>],
    embedder: &dyn Embedder,
    notifier: &dyn Notifier,
    cfg: &MatchConfig,
    profile: &ProfileRow,
    resume: &ResumeContext,
) -> Result<StageCounts, AppError> {
    if resume.full_text.trim().is_empty() {
        return Err(AppError::Validation("resume text is empty".to_string()));
    }

    let mut counts = StageCounts::default();

    // Scrape. One failing source is skipped, never fatal.
    let mut all_postings: Vec<RawPosting> = Vec::new();
    for source in sources {
        info!("Scraping jobs from {}...", source.name());
        match source.scrape().await {
            Ok(postings) => all_postings.extend(postings),
            Err(e) => warn!("Source {} failed, skipping: {e}", source.name()),
        }
    }
    counts.scraped = all_postings.len();
    info!("Total jobs scraped: {}", counts.scraped);
    if all_postings.is_empty() {
        info!("No jobs scraped. Done.");
        return Ok(counts);
    }

    // Dedup against persisted history for this profile.
    let new_postings = jobs::filter_new_postings(pool, profile.id, all_postings).await?;
    counts.new = new_postings.len();
    info!("New jobs (not seen before): {}", counts.new);
    if new_postings.is_empty() {
        info!("No new jobs found. Done.");
        return Ok(counts);
    }

    // Score and rank.
    let scored = score_postings(new_postings, resume, embedder, cfg).await;
    let outcome = rank(scored, cfg.threshold);
    counts.matched = outcome.top.len();
    info!(
        "Found {} high-quality matches ({} qualifying)",
        counts.matched, outcome.qualifying
    );
    if outcome.top.is_empty() {
        info!("No matches above threshold. Done.");
        return Ok(counts);
    }

    // Persist, then surface only what was never delivered.
    counts.saved = jobs::save_jobs(pool, profile.id, &outcome.top).await?;

    let pending =
        jobs::unnotified_jobs(pool, profile.id, cfg.threshold, MAX_MATCHES_PER_CYCLE).await?;
    info!("Jobs not yet sent: {}", pending.len());
    if pending.is_empty() {
        info!("All matches already sent in previous cycles. Done.");
        return Ok(counts);
    }

    let total_matches = jobs::count_unnotified(pool, profile.id, cfg.threshold).await?;
    let ids: Vec<i64> = pending.iter().map(|j| j.id).collect();
    let digest = MatchDigest {
        jobs: pending,
        total_matches,
    };

    // Delivery failure is a warning, not a run failure: the rows stay
    // unnotified and will be retried on the next cycle.
    match notifier.deliver(profile, &digest).await {
        Ok(()) => {
            jobs::mark_jobs_notified(pool, &ids).await?;
            counts.notified = ids.len();
        }
        Err(e) => {
            warn!("Notification delivery failed, matches remain queued: {e}");
        }
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::embed::testing::FixedEmbedder;
    use crate::notify::testing::RecordingNotifier;
    use crate::sources::testing::{BrokenSource, StaticSource};
    use crate::store::profiles::create_profile;

    fn posting(title: &str) -> RawPosting {
        RawPosting {
            title: title.to_string(),
            company: "Acme".to_string(),
            location: Some("Berlin".to_string()),
            url: Some("https://jobs.example/1".to_string()),
            description: Some("We build rust services".to_string()),
            salary: None,
            posted_date: None,
            source: "static".to_string(),
        }
    }

    fn test_cfg() -> MatchConfig {
        MatchConfig {
            threshold: 0.5,
            ..MatchConfig::default()
        }
    }

    fn resume() -> ResumeContext {
        ResumeContext::new(
            "Senior engineer, rust".to_string(),
            vec!["rust".to_string()],
        )
    }

    fn static_source(postings: Vec<RawPosting>) -> Vec<Arc<dyn JobSource>> {
        vec![Arc::new(StaticSource {
            name: "static".to_string(),
            postings,
        })]
    }

    #[tokio::test]
    async fn test_full_run_notifies_and_second_run_short_circuits() {
        let pool = test_pool().await;
        let profile = create_profile(&pool, "Dana", "dana@example.com").await.unwrap();
        let sources = static_source(vec![posting("Backend Engineer"), posting("Platform Engineer")]);
        let embedder = FixedEmbedder(vec![1.0, 0.0]);
        let notifier = RecordingNotifier::new(false);
        let cfg = test_cfg();

        let summary =
            run_pipeline(&pool, &sources, &embedder, &notifier, &cfg, &profile, &resume())
                .await
                .unwrap();
        assert_eq!(summary.status, RunStatus::Success);
        assert_eq!(summary.scraped, 2);
        assert_eq!(summary.new, 2);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.saved, 2);
        assert_eq!(summary.notified, 2);

        // Same batch again: dedup empties the run before scoring.
        let again =
            run_pipeline(&pool, &sources, &embedder, &notifier, &cfg, &profile, &resume())
                .await
                .unwrap();
        assert_eq!(again.status, RunStatus::Success);
        assert_eq!(again.new, 0);
        assert_eq!(again.notified, 0);

        use std::sync::atomic::Ordering;
        assert_eq!(notifier.deliveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_run_successful_and_rows_queued() {
        let pool = test_pool().await;
        let profile = create_profile(&pool, "Dana", "dana@example.com").await.unwrap();
        let sources = static_source(vec![posting("Backend Engineer")]);
        let embedder = FixedEmbedder(vec![1.0, 0.0]);
        let failing = RecordingNotifier::new(true);
        let cfg = test_cfg();

        let summary =
            run_pipeline(&pool, &sources, &embedder, &failing, &cfg, &profile, &resume())
                .await
                .unwrap();
        assert_eq!(summary.status, RunStatus::Success, "delivery failure is not a run failure");
        assert_eq!(summary.notified, 0);

        // Row persisted, still queued for the next delivery attempt.
        let pending = jobs::unnotified_jobs(&pool, profile.id, cfg.threshold, 10).await.unwrap();
        assert_eq!(pending.len(), 1);

        // A later run with a fresh posting delivers the backlog too.
        let more = static_source(vec![posting("Backend Engineer"), posting("Data Engineer")]);
        let working = RecordingNotifier::new(false);
        let second =
            run_pipeline(&pool, &more, &embedder, &working, &cfg, &profile, &resume())
                .await
                .unwrap();
        assert_eq!(second.new, 1);
        assert_eq!(second.notified, 2, "backlog plus the new match");
        assert!(jobs::unnotified_jobs(&pool, profile.id, cfg.threshold, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_empty_resume_is_fatal_and_recorded() {
        let pool = test_pool().await;
        let profile = create_profile(&pool, "Dana", "dana@example.com").await.unwrap();
        let sources = static_source(vec![posting("Backend Engineer")]);
        let embedder = FixedEmbedder(vec![1.0]);
        let notifier = RecordingNotifier::new(false);
        let cfg = test_cfg();
        let empty_resume = ResumeContext::new("   ".to_string(), vec![]);

        let err = run_pipeline(
            &pool, &sources, &embedder, &notifier, &cfg, &profile, &empty_resume,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let history = runs::run_history(&pool, profile.id, 10).await.unwrap();
        assert_eq!(history[0].status, "failed");
        assert!(history[0].error_message.as_deref().unwrap().contains("resume"));
    }

    #[tokio::test]
    async fn test_one_broken_source_does_not_abort_run() {
        let pool = test_pool().await;
        let profile = create_profile(&pool, "Dana", "dana@example.com").await.unwrap();
        let sources: Vec<Arc<dyn JobSource>> = vec![
            Arc::new(BrokenSource),
            Arc::new(StaticSource {
                name: "static".to_string(),
                postings: vec![posting("Backend Engineer")],
            }),
        ];
        let embedder = FixedEmbedder(vec![1.0, 0.0]);
        let notifier = RecordingNotifier::new(false);
        let cfg = test_cfg();

        let summary =
            run_pipeline(&pool, &sources, &embedder, &notifier, &cfg, &profile, &resume())
                .await
                .unwrap();
        assert_eq!(summary.scraped, 1);
        assert_eq!(summary.notified, 1);
    }

    #[tokio::test]
    async fn test_below_threshold_batch_short_circuits_before_persist() {
        let pool = test_pool().await;
        let profile = create_profile(&pool, "Dana", "dana@example.com").await.unwrap();
        let sources = static_source(vec![posting("Backend Engineer")]);
        let embedder = FixedEmbedder(vec![1.0, 0.0]);
        let notifier = RecordingNotifier::new(false);
        let cfg = MatchConfig {
            threshold: 0.99, // 1.0*0.5 + 1.0*0.4 = 0.9 stays below
            ..MatchConfig::default()
        };

        let summary =
            run_pipeline(&pool, &sources, &embedder, &notifier, &cfg, &profile, &resume())
                .await
                .unwrap();
        assert_eq!(summary.status, RunStatus::Success);
        assert_eq!(summary.matched, 0);
        assert_eq!(summary.saved, 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0, "nothing below threshold is persisted");
    }
}
