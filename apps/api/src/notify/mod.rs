//! Notifier contract. Formatting and transport live behind the trait; the
//! pipeline only learns whether delivery succeeded. On failure the affected
//! records stay unnotified and are re-surfaced next cycle (at-least-once).

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::models::job::JobRow;
use crate::models::profile::ProfileRow;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook returned status {0}")]
    Status(u16),
}

/// The ranked payload handed to a notifier: at most the per-cycle cap of
/// records, plus the total so recipients can see "N more matches".
#[derive(Debug, Serialize)]
pub struct MatchDigest {
    pub jobs: Vec<JobRow>,
    pub total_matches: i64,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, profile: &ProfileRow, digest: &MatchDigest)
        -> Result<(), NotifyError>;
}

/// Logs the digest instead of delivering it. Default when no webhook is
/// configured; useful for dry runs.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(
        &self,
        profile: &ProfileRow,
        digest: &MatchDigest,
    ) -> Result<(), NotifyError> {
        info!(
            "Would notify {} <{}> about {} matches ({} total)",
            profile.name,
            profile.email,
            digest.jobs.len(),
            digest.total_matches
        );
        for job in &digest.jobs {
            info!(
                "  {:.1}% {} at {} ({})",
                job.match_score * 100.0,
                job.title,
                job.company,
                job.source
            );
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    profile_id: i64,
    email: &'a str,
    #[serde(flatten)]
    digest: &'a MatchDigest,
}

/// Posts the digest as JSON to a configured webhook (the mail relay that
/// owns templating and SMTP).
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(
        &self,
        profile: &ProfileRow,
        digest: &MatchDigest,
    ) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            profile_id: profile.id,
            email: &profile.email,
            digest,
        };
        let response = self.client.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        info!("Delivered {} matches to webhook", digest.jobs.len());
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Records delivery calls; configurable to fail.
    pub struct RecordingNotifier {
        pub deliveries: AtomicUsize,
        pub fail: bool,
    }

    impl RecordingNotifier {
        pub fn new(fail: bool) -> Self {
            Self {
                deliveries: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn deliver(
            &self,
            _profile: &ProfileRow,
            _digest: &MatchDigest,
        ) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Status(500));
            }
            self.deliveries.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
