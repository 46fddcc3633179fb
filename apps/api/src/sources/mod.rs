//! Job source contract. The pipeline depends only on this trait; each
//! portal gets its own implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::config::FeedSpec;
use crate::models::job::RawPosting;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed returned status {0}")]
    Status(u16),
}

/// A portal that can be scraped for raw postings.
#[async_trait]
pub trait JobSource: Send + Sync {
    fn name(&self) -> &str;
    async fn scrape(&self) -> Result<Vec<RawPosting>, SourceError>;
}

#[derive(Debug, Deserialize)]
struct FeedPosting {
    title: String,
    company: String,
    location: Option<String>,
    url: Option<String>,
    description: Option<String>,
    salary: Option<String>,
    posted_date: Option<String>,
}

/// A source backed by an HTTP endpoint serving a JSON array of postings —
/// the handoff format produced by the browser-automation scrapers that run
/// outside this service.
pub struct JsonFeedSource {
    name: String,
    url: String,
    client: Client,
}

impl JsonFeedSource {
    pub fn new(spec: &FeedSpec) -> Self {
        Self {
            name: spec.name.clone(),
            url: spec.url.clone(),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl JobSource for JsonFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&self) -> Result<Vec<RawPosting>, SourceError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let feed: Vec<FeedPosting> = response.json().await?;
        let postings = feed
            .into_iter()
            .map(|p| RawPosting {
                title: p.title,
                company: p.company,
                location: p.location,
                url: p.url,
                description: p.description,
                salary: p.salary,
                posted_date: p.posted_date,
                source: self.name.clone(),
            })
            .collect::<Vec<_>>();

        info!("Found {} jobs from {}", postings.len(), self.name);
        Ok(postings)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Serves a fixed batch of postings.
    pub struct StaticSource {
        pub name: String,
        pub postings: Vec<RawPosting>,
    }

    #[async_trait]
    impl JobSource for StaticSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn scrape(&self) -> Result<Vec<RawPosting>, SourceError> {
            Ok(self.postings.clone())
        }
    }

    /// Always fails, for exercising the skip-one-source path.
    pub struct BrokenSource;

    #[async_trait]
    impl JobSource for BrokenSource {
        fn name(&self) -> &str {
            "broken"
        }

        async fn scrape(&self) -> Result<Vec<RawPosting>, SourceError> {
            Err(SourceError::Status(503))
        }
    }
}
