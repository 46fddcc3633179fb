use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A raw posting record handed over by a job source. Everything except
/// title and company is optional; identity is the fingerprint, not the URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPosting {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub salary: Option<String>,
    /// ISO-8601 string as scraped; parsed lazily with fail-open semantics.
    pub posted_date: Option<String>,
    pub source: String,
}

/// A posting plus its sub-scores and combined match score, all in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPosting {
    #[serde(flatten)]
    pub posting: RawPosting,
    pub ai_similarity: f64,
    pub keyword_match: f64,
    pub urgency_score: f64,
    pub match_score: f64,
    /// Resume keywords found in the description, capped at 20.
    pub keywords_matched: Vec<String>,
}

/// Persisted matched posting. Unique on (profile_id, job_hash); first seen
/// wins, later duplicates are ignored. `notified` flips false→true exactly
/// once when a delivery cycle completes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: i64,
    pub profile_id: i64,
    pub job_hash: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub salary: Option<String>,
    pub posted_date: Option<String>,
    pub source: String,
    pub match_score: f64,
    pub ai_similarity: f64,
    pub keyword_match: f64,
    pub urgency_score: f64,
    pub keywords_matched: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub notified: bool,
    pub notification_sent_at: Option<DateTime<Utc>>,
}
