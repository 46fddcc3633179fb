use anyhow::{Context, Result};

/// Hard cap on matches surfaced per notification cycle. A business rule,
/// not a tuning knob: more than this overwhelms the recipient.
pub const MAX_MATCHES_PER_CYCLE: i64 = 10;

/// Fixed weight applied to the urgency sub-score in the combined match score.
pub const URGENCY_WEIGHT: f64 = 0.10;

/// Phrases that signal fast-hiring, visa, or relocation intent.
pub const DEFAULT_URGENCY_PHRASES: &[&str] = &[
    "urgent",
    "immediate",
    "asap",
    "immediately",
    "fast track",
    "quick hire",
    "start now",
    "start immediately",
    "soon as possible",
    "visa sponsor",
    "sponsorship",
    "relocation",
    "expedited",
    "hiring now",
    "join immediately",
    "immediate start",
];

/// Per-factor weights for the combined match score.
#[derive(Debug, Clone)]
pub struct MatchWeights {
    pub description_match: f64,
    pub skills: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            description_match: 0.5,
            skills: 0.4,
        }
    }
}

/// Matching configuration, validated once at startup. The scoring code takes
/// this by reference; nothing in the pipeline reads the environment directly.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub threshold: f64,
    pub max_job_age_days: i64,
    pub weights: MatchWeights,
    pub urgency_phrases: Vec<String>,
    pub retention_days: i64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.90,
            max_job_age_days: 14,
            weights: MatchWeights::default(),
            urgency_phrases: DEFAULT_URGENCY_PHRASES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            retention_days: 90,
        }
    }
}

/// A named job feed endpoint, parsed from `JOB_FEEDS` ("name=url;name=url").
#[derive(Debug, Clone)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gemini_api_key: String,
    pub embedding_model: String,
    pub notify_webhook_url: Option<String>,
    pub job_feeds: Vec<FeedSpec>,
    pub port: u16,
    pub rust_log: String,
    pub matching: MatchConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/jobs.db".to_string()),
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            embedding_model: std::env::var("GEMINI_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-004".to_string()),
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok(),
            job_feeds: parse_job_feeds(&std::env::var("JOB_FEEDS").unwrap_or_default())?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            matching: match_config_from_env()?,
        })
    }
}

fn match_config_from_env() -> Result<MatchConfig> {
    let defaults = MatchConfig::default();

    let urgency_phrases = match std::env::var("URGENCY_PHRASES") {
        Ok(raw) => raw
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect(),
        Err(_) => defaults.urgency_phrases,
    };

    Ok(MatchConfig {
        threshold: parse_or("MATCH_THRESHOLD", defaults.threshold)?,
        max_job_age_days: parse_or("MAX_JOB_AGE_DAYS", defaults.max_job_age_days)?,
        weights: MatchWeights {
            description_match: parse_or(
                "WEIGHT_DESCRIPTION_MATCH",
                defaults.weights.description_match,
            )?,
            skills: parse_or("WEIGHT_SKILLS", defaults.weights.skills)?,
        },
        urgency_phrases,
        retention_days: parse_or("JOB_RETENTION_DAYS", defaults.retention_days)?,
    })
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("'{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn parse_job_feeds(raw: &str) -> Result<Vec<FeedSpec>> {
    let mut feeds = Vec::new();
    for entry in raw.split(';').filter(|e| !e.trim().is_empty()) {
        let (name, url) = entry
            .split_once('=')
            .with_context(|| format!("JOB_FEEDS entry '{entry}' is not 'name=url'"))?;
        feeds.push(FeedSpec {
            name: name.trim().to_string(),
            url: url.trim().to_string(),
        });
    }
    Ok(feeds)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
