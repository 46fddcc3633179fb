//! Multi-factor match scoring: semantic similarity, keyword overlap, and
//! urgency signals combined into one [0, 1] match score per posting.
//!
//! Partial-failure tolerant by design: an embedding failure zeroes that
//! posting's semantic score, never aborts the batch.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{MatchConfig, MatchWeights, URGENCY_WEIGHT};
use crate::embed::{cosine_similarity, Embedder};
use crate::models::job::{RawPosting, ScoredPosting};
use crate::resume::ResumeContext;

/// Matched keywords recorded per posting are capped at this many.
const MAX_KEYWORDS_RECORDED: usize = 20;

/// Parses a scraped posted_date. Sources emit full RFC 3339 timestamps,
/// bare datetimes, or bare dates; anything else is unparseable.
pub fn parse_posted_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Age cutoff is fail-open: only postings whose date parses AND is older
/// than the cutoff are excluded. Missing or garbled dates pass through.
pub fn is_too_old(posted_date: Option<&str>, cutoff: DateTime<Utc>) -> bool {
    match posted_date.and_then(parse_posted_date) {
        Some(posted) => posted < cutoff,
        None => false,
    }
}

/// Resume-keyword coverage of the description: |matched| / |resume keywords|.
/// Asymmetric on purpose — it measures how much of the resume shows up in
/// the posting, not the other way round. Returns the matched keywords in
/// resume order, capped at 20.
pub fn keyword_match(keywords: &[String], description: &str) -> (f64, Vec<String>) {
    if keywords.is_empty() {
        return (0.0, Vec::new());
    }
    let description_lower = description.to_lowercase();
    let matched: Vec<String> = keywords
        .iter()
        .filter(|k| description_lower.contains(k.as_str()))
        .cloned()
        .collect();

    let score = matched.len() as f64 / keywords.len() as f64;
    let mut recorded = matched;
    recorded.truncate(MAX_KEYWORDS_RECORDED);
    (score, recorded)
}

/// Urgency density heuristic: case-insensitive substring hits from the
/// configured phrase vocabulary, scored min(1, hits/5). Not a probability.
pub fn urgency_score(description: &str, phrases: &[String]) -> f64 {
    let description_lower = description.to_lowercase();
    let hits = phrases
        .iter()
        .filter(|p| description_lower.contains(p.as_str()))
        .count();
    (hits as f64 / 5.0).min(1.0)
}

/// Weighted combination, clamped to [0, 1]. Negative cosine similarity is
/// clamped to zero before weighting: a dissimilar posting contributes no
/// signal rather than a penalty.
pub fn combine_scores(
    ai_similarity: f64,
    keyword_score: f64,
    urgency: f64,
    weights: &MatchWeights,
) -> f64 {
    let ai = ai_similarity.max(0.0);
    (ai * weights.description_match + keyword_score * weights.skills + urgency * URGENCY_WEIGHT)
        .clamp(0.0, 1.0)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Scores one batch of postings against the resume context.
///
/// Postings older than the configured max age are excluded before any
/// embedding call; postings with no description are skipped with a warning.
/// Output order follows input order.
pub async fn score_postings(
    postings: Vec<RawPosting>,
    resume: &ResumeContext,
    embedder: &dyn Embedder,
    cfg: &MatchConfig,
) -> Vec<ScoredPosting> {
    let cutoff = Utc::now() - Duration::days(cfg.max_job_age_days);
    let resume_embedding = resume.embedding(embedder).await;
    let total = postings.len();
    let mut scored = Vec::with_capacity(total);

    for (i, posting) in postings.into_iter().enumerate() {
        info!(
            "  Matching {}/{}: {} at {}",
            i + 1,
            total,
            posting.title,
            posting.company
        );

        let description = match posting.description.as_deref() {
            Some(d) if !d.trim().is_empty() => d.to_string(),
            _ => {
                warn!("  No description for '{}', skipping", posting.title);
                continue;
            }
        };

        if is_too_old(posting.posted_date.as_deref(), cutoff) {
            debug!("  Job too old: {:?}", posting.posted_date);
            continue;
        }

        let ai_similarity = match resume_embedding {
            Some(resume_vec) => match embedder.embed(&description).await {
                Ok(job_vec) => cosine_similarity(resume_vec, &job_vec),
                Err(e) => {
                    warn!(
                        "  Embedding failed for '{}', semantic score degrades to 0: {e}",
                        posting.title
                    );
                    0.0
                }
            },
            None => 0.0,
        };

        let (keyword_score, keywords_matched) = keyword_match(&resume.keywords, &description);
        let urgency = urgency_score(&description, &cfg.urgency_phrases);
        let match_score = combine_scores(ai_similarity, keyword_score, urgency, &cfg.weights);

        debug!(
            "  Scored '{}': {:.3} (ai {:.3}, keywords {:.3}, urgency {:.3})",
            posting.title, match_score, ai_similarity, keyword_score, urgency
        );

        scored.push(ScoredPosting {
            posting,
            ai_similarity: round3(ai_similarity.max(0.0)),
            keyword_match: round3(keyword_score),
            urgency_score: round3(urgency),
            match_score: round3(match_score),
            keywords_matched,
        });
    }

    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::testing::{FailingEmbedder, FixedEmbedder};

    fn posting(title: &str, description: Option<&str>, posted_date: Option<&str>) -> RawPosting {
        RawPosting {
            title: title.to_string(),
            company: "Acme".to_string(),
            location: Some("Berlin".to_string()),
            url: Some("https://jobs.example/1".to_string()),
            description: description.map(|d| d.to_string()),
            salary: None,
            posted_date: posted_date.map(|d| d.to_string()),
            source: "indeed".to_string(),
        }
    }

    fn weights() -> MatchWeights {
        MatchWeights {
            description_match: 0.5,
            skills: 0.4,
        }
    }

    #[test]
    fn test_combine_scores_reference_scenario() {
        // ai=0.92, keywords=0.80, urgency=0.20 with weights {0.5, 0.4}
        let score = combine_scores(0.92, 0.80, 0.20, &weights());
        assert!((score - 0.80).abs() < 1e-9, "score was {score}");
        assert!(score < 0.90, "must fall below the 0.90 threshold");
    }

    #[test]
    fn test_combine_scores_boundary_scenario() {
        // ai=0.95, keywords=0.95 → 0.475 + 0.38 + 0.02 = 0.875, still below 0.90
        let score = combine_scores(0.95, 0.95, 0.20, &weights());
        assert!((score - 0.875).abs() < 1e-9, "score was {score}");
        assert!(score < 0.90);
    }

    #[test]
    fn test_combine_scores_always_clamped() {
        let heavy = MatchWeights {
            description_match: 5.0,
            skills: 5.0,
        };
        assert_eq!(combine_scores(1.0, 1.0, 1.0, &heavy), 1.0);
        assert_eq!(combine_scores(0.0, 0.0, 0.0, &weights()), 0.0);
    }

    #[test]
    fn test_combine_scores_clamps_negative_similarity() {
        let with_negative = combine_scores(-0.6, 0.5, 0.0, &weights());
        let with_zero = combine_scores(0.0, 0.5, 0.0, &weights());
        assert_eq!(with_negative, with_zero);
        assert!(with_negative >= 0.0);
    }

    #[test]
    fn test_keyword_match_coverage() {
        let keywords = vec![
            "rust".to_string(),
            "postgresql".to_string(),
            "kafka".to_string(),
            "terraform".to_string(),
        ];
        let (score, matched) =
            keyword_match(&keywords, "We use Rust and PostgreSQL in production");
        assert_eq!(score, 0.5);
        assert_eq!(matched, vec!["rust", "postgresql"]);
    }

    #[test]
    fn test_keyword_match_empty_resume_is_zero() {
        let (score, matched) = keyword_match(&[], "Rust everywhere");
        assert_eq!(score, 0.0);
        assert!(matched.is_empty());
    }

    #[test]
    fn test_keyword_match_caps_recorded_at_20() {
        let keywords: Vec<String> = (0..30).map(|i| format!("skill{i:02}")).collect();
        let description = keywords.join(" ");
        let (score, matched) = keyword_match(&keywords, &description);
        assert_eq!(score, 1.0); // score counts all matches
        assert_eq!(matched.len(), 20); // recorded list is capped
    }

    #[test]
    fn test_urgency_density() {
        let phrases: Vec<String> = crate::config::DEFAULT_URGENCY_PHRASES
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(urgency_score("nothing special here", &phrases), 0.0);
        assert_eq!(urgency_score("URGENT: immediate start", &phrases), 0.6);
        let all = "urgent immediate asap visa sponsor relocation hiring now";
        assert_eq!(urgency_score(all, &phrases), 1.0);
    }

    #[test]
    fn test_parse_posted_date_formats() {
        assert!(parse_posted_date("2026-08-01").is_some());
        assert!(parse_posted_date("2026-08-01T10:30:00").is_some());
        assert!(parse_posted_date("2026-08-01T10:30:00+02:00").is_some());
        assert!(parse_posted_date("3 days ago").is_none());
    }

    #[test]
    fn test_age_cutoff_fail_open() {
        let cutoff = Utc::now() - Duration::days(14);
        let old = (Utc::now() - Duration::days(30)).to_rfc3339();
        let fresh = (Utc::now() - Duration::days(2)).to_rfc3339();
        assert!(is_too_old(Some(&old), cutoff));
        assert!(!is_too_old(Some(&fresh), cutoff));
        assert!(!is_too_old(None, cutoff));
        assert!(!is_too_old(Some("last Tuesday"), cutoff));
    }

    #[tokio::test]
    async fn test_score_postings_skips_empty_description() {
        let cfg = MatchConfig::default();
        let resume = ResumeContext::new("rust engineer".to_string(), vec!["rust".to_string()]);
        let embedder = FixedEmbedder(vec![1.0, 0.0]);
        let postings = vec![
            posting("No Desc", None, None),
            posting("Blank Desc", Some("   "), None),
            posting("Real", Some("Rust role, urgent"), None),
        ];
        let scored = score_postings(postings, &resume, &embedder, &cfg).await;
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].posting.title, "Real");
    }

    #[tokio::test]
    async fn test_score_postings_excludes_old_postings() {
        let cfg = MatchConfig::default();
        let resume = ResumeContext::new("rust engineer".to_string(), vec![]);
        let embedder = FixedEmbedder(vec![1.0, 0.0]);
        let old = (Utc::now() - Duration::days(60)).to_rfc3339();
        let postings = vec![posting("Stale", Some("Rust role"), Some(&old))];
        let scored = score_postings(postings, &resume, &embedder, &cfg).await;
        assert!(scored.is_empty());
    }

    #[tokio::test]
    async fn test_score_postings_identical_embeddings_give_full_similarity() {
        let cfg = MatchConfig::default();
        let resume = ResumeContext::new("rust engineer".to_string(), vec!["rust".to_string()]);
        let embedder = FixedEmbedder(vec![0.3, 0.7, 0.2]);
        let scored = score_postings(
            vec![posting("Match", Some("All about rust"), None)],
            &resume,
            &embedder,
            &cfg,
        )
        .await;
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].ai_similarity, 1.0);
        assert_eq!(scored[0].keyword_match, 1.0);
        // 1.0*0.5 + 1.0*0.4 + 0.0*0.1 = 0.9
        assert_eq!(scored[0].match_score, 0.9);
    }

    #[tokio::test]
    async fn test_score_postings_embedding_failure_degrades_not_aborts() {
        let cfg = MatchConfig::default();
        let resume = ResumeContext::new("rust engineer".to_string(), vec!["rust".to_string()]);
        let scored = score_postings(
            vec![posting("Degraded", Some("rust role, urgent, asap"), None)],
            &resume,
            &FailingEmbedder,
            &cfg,
        )
        .await;
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].ai_similarity, 0.0);
        assert_eq!(scored[0].keyword_match, 1.0);
        assert!(scored[0].urgency_score > 0.0);
    }
}
