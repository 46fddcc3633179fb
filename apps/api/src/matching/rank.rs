use tracing::{debug, info};

use crate::config::MAX_MATCHES_PER_CYCLE;
use crate::models::job::ScoredPosting;

/// Result of thresholding and ranking one scored batch.
#[derive(Debug)]
pub struct RankOutcome {
    /// At most `MAX_MATCHES_PER_CYCLE` postings, best first.
    pub top: Vec<ScoredPosting>,
    /// How many postings qualified before the cap.
    pub qualifying: usize,
}

/// Keeps postings with `match_score >= threshold` (strict ≥), sorts them
/// descending by score with a stable tie-break on scoring order, and
/// truncates to the per-cycle cap. The cap holds even when more postings
/// qualify; the overflow is logged.
pub fn rank(scored: Vec<ScoredPosting>, threshold: f64) -> RankOutcome {
    let mut qualifying: Vec<ScoredPosting> = scored
        .into_iter()
        .inspect(|p| {
            if p.match_score < threshold {
                debug!(
                    "  Below threshold ({:.3} < {threshold:.3}): {}",
                    p.match_score, p.posting.title
                );
            }
        })
        .filter(|p| p.match_score >= threshold)
        .collect();

    let total = qualifying.len();
    qualifying.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if total > MAX_MATCHES_PER_CYCLE as usize {
        info!(
            "  Returning top {MAX_MATCHES_PER_CYCLE} matches ({} qualifying dropped by cap)",
            total - MAX_MATCHES_PER_CYCLE as usize
        );
        qualifying.truncate(MAX_MATCHES_PER_CYCLE as usize);
    }

    RankOutcome {
        top: qualifying,
        qualifying: total,
    }
}
