//! Resume context for one pipeline run. Text extraction happens upstream;
//! the pipeline receives the full text plus a flat keyword set and treats
//! both as read-only.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::embed::Embedder;

/// Matches PascalCase/CamelCase terms and all-caps acronyms, the tokens
/// most likely to be technology names in experience prose.
fn tech_term_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][a-z]+(?:[A-Z][a-z]+)*\b|\b[A-Z]{2,}\b").expect("valid regex"))
}

/// Derives the flat resume keyword set: lower-cased skills plus
/// capitalized/acronym tokens found in the experience text. First-seen
/// order is preserved; duplicates are dropped.
pub fn derive_keywords(skills: &[String], experience_text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for skill in skills {
        let skill = skill.trim().to_lowercase();
        if skill.len() > 2 && seen.insert(skill.clone()) {
            keywords.push(skill);
        }
    }

    for term in tech_term_regex().find_iter(experience_text) {
        let term = term.as_str().to_lowercase();
        if seen.insert(term.clone()) {
            keywords.push(term);
        }
    }

    keywords
}

/// Per-run scoring context: resume text, keyword set, and a lazily computed
/// resume embedding. The embedding is computed at most once per run via a
/// presence-checked cell, never once per posting.
pub struct ResumeContext {
    pub full_text: String,
    pub keywords: Vec<String>,
    embedding: OnceCell<Option<Vec<f32>>>,
}

impl ResumeContext {
    pub fn new(full_text: String, keywords: Vec<String>) -> Self {
        Self {
            full_text,
            keywords,
            embedding: OnceCell::new(),
        }
    }

    /// Returns the cached resume embedding, computing it on first use.
    /// An embedding-service failure is cached as `None` for the rest of the
    /// run: semantic similarity degrades to zero, the run continues.
    pub async fn embedding(&self, embedder: &dyn Embedder) -> Option<&[f32]> {
        self.embedding
            .get_or_init(|| async {
                info!("Generating resume embedding...");
                match embedder.embed(&self.full_text).await {
                    Ok(vector) => Some(vector),
                    Err(e) => {
                        warn!("Resume embedding failed, semantic scores degrade to 0: {e}");
                        None
                    }
                }
            })
            .await
            .as_deref()
    }
}
