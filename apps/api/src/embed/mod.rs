/// Embedding client — the single point of entry for all Gemini embedding
/// calls. One call per posting per run is the dominant external cost of the
/// pipeline, which is why deduplication runs before scoring.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Embedding response contained no vector")]
    EmptyEmbedding,
}

/// Text-embedding capability. Held in `AppState` as `Arc<dyn Embedder>` so
/// tests can substitute a deterministic implementation.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    content: ContentPayload<'a>,
    #[serde(rename = "taskType")]
    task_type: &'a str,
}

#[derive(Debug, Serialize)]
struct ContentPayload<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Gemini embedContent client with retry on rate limits and server errors.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{GEMINI_API_BASE}/{}:embedContent?key={}",
            self.model, self.api_key
        )
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let request_body = EmbedContentRequest {
            content: ContentPayload {
                parts: vec![TextPart { text }],
            },
            task_type: "RETRIEVAL_DOCUMENT",
        };

        let mut attempt = 0u32;
        loop {
            let response = self
                .client
                .post(self.endpoint())
                .json(&request_body)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                let parsed: EmbedContentResponse = response.json().await?;
                if parsed.embedding.values.is_empty() {
                    return Err(EmbedError::EmptyEmbedding);
                }
                debug!(
                    "Embedded {} chars into {} dimensions",
                    text.len(),
                    parsed.embedding.values.len()
                );
                return Ok(parsed.embedding.values);
            }

            if (status.as_u16() == 429 || status.is_server_error()) && attempt < MAX_RETRIES {
                attempt += 1;
                let backoff = std::time::Duration::from_secs(2u64.pow(attempt));
                warn!(
                    "Gemini embedContent returned {status}, retrying in {}s (attempt {attempt}/{MAX_RETRIES})",
                    backoff.as_secs()
                );
                tokio::time::sleep(backoff).await;
                continue;
            }

            if status.as_u16() == 429 {
                return Err(EmbedError::RateLimited {
                    retries: MAX_RETRIES,
                });
            }

            let message = response.text().await.unwrap_or_default();
            return Err(EmbedError::Api {
                status: status.as_u16(),
                message,
            });
        }
    }
}

/// Cosine similarity between two vectors. Returns 0.0 for mismatched
/// lengths or zero-magnitude inputs rather than erroring.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Returns the same vector for every input.
    pub struct FixedEmbedder(pub Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Ok(self.0.clone())
        }
    }

    /// Fails every call, for exercising the degrade-to-zero path.
    pub struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Err(EmbedError::Api {
                status: 500,
                message: "boom".to_string(),
            })
        }
    }
}
