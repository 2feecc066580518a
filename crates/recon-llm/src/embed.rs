//! Client for the batch embedding service.
//!
//! Contract: `POST {url}` with `{"texts": [..]}` answers `{"embeddings": [[..], ..]}`
//! with one vector per text, in request order. `GET {base}/health` answers
//! `{"status": "healthy", "model": ".."}`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::http::{HEALTH_TIMEOUT, check_status, client_with_timeout};
use crate::provider::{BoxFuture, EmbeddingProvider};
use crate::retry::{RetryPolicy, with_retry};

const SERVICE: &str = "embedder";

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Health payload reported by the embedding service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmbedderHealth {
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl EmbedderHealth {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: reqwest::Client,
    health_client: reqwest::Client,
    url: String,
    health_url: String,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    #[must_use]
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let url = url.into();
        let health_url = health_url_for(&url);
        Self {
            client: client_with_timeout(timeout),
            health_client: client_with_timeout(HEALTH_TIMEOUT),
            url,
            health_url,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Embed `texts` in one request, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns `LlmError` on network failure, non-success status, or a response
    /// that does not carry exactly one well-formed vector per input.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        with_retry(SERVICE, &self.retry, || self.send_once(texts)).await
    }

    async fn send_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(&self.url)
            .json(&EmbedRequest { texts })
            .send()
            .await?;
        let response = check_status(SERVICE, response).await?;
        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse {
                service: SERVICE,
                reason: e.to_string(),
            })?;
        validate_embeddings(texts.len(), body.embeddings)
    }

    /// Probe the service health endpoint with a short timeout.
    ///
    /// # Errors
    ///
    /// Returns `LlmError` if the service is unreachable or answers with a
    /// non-success status or a malformed body.
    pub async fn check_health(&self) -> Result<EmbedderHealth> {
        let response = self.health_client.get(&self.health_url).send().await?;
        let response = check_status(SERVICE, response).await?;
        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse {
                service: SERVICE,
                reason: e.to_string(),
            })
    }
}

impl EmbeddingProvider for EmbeddingClient {
    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        Box::pin(self.embed_texts(texts))
    }

    fn health(&self) -> BoxFuture<'_, Result<EmbedderHealth>> {
        Box::pin(self.check_health())
    }
}

/// Derive the health URL from the embed URL: a trailing `/embed` path segment
/// is replaced by `/health`.
#[must_use]
pub fn health_url_for(embed_url: &str) -> String {
    let trimmed = embed_url.trim_end_matches('/');
    let base = trimmed.strip_suffix("/embed").unwrap_or(trimmed);
    format!("{base}/health")
}

/// Check the vector count, vector lengths and values of an embedding response.
///
/// # Errors
///
/// Returns `LlmError::InvalidResponse` describing the first violation found.
pub fn validate_embeddings(expected: usize, embeddings: Vec<Vec<f32>>) -> Result<Vec<Vec<f32>>> {
    let invalid = |reason: String| LlmError::InvalidResponse {
        service: SERVICE,
        reason,
    };

    if embeddings.len() != expected {
        return Err(invalid(format!(
            "expected {expected} vectors, got {}",
            embeddings.len()
        )));
    }
    let Some(dim) = embeddings.first().map(Vec::len) else {
        return Ok(embeddings);
    };
    if dim == 0 {
        return Err(invalid("empty vector".into()));
    }
    for (i, v) in embeddings.iter().enumerate() {
        if v.len() != dim {
            return Err(invalid(format!(
                "vector {i} has length {}, expected {dim}",
                v.len()
            )));
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(invalid(format!("vector {i} contains non-finite values")));
        }
    }
    Ok(embeddings)
}
