//! Client for a llama.cpp-style completion server (`POST {base}/completion`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::http::{HEALTH_TIMEOUT, check_status, client_with_timeout};
use crate::provider::{BoxFuture, CompletionProvider};
use crate::retry::{RetryPolicy, with_retry};

const SERVICE: &str = "llm";

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub repeat_penalty: f32,
    pub stop: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.1,
            repeat_penalty: 1.1,
            stop: vec!["Human:".into(), "Question:".into()],
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f32,
    stop: &'a [String],
    repeat_penalty: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    health_client: reqwest::Client,
    base_url: String,
    params: GenerationParams,
    retry: RetryPolicy,
}

impl CompletionClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: client_with_timeout(timeout),
            health_client: client_with_timeout(HEALTH_TIMEOUT),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            params: GenerationParams::default(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Generate text for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::EmptyResponse` when the model produced only
    /// whitespace, or the underlying HTTP/status error.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        with_retry(SERVICE, &self.retry, || self.send_once(prompt)).await
    }

    async fn send_once(&self, prompt: &str) -> Result<String> {
        let body = CompletionRequest {
            prompt,
            n_predict: self.params.max_tokens,
            temperature: self.params.temperature,
            stop: &self.params.stop,
            repeat_penalty: self.params.repeat_penalty,
        };
        let response = self
            .client
            .post(format!("{}/completion", self.base_url))
            .json(&body)
            .send()
            .await?;
        let response = check_status(SERVICE, response).await?;
        let parsed: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    service: SERVICE,
                    reason: e.to_string(),
                })?;

        let content = parsed.content.trim();
        if content.is_empty() {
            return Err(LlmError::EmptyResponse { service: SERVICE });
        }
        Ok(content.to_owned())
    }

    /// # Errors
    ///
    /// Returns `LlmError` if `GET {base}/health` fails or answers non-2xx.
    pub async fn check_health(&self) -> Result<()> {
        let response = self
            .health_client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        check_status(SERVICE, response).await?;
        Ok(())
    }
}

impl CompletionProvider for CompletionClient {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.generate(prompt))
    }

    fn health(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.check_health())
    }
}
