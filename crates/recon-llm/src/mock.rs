//! Deterministic test doubles for the embedding and completion services.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::embed::EmbedderHealth;
use crate::error::{LlmError, Result};
use crate::provider::{BoxFuture, CompletionProvider, EmbeddingProvider};

/// Bag-of-words embedder: each lowercase token is hashed into one of
/// `dimension` buckets and the resulting vector is L2-normalized. Texts that
/// share words end up with positive cosine similarity.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    pub dimension: usize,
    pub healthy: bool,
    /// Zero-based call indices that fail with a 503.
    fail_on: Arc<Mutex<HashSet<usize>>>,
    calls: Arc<AtomicUsize>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl MockEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            healthy: true,
            fail_on: Arc::new(Mutex::new(HashSet::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn failing_calls(self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.fail_on.lock().unwrap().extend(indices);
        self
    }

    #[must_use]
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return v;
        }
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bucket = usize::try_from(hasher.finish() % self.dimension as u64).unwrap_or(0);
            v[bucket] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            v[0] = 1.0;
        } else {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl EmbeddingProvider for MockEmbedder {
    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.lock().unwrap().contains(&call) {
                return Err(LlmError::Status {
                    service: "embedder",
                    status: 503,
                    body: "mock failure".into(),
                });
            }
            Ok(texts.iter().map(|t| self.vector_for(t)).collect())
        })
    }

    fn health(&self) -> BoxFuture<'_, Result<EmbedderHealth>> {
        Box::pin(async move {
            if self.healthy {
                Ok(EmbedderHealth {
                    status: "healthy".into(),
                    model: Some("mock".into()),
                })
            } else {
                Err(LlmError::Other("mock embedder down".into()))
            }
        })
    }
}

/// Completion double that records prompts and returns a canned answer.
#[derive(Debug, Clone)]
pub struct MockGenerator {
    pub response: String,
    pub fail: bool,
    pub healthy: bool,
    calls: Arc<AtomicUsize>,
    last_prompt: Arc<Mutex<Option<String>>>,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self {
            response: "mock answer".into(),
            fail: false,
            healthy: true,
            calls: Arc::new(AtomicUsize::new(0)),
            last_prompt: Arc::new(Mutex::new(None)),
        }
    }
}

impl MockGenerator {
    #[must_use]
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            healthy: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

impl CompletionProvider for MockGenerator {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_owned());
            if self.fail {
                return Err(LlmError::Other("mock LLM error".into()));
            }
            Ok(self.response.clone())
        })
    }

    fn health(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.healthy {
                Ok(())
            } else {
                Err(LlmError::Other("mock LLM down".into()))
            }
        })
    }
}
