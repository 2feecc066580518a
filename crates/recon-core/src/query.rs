//! Per-request retrieval: embed the query, search, assemble context and
//! optionally generate a grounded answer.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use recon_index::PATH_PREFIXES_FIELD;
use recon_index::identity::normalize_prefix;
use recon_llm::{CompletionProvider, EmbeddingProvider};
use recon_store::{CollectionSummary, VectorFilter, VectorStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::cache::EmbeddingCache;
use crate::config::{Config, RetrievalConfig};
use crate::error::QueryError;
use crate::health::HealthReport;
use crate::metrics::{MetricsCollector, Operation, QueryMetricsSnapshot, QueryStatus};
use crate::prompt::{ContextResult, assemble_context, build_prompt};

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    #[serde(alias = "query")]
    pub q: String,
    #[serde(default)]
    pub k: Option<usize>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub path_prefix: Option<String>,
    #[serde(default)]
    pub min_score: Option<f32>,
    #[serde(default = "default_include_llm")]
    pub include_llm: bool,
}

fn default_include_llm() -> bool {
    true
}

impl QueryRequest {
    #[must_use]
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            k: None,
            collection: None,
            path_prefix: None,
            min_score: None,
            include_llm: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: Option<String>,
    pub contexts: Vec<ContextResult>,
    pub total_contexts: usize,
    /// Seconds.
    pub processing_time: f64,
    pub timestamp: DateTime<Utc>,
    pub collection: String,
}

/// Request after defaults are applied and bounds checked.
#[derive(Debug, Clone, PartialEq)]
struct ResolvedQuery {
    text: String,
    k: usize,
    collection: String,
    prefix: Option<String>,
    min_score: f32,
    include_llm: bool,
}

#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub collection: String,
    pub retrieval: RetrievalConfig,
    pub cache_size: usize,
}

impl From<&Config> for QuerySettings {
    fn from(config: &Config) -> Self {
        Self {
            collection: config.index.collection.clone(),
            retrieval: config.retrieval.clone(),
            cache_size: config.embedding.cache_size,
        }
    }
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Service context shared by every request handler.
pub struct QueryService {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn CompletionProvider>,
    store: Arc<dyn VectorStore>,
    cache: EmbeddingCache,
    metrics: MetricsCollector,
    metrics_rx: watch::Receiver<QueryMetricsSnapshot>,
    settings: QuerySettings,
    started: Instant,
}

impl QueryService {
    #[must_use]
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn CompletionProvider>,
        store: Arc<dyn VectorStore>,
        settings: QuerySettings,
    ) -> Self {
        let (metrics, metrics_rx) = MetricsCollector::new();
        Self {
            embedder,
            generator,
            store,
            cache: EmbeddingCache::new(settings.cache_size),
            metrics,
            metrics_rx,
            settings,
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    #[must_use]
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    #[must_use]
    pub fn metrics(&self) -> QueryMetricsSnapshot {
        self.metrics_rx.borrow().clone()
    }

    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    fn resolve(&self, req: QueryRequest) -> Result<ResolvedQuery, QueryError> {
        let retrieval = &self.settings.retrieval;
        let text = req.q.trim();
        if text.is_empty() {
            return Err(QueryError::InvalidRequest("q must not be empty".into()));
        }

        let k = req.k.unwrap_or(retrieval.default_k);
        if k == 0 || k > retrieval.max_k {
            return Err(QueryError::InvalidRequest(format!(
                "k must be within 1..={}, got {k}",
                retrieval.max_k
            )));
        }

        let min_score = req.min_score.unwrap_or(retrieval.relevance_threshold);
        if !min_score.is_finite() {
            return Err(QueryError::InvalidRequest(
                "min_score must be a finite number".into(),
            ));
        }

        let collection = req
            .collection
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.settings.collection.clone());

        Ok(ResolvedQuery {
            text: text.to_owned(),
            k,
            collection,
            prefix: req.path_prefix.as_deref().and_then(normalize_prefix),
            min_score,
            include_llm: req.include_llm,
        })
    }

    /// Answer one query. Generation failures degrade to `answer: None`.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` for invalid input, embedding or search failures,
    /// or when `cancel` fires first.
    pub async fn query(
        &self,
        req: QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse, QueryError> {
        let started = Instant::now();
        let requested = req.collection.clone();

        let result = match self.resolve(req) {
            Ok(resolved) => self.run(resolved, cancel, started).await,
            Err(e) => Err(e),
        };

        self.metrics.observe(Operation::Total, started.elapsed());
        match &result {
            Ok(resp) => {
                self.metrics.record_query(&resp.collection, QueryStatus::Success);
                tracing::info!(
                    collection = %resp.collection,
                    contexts = resp.total_contexts,
                    answered = resp.answer.is_some(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "query served"
                );
            }
            Err(e) => {
                // Client-supplied names are unbounded; errors use the configured collection.
                self.metrics
                    .record_query(&self.settings.collection, QueryStatus::Error);
                tracing::error!(requested = ?requested, "query failed: {e}");
            }
        }
        result
    }

    async fn run(
        &self,
        req: ResolvedQuery,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<QueryResponse, QueryError> {
        let step = Instant::now();
        let vector = cancellable(cancel, self.embed_query(&req.text)).await??;
        self.metrics.observe(Operation::Embedding, step.elapsed());

        let step = Instant::now();
        let filter = req
            .prefix
            .as_ref()
            .map(|p| VectorFilter::must(PATH_PREFIXES_FIELD, p.as_str()));
        let hits = cancellable(
            cancel,
            self.store.search(
                &req.collection,
                vector,
                req.k as u64,
                Some(req.min_score),
                filter,
            ),
        )
        .await??;
        self.metrics.observe(Operation::Search, step.elapsed());

        let contexts: Vec<ContextResult> = hits
            .iter()
            .take(req.k)
            .map(|hit| ContextResult::from_payload(hit.score, &hit.payload))
            .collect();

        if !contexts.is_empty() {
            let avg = contexts.iter().map(|c| f64::from(c.score)).sum::<f64>()
                / contexts.len() as f64;
            self.metrics.set_context_relevance(avg);
        }

        let answer = if req.include_llm && !contexts.is_empty() {
            let step = Instant::now();
            let answer = cancellable(cancel, self.generate(&req.text, &contexts)).await?;
            self.metrics.observe(Operation::Llm, step.elapsed());
            answer
        } else {
            None
        };

        Ok(QueryResponse {
            query: req.text,
            answer,
            total_contexts: contexts.len(),
            contexts,
            processing_time: started.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
            collection: req.collection,
        })
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, QueryError> {
        if let Some(vector) = self.cache.get(text) {
            self.metrics.cache_hit();
            return Ok(vector);
        }
        let vector = self.embedder.embed(text).await?;
        self.cache.insert(text, vector.clone());
        Ok(vector)
    }

    async fn generate(&self, query: &str, contexts: &[ContextResult]) -> Option<String> {
        let context_text = assemble_context(contexts, self.settings.retrieval.max_context_length);
        let prompt = build_prompt(query, &context_text);
        match self.generator.complete(&prompt).await {
            Ok(answer) => Some(answer),
            Err(e) => {
                tracing::warn!("generation failed, answering without LLM: {e}");
                None
            }
        }
    }

    /// Probe every dependency concurrently. Never fails.
    pub async fn health(&self) -> HealthReport {
        let collection = &self.settings.collection;
        let (store, embedder, llm) = tokio::join!(
            self.store.health(),
            self.embedder.health(),
            self.generator.health()
        );

        if let Err(e) = &store {
            tracing::warn!("vector store health check failed: {e}");
        }
        let embedder_ok = match embedder {
            Ok(h) => h.is_healthy(),
            Err(e) => {
                tracing::warn!("embedder health check failed: {e}");
                false
            }
        };
        if let Err(e) = &llm {
            tracing::debug!("llm health check failed: {e}");
        }

        let mut report = HealthReport::new(store.is_ok(), embedder_ok, llm.is_ok());
        if store.is_ok() {
            match self.store.collection_info(collection).await {
                Ok(Some(info)) => {
                    report.collection_info =
                        serde_json::to_value(info).unwrap_or(Value::Null);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(collection = %collection, "collection info failed: {e}"),
            }
        }
        report.uptime = self.uptime().as_secs_f64();
        report
    }

    /// # Errors
    ///
    /// Returns `QueryError::Search` when the store cannot list collections.
    pub async fn collections(&self) -> Result<Vec<CollectionSummary>, QueryError> {
        Ok(self.store.list_collections().await?)
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, QueryError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(QueryError::Cancelled),
        out = fut => Ok(out),
    }
}
