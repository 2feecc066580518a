//! Construction of the long-lived service objects from a validated [`Config`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use recon_index::IngestionPipeline;
use recon_llm::{CompletionClient, EmbeddingClient, RetryPolicy};
use recon_store::{QdrantOps, VectorStore};

use crate::config::Config;
use crate::query::{QueryService, QuerySettings};

/// Connect to Qdrant. The gRPC channel is lazy, so this does not probe the server.
///
/// # Errors
///
/// Returns an error if the client cannot be built from the configured URL.
pub fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    let ops = QdrantOps::new(
        &config.qdrant.url,
        Duration::from_secs(config.qdrant.timeout_secs),
    )
    .with_context(|| format!("failed to create Qdrant client for {}", config.qdrant.url))?;
    Ok(Arc::new(ops))
}

/// Embedding client with the ingestion (batch) timeout.
#[must_use]
pub fn ingest_embedder(config: &Config) -> EmbeddingClient {
    EmbeddingClient::new(
        &config.embedding.url,
        Duration::from_secs(config.embedding.timeout_secs),
    )
    .with_retry(config.retry_policy())
}

/// Embedding client with the shorter single-query timeout.
#[must_use]
pub fn query_embedder(config: &Config) -> EmbeddingClient {
    EmbeddingClient::new(
        &config.embedding.url,
        Duration::from_secs(config.embedding.query_timeout_secs),
    )
    .with_retry(config.retry_policy())
}

/// Completion client for the query path: one attempt bounded by `llm.timeout_secs`,
/// after which the query answers without generation.
#[must_use]
pub fn completion_client(config: &Config) -> CompletionClient {
    CompletionClient::new(&config.llm.url, Duration::from_secs(config.llm.timeout_secs))
        .with_params(config.generation_params())
        .with_retry(RetryPolicy::none())
}

/// # Errors
///
/// Returns an error for invalid configuration or an unusable Qdrant URL.
pub fn build_ingestion_pipeline(config: &Config) -> anyhow::Result<IngestionPipeline> {
    config.validate()?;
    let store = connect_store(config)?;
    IngestionPipeline::new(
        Arc::new(ingest_embedder(config)),
        store,
        config.ingest_config(),
    )
    .context("invalid ingestion settings")
}

/// # Errors
///
/// Returns an error for invalid configuration or an unusable Qdrant URL.
pub fn build_query_service(config: &Config) -> anyhow::Result<QueryService> {
    config.validate()?;
    let store = connect_store(config)?;
    Ok(QueryService::new(
        Arc::new(query_embedder(config)),
        Arc::new(completion_client(config)),
        store,
        QuerySettings::from(config),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_is_rejected_before_connecting() {
        let mut config = Config::default();
        config.index.overlap = config.index.chunk_size;
        let err = build_ingestion_pipeline(&config).err().unwrap();
        assert!(err.to_string().contains("index.overlap"));
        assert!(build_query_service(&config).is_err());
    }

    #[test]
    fn embedders_use_configured_url() {
        let mut config = Config::default();
        config.embedding.url = "http://embedder:9000/embed".into();
        assert_eq!(ingest_embedder(&config).url(), "http://embedder:9000/embed");
        assert_eq!(query_embedder(&config).url(), "http://embedder:9000/embed");
    }

    #[test]
    fn generation_is_single_attempt_regardless_of_retry_config() {
        let mut config = Config::default();
        config.retry.max_attempts = 5;
        let client = completion_client(&config);
        assert_eq!(client.retry().max_attempts, 1);
        assert_eq!(config.retry_policy().max_attempts, 5);
    }

    #[tokio::test]
    async fn default_config_builds_services() {
        let config = Config::default();
        assert!(build_ingestion_pipeline(&config).is_ok());
        let service = build_query_service(&config).unwrap();
        assert_eq!(service.settings().collection, "sovereignty-arch");
    }
}
