mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use recon_index::{ChunkerConfig, DiscoveryConfig, IngestConfig, LoaderConfig};
use recon_llm::{GenerationParams, RetryPolicy};

use crate::error::ConfigError;

/// Default config location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/recon.toml";

/// Config path from `--config`, then `RECON_CONFIG`, then the default.
#[must_use]
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_owned();
    }
    if let Ok(path) = std::env::var("RECON_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Reject values that would make ingestion or querying misbehave.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: String| ConfigError::Invalid { field, reason };

        if self.index.chunk_size == 0 {
            return Err(invalid("index.chunk_size", "must be greater than 0".into()));
        }
        if self.index.overlap >= self.index.chunk_size {
            return Err(invalid(
                "index.overlap",
                format!(
                    "{} must be smaller than chunk_size {}",
                    self.index.overlap, self.index.chunk_size
                ),
            ));
        }
        if self.index.batch_size == 0 {
            return Err(invalid("index.batch_size", "must be greater than 0".into()));
        }
        if self.index.collection.trim().is_empty() {
            return Err(invalid("index.collection", "must not be empty".into()));
        }
        if self.embedding.dimension == 0 {
            return Err(invalid("embedding.dimension", "must be greater than 0".into()));
        }
        if self.retrieval.default_k == 0 || self.retrieval.default_k > self.retrieval.max_k {
            return Err(invalid(
                "retrieval.default_k",
                format!("must be within 1..={}", self.retrieval.max_k),
            ));
        }
        if !self.retrieval.relevance_threshold.is_finite() {
            return Err(invalid(
                "retrieval.relevance_threshold",
                "must be a finite number".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    #[must_use]
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
            repeat_penalty: self.llm.repeat_penalty,
            ..GenerationParams::default()
        }
    }

    #[must_use]
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            collection: self.index.collection.clone(),
            dimension: self.embedding.dimension,
            batch_size: self.index.batch_size,
            chunker: ChunkerConfig {
                chunk_size: self.index.chunk_size,
                overlap: self.index.overlap,
            },
            discovery: DiscoveryConfig::new(&self.index.extensions, &self.index.ignored_dirs),
            loader: LoaderConfig {
                max_file_size: self.index.max_file_size,
                min_content_chars: self.index.min_content_chars,
            },
            prune_stale: self.index.prune_stale,
        }
    }
}
