use std::str::FromStr;

use super::Config;

/// Parse `key` into `target`, warning and keeping the old value when it does not parse.
fn parse_env<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(v) = std::env::var(key) {
        match v.trim().parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!("ignoring invalid {key} value: {v}"),
        }
    }
}

fn string_env(key: &str, target: &mut String) {
    if let Ok(v) = std::env::var(key)
        && !v.trim().is_empty()
    {
        *target = v.trim().to_owned();
    }
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        string_env("QDRANT_URL", &mut self.qdrant.url);
        parse_env("QDRANT_TIMEOUT", &mut self.qdrant.timeout_secs);

        string_env("EMBED_URL", &mut self.embedding.url);
        parse_env("EMBED_DIM", &mut self.embedding.dimension);
        parse_env("EMBED_TIMEOUT", &mut self.embedding.timeout_secs);
        parse_env("EMBED_QUERY_TIMEOUT", &mut self.embedding.query_timeout_secs);
        parse_env("EMBED_CACHE_SIZE", &mut self.embedding.cache_size);

        string_env("LLM_URL", &mut self.llm.url);
        parse_env("LLM_TIMEOUT", &mut self.llm.timeout_secs);
        parse_env("LLM_MAX_TOKENS", &mut self.llm.max_tokens);
        parse_env("LLM_TEMPERATURE", &mut self.llm.temperature);

        string_env("COLLECTION", &mut self.index.collection);
        parse_env("CHUNK_SIZE", &mut self.index.chunk_size);
        parse_env("OVERLAP", &mut self.index.overlap);
        parse_env("BATCH_SIZE", &mut self.index.batch_size);
        parse_env("MAX_FILE_SIZE", &mut self.index.max_file_size);
        parse_env("PRUNE_STALE", &mut self.index.prune_stale);

        parse_env("MAX_CONTEXT_LENGTH", &mut self.retrieval.max_context_length);
        parse_env("RELEVANCE_THRESHOLD", &mut self.retrieval.relevance_threshold);

        parse_env("RETRY_ATTEMPTS", &mut self.retry.max_attempts);
        parse_env("RETRY_BASE_DELAY_MS", &mut self.retry.base_delay_ms);

        string_env("RECON_BIND", &mut self.server.bind);
        parse_env("RECON_PORT", &mut self.server.port);
    }
}
