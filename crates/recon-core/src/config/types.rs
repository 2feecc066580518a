use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub qdrant: QdrantConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QdrantConfig {
    /// gRPC endpoint.
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    #[serde(default = "default_qdrant_timeout")]
    pub timeout_secs: u64,
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

fn default_qdrant_timeout() -> u64 {
    10
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            timeout_secs: default_qdrant_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embed_url")]
    pub url: String,
    #[serde(default = "default_embed_dimension")]
    pub dimension: usize,
    /// Request timeout for ingestion batches.
    #[serde(default = "default_embed_timeout")]
    pub timeout_secs: u64,
    /// Request timeout for single query embeddings.
    #[serde(default = "default_embed_query_timeout")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_embed_cache_size")]
    pub cache_size: usize,
}

fn default_embed_url() -> String {
    "http://localhost:8081/embed".into()
}

fn default_embed_dimension() -> usize {
    384
}

fn default_embed_timeout() -> u64 {
    60
}

fn default_embed_query_timeout() -> u64 {
    30
}

fn default_embed_cache_size() -> usize {
    1000
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embed_url(),
            dimension: default_embed_dimension(),
            timeout_secs: default_embed_timeout(),
            query_timeout_secs: default_embed_query_timeout(),
            cache_size: default_embed_cache_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_url")]
    pub url: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f32,
}

fn default_llm_url() -> String {
    "http://localhost:8080".into()
}

fn default_llm_timeout() -> u64 {
    90
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.1
}

fn default_repeat_penalty() -> f32 {
    1.1
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            timeout_secs: default_llm_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            repeat_penalty: default_repeat_penalty(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,
    #[serde(default = "default_true")]
    pub prune_stale: bool,
}

fn default_collection() -> String {
    "sovereignty-arch".into()
}

fn default_chunk_size() -> usize {
    400
}

fn default_overlap() -> usize {
    60
}

fn default_batch_size() -> usize {
    32
}

fn default_max_file_size() -> u64 {
    2_000_000
}

fn default_min_content_chars() -> usize {
    10
}

fn default_extensions() -> Vec<String> {
    recon_index::discovery::DEFAULT_EXTENSIONS
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

fn default_ignored_dirs() -> Vec<String> {
    recon_index::discovery::DEFAULT_IGNORED_DIRS
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

fn default_true() -> bool {
    true
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            batch_size: default_batch_size(),
            max_file_size: default_max_file_size(),
            min_content_chars: default_min_content_chars(),
            extensions: default_extensions(),
            ignored_dirs: default_ignored_dirs(),
            prune_stale: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Character budget of the assembled context block.
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,
    #[serde(default = "default_k")]
    pub default_k: usize,
    #[serde(default = "default_max_k")]
    pub max_k: usize,
}

fn default_max_context_length() -> usize {
    4000
}

fn default_relevance_threshold() -> f32 {
    0.7
}

fn default_k() -> usize {
    8
}

fn default_max_k() -> usize {
    20
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_context_length: default_max_context_length(),
            relevance_threshold: default_relevance_threshold(),
            default_k: default_k(),
            max_k: default_max_k(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_body")]
    pub max_body_size: usize,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    7000
}

fn default_max_body() -> usize {
    1_048_576
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_body_size: default_max_body(),
        }
    }
}
