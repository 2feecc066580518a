#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Request-level failures of the query path. Generation failures never
/// surface here; they degrade to a missing answer.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("query embedding failed: {0}")]
    Embedding(#[from] recon_llm::LlmError),

    #[error("vector search failed: {0}")]
    Search(#[from] recon_store::VectorStoreError),

    #[error("request cancelled")]
    Cancelled,
}
