//! Error types for recon-index.

use std::path::PathBuf;

/// Errors raised while discovering, reading, chunking or indexing a repository.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Unreadable, oversized, binary or near-empty file. The file is skipped.
    #[error("cannot read {path}: {reason}")]
    FileRead { path: String, reason: String },

    /// Invalid chunking or batching configuration. Fatal at startup.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Embedding service failure for one batch.
    #[error("embedding failed: {0}")]
    Embedding(#[from] recon_llm::LlmError),

    /// Vector store failure (collection setup is fatal, batch upserts are skipped).
    #[error("vector store error: {0}")]
    VectorStore(#[from] recon_store::VectorStoreError),

    #[error("repository path {} does not exist or is not a directory", .0.display())]
    RepositoryNotFound(PathBuf),

    /// The embedding model returned vectors of a different length than the collection.
    #[error("embedding dimension mismatch: collection expects {expected}, model returned {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
