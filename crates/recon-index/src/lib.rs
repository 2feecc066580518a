//! Repository ingestion: file discovery, word-window chunking, deterministic
//! chunk identity, and batched embedding + upsert into a vector store.

pub mod chunker;
pub mod discovery;
pub mod error;
pub mod identity;
pub mod loader;
pub mod pipeline;

pub use chunker::{Chunker, ChunkerConfig};
pub use discovery::{DiscoveryConfig, FileDiscoverer};
pub use error::{IndexError, Result};
pub use loader::LoaderConfig;
pub use pipeline::{IngestConfig, IngestReport, IngestionPipeline, PATH_PREFIXES_FIELD};
