//! Vector store gateway: collection management, batch upsert, thresholded
//! similarity search with payload filters, and per-file stale point pruning.

pub mod in_memory_store;
pub mod qdrant_ops;
pub mod vector_store;

pub use in_memory_store::InMemoryVectorStore;
pub use qdrant_ops::QdrantOps;
pub use vector_store::{
    BoxFuture, CollectionInfo, CollectionSummary, DistanceMetric, FieldCondition,
    ScoredVectorPoint, VectorFilter, VectorPoint, VectorStore, VectorStoreError,
};
