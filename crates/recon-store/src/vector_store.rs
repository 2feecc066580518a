use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("collection error: {0}")]
    Collection(String),
    #[error(
        "collection {collection} has vector size {actual}, configured embedding dimension is {expected}"
    )]
    CollectionConfigMismatch {
        collection: String,
        expected: u64,
        actual: u64,
    },
    #[error("upsert error: {0}")]
    Upsert(String),
    #[error("search error: {0}")]
    Search(String),
    #[error("delete error: {0}")]
    Delete(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Similarity function a collection is created with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Dot,
    Euclid,
}

#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

/// Conjunction of keyword `must` conditions.
///
/// A condition on an array-valued payload field matches when any element equals the value.
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
    pub must: Vec<FieldCondition>,
}

impl VectorFilter {
    #[must_use]
    pub fn must(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::default().and(field, value)
    }

    #[must_use]
    pub fn and(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.must.push(FieldCondition {
            field: field.into(),
            value: value.into(),
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct FieldCondition {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ScoredVectorPoint {
    pub id: String,
    pub score: f32,
    pub payload: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub name: String,
    pub vectors_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub vectors_count: u64,
    pub status: String,
    #[serde(skip)]
    pub vector_size: Option<u64>,
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait VectorStore: Send + Sync {
    /// Create the collection if missing. An existing collection whose vector
    /// size differs from `vector_size` is rejected with
    /// [`VectorStoreError::CollectionConfigMismatch`].
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
        distance: DistanceMetric,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Create a keyword payload index on `field`. Idempotent.
    fn create_keyword_index(
        &self,
        collection: &str,
        field: &str,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Insert or replace points keyed by id.
    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// At most `limit` points with score `>= score_threshold`, best first.
    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: Option<f32>,
        filter: Option<VectorFilter>,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>>;

    /// Delete points whose `path` payload equals `path` and whose id is not in `keep_ids`.
    fn delete_stale(
        &self,
        collection: &str,
        path: &str,
        keep_ids: Vec<String>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    fn list_collections(&self) -> BoxFuture<'_, Result<Vec<CollectionSummary>, VectorStoreError>>;

    /// `None` when the collection does not exist.
    fn collection_info(
        &self,
        collection: &str,
    ) -> BoxFuture<'_, Result<Option<CollectionInfo>, VectorStoreError>>;

    fn health(&self) -> BoxFuture<'_, Result<(), VectorStoreError>>;
}
