use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::vector_store::{
    BoxFuture, CollectionInfo, CollectionSummary, DistanceMetric, ScoredVectorPoint, VectorFilter,
    VectorPoint, VectorStore, VectorStoreError,
};

struct StoredPoint {
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
    /// Insertion order, used to keep ties stable.
    seq: u64,
}

struct InMemoryCollection {
    vector_size: u64,
    distance: DistanceMetric,
    points: HashMap<String, StoredPoint>,
    next_seq: u64,
}

/// Process-local vector store with exact scoring, for tests and local runs.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Number of points stored in `collection` (0 if missing).
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .ok()
            .and_then(|cols| cols.get(collection).map(|c| c.points.len()))
            .unwrap_or(0)
    }

    /// Ids stored in `collection`, sorted.
    #[must_use]
    pub fn ids(&self, collection: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .collections
            .read()
            .ok()
            .and_then(|cols| cols.get(collection).map(|c| c.points.keys().cloned().collect()))
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore")
            .finish_non_exhaustive()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn score(distance: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        DistanceMetric::Euclid => {
            -a.iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt()
        }
    }
}

fn matches_filter(payload: &HashMap<String, serde_json::Value>, filter: &VectorFilter) -> bool {
    filter.must.iter().all(|cond| {
        payload
            .get(&cond.field)
            .is_some_and(|val| keyword_matches(val, &cond.value))
    })
}

fn keyword_matches(val: &serde_json::Value, expected: &str) -> bool {
    match val.as_array() {
        Some(items) => items.iter().any(|item| item.as_str() == Some(expected)),
        None => val.as_str() == Some(expected),
    }
}

fn lock_err(e: impl std::fmt::Display) -> String {
    format!("lock poisoned: {e}")
}

impl VectorStore for InMemoryVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
        distance: DistanceMetric,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Collection(lock_err(e)))?;
            if let Some(existing) = cols.get(&collection) {
                if existing.vector_size != vector_size {
                    return Err(VectorStoreError::CollectionConfigMismatch {
                        collection,
                        expected: vector_size,
                        actual: existing.vector_size,
                    });
                }
                return Ok(());
            }
            cols.insert(
                collection,
                InMemoryCollection {
                    vector_size,
                    distance,
                    points: HashMap::new(),
                    next_seq: 0,
                },
            );
            Ok(())
        })
    }

    fn create_keyword_index(
        &self,
        _collection: &str,
        _field: &str,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        Box::pin(async { Ok(()) })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Upsert(lock_err(e)))?;
            let col = cols.get_mut(&collection).ok_or_else(|| {
                VectorStoreError::Upsert(format!("collection {collection} not found"))
            })?;
            if let Some(bad) = points
                .iter()
                .find(|p| p.vector.len() as u64 != col.vector_size)
            {
                return Err(VectorStoreError::Upsert(format!(
                    "point {} has dimension {}, collection expects {}",
                    bad.id,
                    bad.vector.len(),
                    col.vector_size
                )));
            }
            for p in points {
                let seq = match col.points.get(&p.id) {
                    Some(existing) => existing.seq,
                    None => {
                        col.next_seq += 1;
                        col.next_seq
                    }
                };
                col.points.insert(
                    p.id,
                    StoredPoint {
                        vector: p.vector,
                        payload: p.payload,
                        seq,
                    },
                );
            }
            Ok(())
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: Option<f32>,
        filter: Option<VectorFilter>,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Search(lock_err(e)))?;
            let col = cols.get(&collection).ok_or_else(|| {
                VectorStoreError::Search(format!("collection {collection} not found"))
            })?;
            if vector.len() as u64 != col.vector_size {
                return Err(VectorStoreError::Search(format!(
                    "query has dimension {}, collection expects {}",
                    vector.len(),
                    col.vector_size
                )));
            }

            let empty_filter = VectorFilter::default();
            let f = filter.as_ref().unwrap_or(&empty_filter);

            let mut scored: Vec<(u64, ScoredVectorPoint)> = col
                .points
                .iter()
                .filter(|(_, sp)| matches_filter(&sp.payload, f))
                .map(|(id, sp)| {
                    (
                        sp.seq,
                        ScoredVectorPoint {
                            id: id.clone(),
                            score: score(col.distance, &vector, &sp.vector),
                            payload: sp.payload.clone(),
                        },
                    )
                })
                .filter(|(_, p)| score_threshold.is_none_or(|t| p.score >= t))
                .collect();

            scored.sort_by(|(seq_a, a), (seq_b, b)| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(seq_a.cmp(seq_b))
            });
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            Ok(scored.into_iter().take(limit).map(|(_, p)| p).collect())
        })
    }

    fn delete_stale(
        &self,
        collection: &str,
        path: &str,
        keep_ids: Vec<String>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        let path = path.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Delete(lock_err(e)))?;
            let col = cols.get_mut(&collection).ok_or_else(|| {
                VectorStoreError::Delete(format!("collection {collection} not found"))
            })?;
            let keep: HashSet<String> = keep_ids.into_iter().collect();
            col.points.retain(|id, sp| {
                keep.contains(id)
                    || sp.payload.get("path").and_then(|v| v.as_str()) != Some(path.as_str())
            });
            Ok(())
        })
    }

    fn list_collections(&self) -> BoxFuture<'_, Result<Vec<CollectionSummary>, VectorStoreError>> {
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Collection(lock_err(e)))?;
            let mut out: Vec<CollectionSummary> = cols
                .iter()
                .map(|(name, c)| CollectionSummary {
                    name: name.clone(),
                    vectors_count: c.points.len() as u64,
                })
                .collect();
            out.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(out)
        })
    }

    fn collection_info(
        &self,
        collection: &str,
    ) -> BoxFuture<'_, Result<Option<CollectionInfo>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Collection(lock_err(e)))?;
            Ok(cols.get(&collection).map(|c| CollectionInfo {
                vectors_count: c.points.len() as u64,
                status: "green".into(),
                vector_size: Some(c.vector_size),
            }))
        })
    }

    fn health(&self) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        Box::pin(async move {
            self.collections
                .read()
                .map(|_| ())
                .map_err(|e| VectorStoreError::Connection(lock_err(e)))
        })
    }
}
