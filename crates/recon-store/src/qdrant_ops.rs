//! Qdrant backend for [`VectorStore`](crate::VectorStore) over gRPC.

use std::collections::HashMap;
use std::time::Duration;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CollectionStatus, Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
    DeletePointsBuilder, Distance, FieldType, Filter, PointStruct, ScoredPoint,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder, point_id::PointIdOptions,
    value::Kind, vectors_config,
};

use crate::vector_store::{
    BoxFuture, CollectionInfo, CollectionSummary, DistanceMetric, ScoredVectorPoint, VectorFilter,
    VectorPoint, VectorStore, VectorStoreError,
};

type QdrantResult<T> = Result<T, Box<qdrant_client::QdrantError>>;

/// Thin wrapper over [`Qdrant`] client encapsulating the collection operations Recon needs.
#[derive(Clone)]
pub struct QdrantOps {
    client: Qdrant,
}

impl std::fmt::Debug for QdrantOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantOps").finish_non_exhaustive()
    }
}

impl QdrantOps {
    /// Create a new `QdrantOps` for the given gRPC URL and request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn new(url: &str, timeout: Duration) -> QdrantResult<Self> {
        let client = Qdrant::from_url(url)
            .timeout(timeout)
            .build()
            .map_err(Box::new)?;
        Ok(Self { client })
    }

    /// Ensure a collection exists with the given vector size and distance.
    ///
    /// # Errors
    ///
    /// Returns an error if Qdrant cannot be reached, creation fails, or the
    /// existing collection's vector size differs.
    pub async fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
        distance: DistanceMetric,
    ) -> Result<(), VectorStoreError> {
        let exists = self
            .client
            .collection_exists(collection)
            .await
            .map_err(|e| VectorStoreError::Connection(e.to_string()))?;

        if exists {
            let info = self.info(collection).await?;
            if let Some(actual) = info.vector_size
                && actual != vector_size
            {
                return Err(VectorStoreError::CollectionConfigMismatch {
                    collection: collection.to_owned(),
                    expected: vector_size,
                    actual,
                });
            }
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(vector_size, to_qdrant(distance))),
            )
            .await
            .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
        tracing::info!(collection, vector_size, "created collection");
        Ok(())
    }

    async fn info(&self, collection: &str) -> Result<CollectionInfo, VectorStoreError> {
        let response = self
            .client
            .collection_info(collection)
            .await
            .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
        let result = response.result.ok_or_else(|| {
            VectorStoreError::Collection(format!("no info returned for {collection}"))
        })?;

        let status = CollectionStatus::try_from(result.status)
            .map_or_else(|_| "unknown".to_owned(), |s| s.as_str_name().to_lowercase());
        let vector_size = result
            .config
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|c| match c {
                vectors_config::Config::Params(params) => Some(params.size),
                vectors_config::Config::ParamsMap(_) => None,
            });

        Ok(CollectionInfo {
            vectors_count: result.points_count.unwrap_or(0),
            status,
            vector_size,
        })
    }

    async fn create_keyword_index(&self, collection: &str, field: &str) -> QdrantResult<()> {
        self.client
            .create_field_index(
                CreateFieldIndexCollectionBuilder::new(collection, field, FieldType::Keyword)
                    .wait(true),
            )
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<PointStruct>) -> QdrantResult<()> {
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: Option<f32>,
        filter: Option<Filter>,
    ) -> QdrantResult<Vec<ScoredPoint>> {
        let mut builder = SearchPointsBuilder::new(collection, vector, limit).with_payload(true);
        if let Some(threshold) = score_threshold {
            builder = builder.score_threshold(threshold);
        }
        if let Some(f) = filter {
            builder = builder.filter(f);
        }
        let results = self.client.search_points(builder).await.map_err(Box::new)?;
        Ok(results.result)
    }

    async fn delete_stale(
        &self,
        collection: &str,
        path: &str,
        keep_ids: Vec<String>,
    ) -> QdrantResult<()> {
        let mut filter = Filter {
            must: vec![Condition::matches("path", path.to_owned())],
            ..Filter::default()
        };
        if !keep_ids.is_empty() {
            filter.must_not = vec![Condition::has_id(keep_ids)];
        }
        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(filter).wait(true))
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionSummary>, VectorStoreError> {
        let response = self
            .client
            .list_collections()
            .await
            .map_err(|e| VectorStoreError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(response.collections.len());
        for description in response.collections {
            let vectors_count = match self.info(&description.name).await {
                Ok(info) => info.vectors_count,
                Err(e) => {
                    tracing::warn!(collection = %description.name, "collection info failed: {e}");
                    0
                }
            };
            out.push(CollectionSummary {
                name: description.name,
                vectors_count,
            });
        }
        Ok(out)
    }

    /// Convert a JSON payload map into Qdrant payload values.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if a value cannot be represented.
    pub fn json_to_payload(
        payload: HashMap<String, serde_json::Value>,
    ) -> Result<HashMap<String, qdrant_client::qdrant::Value>, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(payload.into_iter().collect()))
    }
}

impl VectorStore for QdrantOps {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
        distance: DistanceMetric,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.ensure_collection(&collection, vector_size, distance)
                .await
        })
    }

    fn create_keyword_index(
        &self,
        collection: &str,
        field: &str,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        let field = field.to_owned();
        Box::pin(async move {
            self.create_keyword_index(&collection, &field)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let qdrant_points = points
                .into_iter()
                .map(|p| {
                    let payload = Self::json_to_payload(p.payload)
                        .map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
                    Ok(PointStruct::new(p.id, p.vector, payload))
                })
                .collect::<Result<Vec<_>, VectorStoreError>>()?;
            self.upsert(&collection, qdrant_points)
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))
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
            let qdrant_filter = filter.map(vector_filter_to_qdrant);
            let results = self
                .search(&collection, vector, limit, score_threshold, qdrant_filter)
                .await
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            Ok(results.into_iter().map(scored_point_to_vector).collect())
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
            self.delete_stale(&collection, &path, keep_ids)
                .await
                .map_err(|e| VectorStoreError::Delete(e.to_string()))
        })
    }

    fn list_collections(&self) -> BoxFuture<'_, Result<Vec<CollectionSummary>, VectorStoreError>> {
        Box::pin(self.list_collections())
    }

    fn collection_info(
        &self,
        collection: &str,
    ) -> BoxFuture<'_, Result<Option<CollectionInfo>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let exists = self
                .client
                .collection_exists(&collection)
                .await
                .map_err(|e| VectorStoreError::Connection(e.to_string()))?;
            if !exists {
                return Ok(None);
            }
            self.info(&collection).await.map(Some)
        })
    }

    fn health(&self) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        Box::pin(async move {
            self.client
                .health_check()
                .await
                .map_err(|e| VectorStoreError::Connection(e.to_string()))?;
            Ok(())
        })
    }
}

fn to_qdrant(distance: DistanceMetric) -> Distance {
    match distance {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::Dot => Distance::Dot,
        DistanceMetric::Euclid => Distance::Euclid,
    }
}

fn vector_filter_to_qdrant(filter: VectorFilter) -> Filter {
    Filter::must(
        filter
            .must
            .into_iter()
            .map(|cond| Condition::matches(cond.field, cond.value)),
    )
}

fn value_to_json(value: qdrant_client::qdrant::Value) -> Option<serde_json::Value> {
    let json = match value.kind? {
        Kind::NullValue(_) => serde_json::Value::Null,
        Kind::StringValue(s) => serde_json::Value::String(s),
        Kind::IntegerValue(i) => serde_json::Value::Number(i.into()),
        Kind::DoubleValue(d) => serde_json::Number::from_f64(d).map(serde_json::Value::Number)?,
        Kind::BoolValue(b) => serde_json::Value::Bool(b),
        Kind::ListValue(list) => {
            serde_json::Value::Array(list.values.into_iter().filter_map(value_to_json).collect())
        }
        Kind::StructValue(s) => serde_json::Value::Object(
            s.fields
                .into_iter()
                .filter_map(|(k, v)| Some((k, value_to_json(v)?)))
                .collect(),
        ),
    };
    Some(json)
}

fn scored_point_to_vector(point: ScoredPoint) -> ScoredVectorPoint {
    let payload: HashMap<String, serde_json::Value> = point
        .payload
        .into_iter()
        .filter_map(|(k, v)| Some((k, value_to_json(v)?)))
        .collect();

    let id = match point.id.and_then(|pid| pid.point_id_options) {
        Some(PointIdOptions::Uuid(u)) => u,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    };

    ScoredVectorPoint {
        id,
        score: point.score,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_valid_url() {
        assert!(QdrantOps::new("http://localhost:6334", Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn new_invalid_url() {
        assert!(QdrantOps::new("not a valid url", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn debug_format_hides_client() {
        let ops = QdrantOps::new("http://localhost:6334", Duration::from_secs(5)).unwrap();
        assert!(format!("{ops:?}").contains("QdrantOps"));
    }

    #[test]
    fn payload_keeps_arrays() {
        let payload = HashMap::from([
            ("path".to_owned(), serde_json::json!("src/lib.rs")),
            ("path_prefixes".to_owned(), serde_json::json!(["src", "src/lib.rs"])),
            ("chunk".to_owned(), serde_json::json!(0)),
        ]);
        let converted = QdrantOps::json_to_payload(payload).unwrap();
        let back: HashMap<_, _> = converted
            .into_iter()
            .filter_map(|(k, v)| Some((k, value_to_json(v)?)))
            .collect();
        assert_eq!(back["path_prefixes"], serde_json::json!(["src", "src/lib.rs"]));
        assert_eq!(back["chunk"], serde_json::json!(0));
    }

    #[test]
    fn filter_conversion_maps_every_condition_to_must() {
        let filter = VectorFilter::must("path_prefixes", "src").and("extension", ".rs");
        let q = vector_filter_to_qdrant(filter);
        assert_eq!(q.must.len(), 2);
        assert!(q.must_not.is_empty());
        assert!(q.should.is_empty());
    }

    #[test]
    fn distance_mapping() {
        assert_eq!(to_qdrant(DistanceMetric::Cosine), Distance::Cosine);
        assert_eq!(to_qdrant(DistanceMetric::Euclid), Distance::Euclid);
    }
}
