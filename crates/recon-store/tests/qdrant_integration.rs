use std::collections::HashMap;
use std::time::Duration;

use recon_store::{
    DistanceMetric, QdrantOps, VectorFilter, VectorPoint, VectorStore, VectorStoreError,
};
use testcontainers::ContainerAsync;
use testcontainers::GenericImage;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;

const QDRANT_GRPC_PORT: ContainerPort = ContainerPort::Tcp(6334);

fn qdrant_image() -> GenericImage {
    GenericImage::new("qdrant/qdrant", "v1.16.0")
        .with_wait_for(WaitFor::message_on_stdout("gRPC listening"))
        .with_exposed_port(QDRANT_GRPC_PORT)
}

async fn setup() -> (QdrantOps, ContainerAsync<GenericImage>) {
    let container = qdrant_image().start().await.unwrap();
    let grpc_port = container.get_host_port_ipv4(6334).await.unwrap();
    let url = format!("http://127.0.0.1:{grpc_port}");
    let ops = QdrantOps::new(&url, Duration::from_secs(10)).unwrap();
    (ops, container)
}

fn point(vector: Vec<f32>, path: &str, prefixes: &[&str]) -> VectorPoint {
    VectorPoint {
        id: uuid::Uuid::new_v4().to_string(),
        vector,
        payload: HashMap::from([
            ("path".into(), serde_json::json!(path)),
            ("path_prefixes".into(), serde_json::json!(prefixes)),
            ("text".into(), serde_json::json!(format!("contents of {path}"))),
        ]),
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn ensure_collection_is_idempotent_and_checks_size() {
    let (ops, _container) = setup().await;

    ops.ensure_collection("repo", 4, DistanceMetric::Cosine)
        .await
        .unwrap();
    ops.ensure_collection("repo", 4, DistanceMetric::Cosine)
        .await
        .unwrap();

    let err = VectorStore::ensure_collection(&ops, "repo", 8, DistanceMetric::Cosine)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VectorStoreError::CollectionConfigMismatch {
            expected: 8,
            actual: 4,
            ..
        }
    ));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn upsert_search_filter_and_prune() {
    let (ops, _container) = setup().await;
    let store: &dyn VectorStore = &ops;

    store
        .ensure_collection("repo", 4, DistanceMetric::Cosine)
        .await
        .unwrap();
    store.create_keyword_index("repo", "path").await.unwrap();
    store
        .create_keyword_index("repo", "path_prefixes")
        .await
        .unwrap();

    let keep = point(vec![1.0, 0.0, 0.0, 0.0], "src/a.rs", &["src", "src/a.rs"]);
    let stale = point(vec![0.9, 0.1, 0.0, 0.0], "src/a.rs", &["src", "src/a.rs"]);
    let other = point(vec![0.0, 1.0, 0.0, 0.0], "docs/b.md", &["docs", "docs/b.md"]);
    let keep_id = keep.id.clone();
    store
        .upsert("repo", vec![keep, stale, other])
        .await
        .unwrap();

    let all = store
        .search("repo", vec![1.0, 0.0, 0.0, 0.0], 10, Some(0.5), None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!(all[0].score >= all[1].score);

    let docs = store
        .search(
            "repo",
            vec![1.0, 0.0, 0.0, 0.0],
            10,
            None,
            Some(VectorFilter::must("path_prefixes", "docs")),
        )
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].payload["path"], serde_json::json!("docs/b.md"));

    store
        .delete_stale("repo", "src/a.rs", vec![keep_id.clone()])
        .await
        .unwrap();
    let info = store.collection_info("repo").await.unwrap().unwrap();
    assert_eq!(info.vectors_count, 2);

    let listed = store.list_collections().await.unwrap();
    assert!(listed.iter().any(|c| c.name == "repo"));
    store.health().await.unwrap();
}

#[tokio::test]
#[ignore = "requires docker"]
async fn missing_collection_has_no_info() {
    let (ops, _container) = setup().await;
    let store: &dyn VectorStore = &ops;
    assert!(store.collection_info("nope").await.unwrap().is_none());
}
