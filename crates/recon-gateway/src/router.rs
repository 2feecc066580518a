use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use recon_core::QueryService;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    collections_handler, health_handler, metrics_handler, query_handler, root_handler,
};
use super::server::AppState;

#[must_use]
pub fn build_router(service: Arc<QueryService>, max_body_size: usize) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/query", post(query_handler))
        .route("/collections", get(collections_handler))
        .route("/metrics", get(metrics_handler))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use recon_core::QuerySettings;
    use recon_llm::mock::{MockEmbedder, MockGenerator};
    use recon_store::{DistanceMetric, InMemoryVectorStore, VectorPoint, VectorStore};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    const DIM: usize = 16;

    async fn make_router(generator: MockGenerator) -> Router {
        let embedder = MockEmbedder::new(DIM);
        let store = Arc::new(InMemoryVectorStore::new());
        store
            .ensure_collection("sovereignty-arch", DIM as u64, DistanceMetric::Cosine)
            .await
            .unwrap();
        store
            .upsert(
                "sovereignty-arch",
                vec![VectorPoint {
                    id: "00000000-0000-0000-0000-000000000001".into(),
                    vector: embedder.vector_for("qdrant vector search"),
                    payload: [
                        ("path".to_owned(), json!("src/search.rs")),
                        ("chunk".to_owned(), json!(0)),
                        ("total_chunks".to_owned(), json!(1)),
                        ("text".to_owned(), json!("qdrant vector search")),
                    ]
                    .into(),
                }],
            )
            .await
            .unwrap();

        let service = QueryService::new(
            Arc::new(embedder),
            Arc::new(generator),
            store,
            QuerySettings::default(),
        );
        build_router(Arc::new(service), 1_048_576)
    }

    fn post_query(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn root_lists_endpoints() {
        let app = make_router(MockGenerator::default()).await;
        let resp = app.oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), 200);
        let json = json_body(resp).await;
        assert_eq!(json["service"], "RECON RAG API");
        assert_eq!(json["endpoints"]["query"], "/query");
    }

    #[tokio::test]
    async fn query_returns_contexts_and_answer() {
        let app = make_router(MockGenerator::with_response("it searches")).await;
        let resp = app
            .oneshot(post_query(&json!({"q": "qdrant vector search", "min_score": 0.5})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let json = json_body(resp).await;
        assert_eq!(json["total_contexts"], 1);
        assert_eq!(json["answer"], "it searches");
        assert_eq!(json["contexts"][0]["path"], "src/search.rs");
        assert_eq!(json["collection"], "sovereignty-arch");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn unreachable_threshold_has_no_answer() {
        let generator = MockGenerator::default();
        let app = make_router(generator.clone()).await;
        let resp = app
            .oneshot(post_query(&json!({"q": "x", "min_score": 2.0})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let json = json_body(resp).await;
        assert_eq!(json["total_contexts"], 0);
        assert!(json["answer"].is_null());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn k_out_of_range_is_unprocessable() {
        let app = make_router(MockGenerator::default()).await;
        let resp = app
            .oneshot(post_query(&json!({"q": "x", "k": 50})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 422);
        let json = json_body(resp).await;
        assert!(json["detail"].as_str().unwrap().contains("k must be within"));
    }

    #[tokio::test]
    async fn missing_query_text_is_rejected() {
        let app = make_router(MockGenerator::default()).await;
        let resp = app.oneshot(post_query(&json!({"k": 3}))).await.unwrap();
        assert_eq!(resp.status(), 422);
        assert!(json_body(resp).await["detail"].is_string());
    }

    #[tokio::test]
    async fn unknown_collection_is_internal_error() {
        let app = make_router(MockGenerator::default()).await;
        let resp = app
            .oneshot(post_query(&json!({"q": "x", "collection": "missing"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
        assert!(json_body(resp).await["detail"].is_string());
    }

    #[tokio::test]
    async fn health_reports_dependencies() {
        let app = make_router(MockGenerator::failing()).await;
        let resp = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(resp.status(), 200);
        let json = json_body(resp).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["llm_status"], "unhealthy");
        assert_eq!(json["collection_info"]["vectors_count"], 1);
    }

    #[tokio::test]
    async fn collections_listed() {
        let app = make_router(MockGenerator::default()).await;
        let resp = app.oneshot(get("/collections")).await.unwrap();
        assert_eq!(resp.status(), 200);
        let json = json_body(resp).await;
        assert_eq!(json["collections"][0]["name"], "sovereignty-arch");
        assert_eq!(json["collections"][0]["vectors_count"], 1);
    }

    #[tokio::test]
    async fn metrics_exposed_as_prometheus_text() {
        let app = make_router(MockGenerator::default()).await;
        app.clone()
            .oneshot(post_query(&json!({"q": "qdrant", "min_score": 0.0})))
            .await
            .unwrap();
        let resp = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(resp.status(), 200);
        let content_type = resp.headers()["content-type"].to_str().unwrap().to_owned();
        assert!(content_type.starts_with("text/plain; version=0.0.4"));
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains(
            "rag_queries_total{collection=\"sovereignty-arch\",status=\"success\"} 1"
        ));
        assert!(text.contains("rag_query_duration_seconds_count{operation=\"total\"} 1"));
    }

    #[tokio::test]
    async fn unknown_collections_do_not_grow_metric_series() {
        let app = make_router(MockGenerator::default()).await;
        for i in 0..10 {
            let resp = app
                .clone()
                .oneshot(post_query(&json!({"q": "x", "collection": format!("c{i}")})))
                .await
                .unwrap();
            assert_eq!(resp.status(), 500);
        }
        let resp = app.oneshot(get("/metrics")).await.unwrap();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        let error_series: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("rag_queries_total{") && l.contains("status=\"error\""))
            .collect();
        assert_eq!(
            error_series,
            ["rag_queries_total{collection=\"sovereignty-arch\",status=\"error\"} 10"]
        );
        assert!(!text.contains("collection=\"c0\""));
    }

    #[tokio::test]
    async fn body_size_limit() {
        let embedder = MockEmbedder::new(DIM);
        let service = QueryService::new(
            Arc::new(embedder),
            Arc::new(MockGenerator::default()),
            Arc::new(InMemoryVectorStore::new()),
            QuerySettings::default(),
        );
        let app = build_router(Arc::new(service), 64);
        let req = Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from(vec![b'a'; 128]))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 413);
    }
}
