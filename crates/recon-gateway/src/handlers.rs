use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use recon_core::{PROMETHEUS_CONTENT_TYPE, QueryError, QueryRequest};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::server::AppState;

#[derive(serde::Serialize)]
struct ErrorBody {
    detail: String,
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
        .into_response()
}

pub(crate) async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "service": "RECON RAG API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Strategic Khaos Repository Analysis via RAG",
        "endpoints": {
            "query": "/query",
            "health": "/health",
            "collections": "/collections",
            "metrics": "/metrics"
        }
    }))
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.health().await)
}

pub(crate) async fn query_handler(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };

    // Dropping the handler future on client disconnect cancels the token.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.service.query(request, &cancel).await {
        Ok(response) => Json(response).into_response(),
        Err(QueryError::InvalidRequest(detail)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, detail)
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub(crate) async fn collections_handler(State(state): State<AppState>) -> Response {
    match state.service.collections().await {
        Ok(collections) => Json(json!({ "collections": collections })).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.service.metrics().render(),
    )
}
