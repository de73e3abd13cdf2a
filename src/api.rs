//! HTTP surface.
//!
//! - `POST /api/v1/chat` — RAG query, 400 on blank query
//! - `GET  /api/v1/chat?query=...` — convenience variant with defaults
//! - `POST /api/v1/ingest?path=<abs>` — ingest a path, text count in body
//! - `POST /api/evaluation/run` — run the judge over one query
//! - `GET  /healthz` — liveness

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, info};

use crate::evaluation::RagEvaluator;
use crate::ingestion::IngestionService;
use crate::rag::{ChatRequest, RagService};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub rag_service: Arc<RagService>,
    pub ingestion_service: Arc<IngestionService>,
    pub evaluator: Arc<RagEvaluator>,
}

/// Build the router over the shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/chat", post(chat).get(chat_simple))
        .route("/api/v1/ingest", post(ingest))
        .route("/api/evaluation/run", post(run_evaluation))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if request.query.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "query must not be blank").into_response();
    }

    info!(query = %request.query, "Received chat request");
    let response = state.rag_service.chat(request).await;
    Json(response).into_response()
}

async fn chat_simple(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query = params.get("query").cloned().unwrap_or_default();
    if query.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "query must not be blank").into_response();
    }

    let response = state.rag_service.chat(ChatRequest::new(query)).await;
    Json(response).into_response()
}

async fn ingest(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(path) = params.get("path") else {
        return (StatusCode::BAD_REQUEST, "missing 'path' parameter").into_response();
    };

    let path = PathBuf::from(path);
    if !path.exists() {
        return (
            StatusCode::BAD_REQUEST,
            format!("Path does not exist: {}", path.display()),
        )
            .into_response();
    }

    info!(path = %path.display(), "Received ingestion request");
    match state.ingestion_service.ingest(&path).await {
        Ok(count) => (
            StatusCode::OK,
            format!(
                "Successfully ingested {} documents from {}",
                count,
                path.display()
            ),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Ingestion failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Ingestion failed: {}", e),
            )
                .into_response()
        }
    }
}

async fn run_evaluation(
    State(state): State<AppState>,
    Json(payload): Json<HashMap<String, String>>,
) -> Response {
    let query = payload.get("query").map(String::as_str).unwrap_or("");
    if query.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "query must not be blank").into_response();
    }

    let result = state.evaluator.evaluate(query).await;
    Json(result).into_response()
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
