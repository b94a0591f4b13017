use axum::{extract::{Query, State}, http::StatusCode, response::{IntoResponse, Response}, routing::{get, post}, Json, Router};
use retrieval_core::{QueryRecord, RetrievalError, RetrievedRecord, Retriever, Tokenizer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

pub type SharedRetriever = Arc<Retriever<Box<dyn Tokenizer>>>;

const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub scores: Vec<f32>,
    pub ordinals: Vec<u32>,
    pub passages: Vec<String>,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    #[serde(default = "default_batch_k")]
    pub k: usize,
    pub queries: Vec<QueryRecord>,
}
fn default_batch_k() -> usize { 1 }

#[derive(Clone)]
pub struct AppState {
    pub retriever: SharedRetriever,
}

/// Error body returned for every failed request.
pub enum ApiError {
    Retrieval(RetrievalError),
    /// The blocking worker died before producing a result.
    Internal,
}

impl From<RetrievalError> for ApiError {
    fn from(e: RetrievalError) -> Self { ApiError::Retrieval(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let e = match self {
            ApiError::Retrieval(e) => e,
            ApiError::Internal => {
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({ "error": "internal error" }))).into_response();
            }
        };
        let status = match &e {
            RetrievalError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            RetrievalError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %e, "request failed");
        }
        (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
    }
}

pub fn build_app(retriever: SharedRetriever) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/retrieve", post(retrieve_handler))
        .with_state(AppState { retriever })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let k = params.k.min(MAX_K);
    let result = state.retriever.retrieve(&params.q, k)?;
    let took_s = start.elapsed().as_secs_f64();
    Ok(Json(SearchResponse {
        query: params.q,
        took_s,
        scores: result.scores,
        ordinals: result.ordinals,
        passages: result.passages,
    }))
}

/// Uncached batch retrieval; scoring runs on the blocking pool.
pub async fn retrieve_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<Vec<RetrievedRecord>>, ApiError> {
    let k = req.k.min(MAX_K);
    let retriever = state.retriever.clone();
    let records = tokio::task::spawn_blocking(move || retriever.retrieve_batch(&req.queries, k))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "batch retrieval worker failed");
            ApiError::Internal
        })??;
    Ok(Json(records))
}
