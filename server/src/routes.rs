//! HTTP handlers for the analysis API.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use coach_engine::{AnalysisError, Analyzer, ErrorCategory};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}

/// Body of `POST /api/engine/analyze`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub fen: Option<String>,
    /// Any integer is accepted; the analyzer clamps it into its depth range.
    pub depth: Option<i64>,
}

impl AnalyzeRequest {
    fn depth(&self) -> Option<u8> {
        self.depth
            .map(|depth| depth.clamp(0, i64::from(u8::MAX)) as u8)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/engine/analyze", post(analyze))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

async fn health() -> &'static str {
    "ok"
}

/// Analyze a position with the configured engine.
///
/// # Endpoint
///
/// `POST /api/engine/analyze`
///
/// # Response
///
/// - `200 OK`: `{"bestMove": ..., "eval": ..., "pv": [...]}`
/// - `400 Bad Request`: missing or malformed FEN, or a body that is not JSON
/// - `500 Internal Server Error`: engine missing or crashed
/// - `504 Gateway Timeout`: engine did not answer in time
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        // A body without a JSON content type carries no FEN we can read.
        Err(JsonRejection::MissingJsonContentType(_)) => {
            return error_response(StatusCode::BAD_REQUEST, "FEN is required".to_string());
        }
        Err(rejection) => {
            tracing::info!("Rejected analyze body: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let depth = req.depth();
    let Some(fen) = req.fen.filter(|fen| !fen.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "FEN is required".to_string());
    };
    tracing::info!(fen = %fen, depth = ?depth, "POST /api/engine/analyze");

    match state.analyzer.analyze(&fen, depth).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(status_for(&e), e.to_string()),
    }
}

fn status_for(err: &AnalysisError) -> StatusCode {
    match err.category() {
        ErrorCategory::BadInput => StatusCode::BAD_REQUEST,
        ErrorCategory::ServerFault => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCategory::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}
