//! Router assembly: endpoints, maintenance gate, tracing, and CORS.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;
use crate::{image, simplify};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/simplify", post(simplify::handle).get(method_not_allowed))
        .route(
            "/api/analyze-image",
            post(image::handle).get(method_not_allowed),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            maintenance_gate,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn method_not_allowed() -> (StatusCode, Json<Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}

/// Reject every API request while maintenance mode is enabled, before any
/// other processing.
async fn maintenance_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.config.maintenance.enabled && request.uri().path().starts_with("/api/") {
        return ApiError::Maintenance {
            message: state.config.maintenance.message.clone(),
        }
        .into_response();
    }
    next.run(request).await
}
