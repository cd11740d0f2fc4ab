//! Gateway error taxonomy and its HTTP mapping.
//!
//! Validation and policy errors are produced at the gateway boundary before
//! any upstream call; upstream failures are translated at the relay boundary
//! and never leak raw network errors to the client.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use unjargon_core::error::{ConfigError, LlmError};
use unjargon_core::rate_limit::Decision;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing text input")]
    MissingText,

    #[error("missing image input")]
    MissingImage,

    #[error("invalid data URL")]
    InvalidDataUrl,

    #[error("input too large: {chars} chars (limit {limit})")]
    InputTooLarge { chars: usize, limit: usize },

    #[error("image too large: {bytes} bytes (limit {limit})")]
    ImageTooLarge { bytes: usize, limit: usize },

    #[error("unsupported media type: {mime}")]
    UnsupportedType { mime: String },

    #[error("image download failed with status {status}")]
    ImageFetch { status: u16, detail: String },

    #[error("route rate limit exceeded")]
    RouteLimited,

    #[error("request quota exceeded")]
    QuotaExceeded { decision: Decision },

    #[error("service under maintenance")]
    Maintenance { message: String },

    #[error("server missing API key {var}")]
    MissingApiKey { var: String },

    #[error("upstream model error: {detail}")]
    Upstream { detail: String },

    #[error("internal error")]
    Internal,
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        ApiError::Upstream {
            detail: e.to_string(),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::EnvVarMissing { var } => ApiError::MissingApiKey { var },
            _ => ApiError::Internal,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::MissingText => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Missing \"text\" string." }),
            ),
            ApiError::MissingImage => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Missing imageUrl or dataUrl" }),
            ),
            ApiError::InvalidDataUrl => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid dataUrl format" }),
            ),
            ApiError::InputTooLarge { chars, limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({
                    "error": "Input too large",
                    "detail": format!("Your input has {chars} characters. Limit is {limit}."),
                }),
            ),
            ApiError::ImageTooLarge { bytes, limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({
                    "error": "Image too large",
                    "detail": format!("Image is {bytes} bytes. Limit is {limit}."),
                }),
            ),
            ApiError::UnsupportedType { mime } => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                json!({
                    "error": "Unsupported file type",
                    "detail": format!("Type {mime} is not allowed."),
                }),
            ),
            ApiError::ImageFetch { status, detail } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": format!("Failed to download image ({status})"),
                    "detail": detail,
                }),
            ),
            ApiError::RouteLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": "Rate limited",
                    "detail": "Too many requests. Please slow down.",
                }),
            ),
            ApiError::QuotaExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "Rate limit exceeded. Please try again shortly." }),
            ),
            ApiError::Maintenance { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "Under maintenance", "detail": message }),
            ),
            ApiError::MissingApiKey { var } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": format!("Server missing {var}") }),
            ),
            ApiError::Upstream { detail } => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Upstream model error", "detail": detail }),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal error" }),
            ),
        };

        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

        if let ApiError::QuotaExceeded { decision } = &self {
            let headers = response.headers_mut();
            if let Ok(v) = HeaderValue::from_str(&decision.limit.to_string()) {
                headers.insert("X-RateLimit-Limit", v);
            }
            if let Ok(v) = HeaderValue::from_str(&decision.remaining.to_string()) {
                headers.insert("X-RateLimit-Remaining", v);
            }
            if let Ok(v) = HeaderValue::from_str(&decision.retry_after_secs.to_string()) {
                headers.insert("X-RateLimit-Reset", v);
            }
        }

        response
    }
}
