//! The analyze-image endpoint: accepts inline encoded bytes or a fetchable
//! reference, validates type and size, and returns a repaired JSON result.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use unjargon_core::prompt::{build_image_prompt, IMAGE_SYSTEM_PROMPT};
use unjargon_core::repair;
use unjargon_core::types::{CompletionRequest, Level};

use crate::error::ApiError;
use crate::extract;
use crate::state::AppState;

/// MIME types accepted for image analysis.
const ALLOWED_IMAGE_MIME: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "application/pdf",
];

/// Characters of an image-fetch error body kept in diagnostics.
const FETCH_ERROR_EXCERPT_MAX: usize = 500;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageRequest {
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
    #[serde(rename = "dataUrl")]
    data_url: Option<String>,
    level: Level,
}

pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let ip = extract::client_ip(&headers);
    if !state
        .route_limiter
        .check(&format!("analyze-image:{ip}"))
        .allowed
    {
        return Err(ApiError::RouteLimited);
    }

    let provider = state.provider.clone().ok_or_else(|| ApiError::MissingApiKey {
        var: state.config.llm.api_key_env.clone(),
    })?;

    let request: ImageRequest = serde_json::from_slice(&body).unwrap_or_default();
    let max_bytes = state.config.limits.max_image_bytes;

    let data_url = match (request.data_url, request.image_url) {
        (Some(data_url), _) => {
            validate_data_url(&data_url, max_bytes)?;
            data_url
        }
        (None, Some(image_url)) => fetch_as_data_url(&state, &image_url, max_bytes).await?,
        (None, None) => return Err(ApiError::MissingImage),
    };

    let completion = CompletionRequest {
        system: IMAGE_SYSTEM_PROMPT.to_string(),
        prompt: build_image_prompt(request.level),
        image_data_url: Some(data_url),
        temperature: state.config.llm.temperature,
        max_tokens: state.config.llm.max_tokens,
    };

    let raw = provider.complete(completion).await?;
    let simplified = repair::repair_reply(&raw);
    Ok(Json(json!({ "simplified": simplified })))
}

/// Validate an inline data URL: shape, declared MIME, and an approximate
/// decoded-size ceiling.
fn validate_data_url(data_url: &str, max_bytes: usize) -> Result<(), ApiError> {
    let Some(after_scheme) = data_url.strip_prefix("data:") else {
        return Err(ApiError::InvalidDataUrl);
    };
    let mime = after_scheme.split([';', ',']).next().unwrap_or("");
    if !mime.is_empty() && !ALLOWED_IMAGE_MIME.contains(&mime) {
        return Err(ApiError::UnsupportedType {
            mime: mime.to_string(),
        });
    }
    if let Some(comma) = data_url.find(',') {
        let approx_bytes = (data_url.len() - comma - 1) / 4 * 3;
        if approx_bytes > max_bytes {
            return Err(ApiError::ImageTooLarge {
                bytes: approx_bytes,
                limit: max_bytes,
            });
        }
    }
    Ok(())
}

/// Fetch an image reference, validate its declared and actual size and its
/// MIME type, and inline it as a base64 data URL.
async fn fetch_as_data_url(
    state: &AppState,
    image_url: &str,
    max_bytes: usize,
) -> Result<String, ApiError> {
    let response = state.http.get(image_url).send().await.map_err(|e| {
        error!(error = %e, "image fetch failed");
        ApiError::Internal
    })?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        let detail: String = detail.chars().take(FETCH_ERROR_EXCERPT_MAX).collect();
        return Err(ApiError::ImageFetch {
            status: status.as_u16(),
            detail,
        });
    }

    let mime = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    if !ALLOWED_IMAGE_MIME.contains(&mime.as_str()) {
        return Err(ApiError::UnsupportedType { mime });
    }

    if let Some(declared) = response.content_length() {
        if declared as usize > max_bytes {
            return Err(ApiError::ImageTooLarge {
                bytes: declared as usize,
                limit: max_bytes,
            });
        }
    }

    let bytes = response.bytes().await.map_err(|e| {
        error!(error = %e, "image body read failed");
        ApiError::Internal
    })?;
    if bytes.len() > max_bytes {
        return Err(ApiError::ImageTooLarge {
            bytes: bytes.len(),
            limit: max_bytes,
        });
    }

    Ok(format!("data:{mime};base64,{}", BASE64.encode(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_data_url_accepted() {
        assert!(validate_data_url("data:image/png;base64,AAAA", 1000).is_ok());
    }

    #[test]
    fn test_non_data_url_rejected() {
        assert!(matches!(
            validate_data_url("https://example.com/x.png", 1000),
            Err(ApiError::InvalidDataUrl)
        ));
    }

    #[test]
    fn test_bmp_data_url_rejected_as_unsupported() {
        assert!(matches!(
            validate_data_url("data:image/bmp;base64,AAAA", 1000),
            Err(ApiError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_oversized_data_url_rejected() {
        let payload = "A".repeat(2000);
        let data_url = format!("data:image/png;base64,{payload}");
        assert!(matches!(
            validate_data_url(&data_url, 1000),
            Err(ApiError::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn test_request_body_field_names() {
        let parsed: ImageRequest =
            serde_json::from_str(r#"{"dataUrl":"data:image/png;base64,AA==","level":"beginner"}"#)
                .unwrap();
        assert!(parsed.data_url.is_some());
        assert_eq!(parsed.level, Level::Beginner);
    }
}
