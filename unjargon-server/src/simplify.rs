//! The simplify endpoint: validation, policy guards, prompt construction,
//! and the streaming relay (or JSON fallback with server-side repair).

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::debug;

use unjargon_core::prompt::{self, SYSTEM_PROMPT};
use unjargon_core::repair;
use unjargon_core::types::CompletionRequest;

use crate::error::ApiError;
use crate::extract;
use crate::state::AppState;

pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let ip = extract::client_ip(&headers);
    if !state.route_limiter.check(&format!("simplify:{ip}")).allowed {
        return Err(ApiError::RouteLimited);
    }

    let provider = state.provider.clone().ok_or_else(|| ApiError::MissingApiKey {
        var: state.config.llm.api_key_env.clone(),
    })?;

    let input = extract::simplify_input(&headers, &body);
    let limits = &state.config.limits;

    let mut text = input.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::MissingText);
    }

    if input.document {
        // Document-like inputs are truncated, not rejected.
        text = prompt::truncate_chars(&text, limits.max_document_chars).to_string();
    } else {
        let chars = text.chars().count();
        if chars > limits.max_input_chars {
            return Err(ApiError::InputTooLarge {
                chars,
                limit: limits.max_input_chars,
            });
        }
    }

    let quota = state.simplify_limiter.check(&format!("quota:{ip}"));
    if !quota.allowed {
        return Err(ApiError::QuotaExceeded { decision: quota });
    }

    let user_prompt = prompt::build_prompt(input.domain, &text, input.level, limits);
    let request = CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt: user_prompt,
        image_data_url: None,
        temperature: state.config.llm.temperature,
        max_tokens: state.config.llm.max_tokens,
    };

    if input.stream {
        debug!(domain = ?input.domain, level = ?input.level, "starting streaming simplify");
        let deltas = provider.complete_streaming(request).await?;
        Response::builder()
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from_stream(deltas))
            .map_err(|_| ApiError::Internal)
    } else {
        let raw = provider.complete(request).await?;
        let simplified = if input.document {
            repair::repair_document_reply(&raw)
        } else {
            repair::repair_reply(&raw)
        };
        Ok(Json(json!({ "simplified": simplified })).into_response())
    }
}
