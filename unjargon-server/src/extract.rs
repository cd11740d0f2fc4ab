//! Request-body input adaptation.
//!
//! Clients send the text payload under several shapes; extraction runs an
//! ordered list of strategies and stops at the first success: JSON `text` ->
//! JSON `content` -> JSON `input` -> JSON `pdfText` (document modality) ->
//! raw body (with best-effort parsing when the raw body looks like JSON).

use axum::http::HeaderMap;
use serde_json::Value;

use unjargon_core::types::{Domain, Level};

/// Adapted input for the simplify endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimplifyInput {
    pub text: String,
    pub domain: Domain,
    pub level: Level,
    /// Document-like payload (extracted PDF text): truncated instead of
    /// rejected, and repaired with the document pre-pass.
    pub document: bool,
    /// Stream deltas live; `false` selects the JSON fallback response.
    pub stream: bool,
}

impl Default for SimplifyInput {
    fn default() -> Self {
        Self {
            text: String::new(),
            domain: Domain::General,
            level: Level::Intermediate,
            document: false,
            stream: true,
        }
    }
}

/// Field names tried in order for the plain-text payload.
const TEXT_FIELDS: [&str; 3] = ["text", "content", "input"];

/// Pull the payload out of a parsed JSON body, if any strategy matches.
fn from_json(value: &Value) -> Option<SimplifyInput> {
    let mut input = SimplifyInput {
        domain: value
            .get("domain")
            .and_then(Value::as_str)
            .map(Domain::from_param)
            .unwrap_or_default(),
        level: value
            .get("level")
            .and_then(Value::as_str)
            .map(Level::from_param)
            .unwrap_or_default(),
        stream: value.get("stream").and_then(Value::as_bool).unwrap_or(true),
        ..SimplifyInput::default()
    };

    for field in TEXT_FIELDS {
        if let Some(text) = value.get(field).and_then(Value::as_str) {
            input.text = text.to_string();
            return Some(input);
        }
    }
    if let Some(text) = value.get("pdfText").and_then(Value::as_str) {
        input.text = text.to_string();
        input.document = true;
        return Some(input);
    }
    None
}

/// Adapt a request body into a `SimplifyInput`. Never fails: an unusable body
/// yields an empty text, which the handler rejects as missing input.
pub fn simplify_input(headers: &HeaderMap, body: &[u8]) -> SimplifyInput {
    let is_json = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    if is_json {
        if let Ok(value) = serde_json::from_slice::<Value>(body) {
            if let Some(input) = from_json(&value) {
                return input;
            }
        }
    }

    // Raw body fallback; a body that looks like JSON is parsed best-effort
    // even when the content type said otherwise.
    let raw = String::from_utf8_lossy(body);
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return SimplifyInput::default();
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            if let Some(input) = from_json(&value) {
                return input;
            }
        }
    }
    SimplifyInput {
        text: trimmed.to_string(),
        ..SimplifyInput::default()
    }
}

/// Client network address for rate-limit keying: first `x-forwarded-for`
/// entry, then `cf-connecting-ip`, then "unknown".
pub fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }
    headers
        .get("cf-connecting-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_string()
}
