//! OpenAI-compatible chat-completions client.
//!
//! Works against OpenAI and any endpoint following the same API shape. The
//! streaming path hands the response byte stream to the SSE relay; the
//! non-streaming path parses the single completion object.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{ConfigError, LlmError};
use crate::sse;
use crate::types::CompletionRequest;

use super::{CompletionProvider, DeltaStream};

/// Maximum characters of an upstream error body kept in diagnostics.
const ERROR_EXCERPT_MAX: usize = 2_000;

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleClient {
    /// Create a client from configuration, resolving the API key from the
    /// explicit config value or the configured environment variable.
    pub fn new(config: &LlmConfig) -> Result<Self, ConfigError> {
        let api_key = config.resolve_api_key()?;
        Ok(Self::with_key(config, api_key))
    }

    /// Create a client with an externally resolved API key.
    pub fn with_key(config: &LlmConfig, api_key: String) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        Self {
            client: Client::new(),
            base_url,
            api_key,
            model: config.model.clone(),
        }
    }

    /// Build the chat-completions message list: system instruction plus the
    /// user turn, with an inline image part when present.
    fn messages_to_json(request: &CompletionRequest) -> Vec<Value> {
        let user_content = match &request.image_data_url {
            Some(data_url) => json!([
                { "type": "text", "text": request.prompt },
                { "type": "image_url", "image_url": { "url": data_url } },
            ]),
            None => json!(request.prompt),
        };
        vec![
            json!({ "role": "system", "content": request.system }),
            json!({ "role": "user", "content": user_content }),
        ]
    }

    fn request_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        json!({
            "model": self.model,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": stream,
            "messages": Self::messages_to_json(request),
        })
    }

    /// Parse the assistant message text out of a completion response body.
    fn parse_response(body: &Value) -> Result<String, LlmError> {
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| LlmError::ResponseParse {
                message: "no message content in response".to_string(),
            })
    }

    /// Map an upstream HTTP failure to the appropriate LlmError, keeping a
    /// truncated excerpt of the response body for diagnostics.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        let excerpt = excerpt(body);
        match status.as_u16() {
            401 => {
                debug!(body = %excerpt, "upstream authentication failed (401)");
                LlmError::AuthFailed {
                    provider: "OpenAI-compatible".to_string(),
                }
            }
            429 => {
                // Best-effort parse of "try again in Xs" from the error message.
                let retry_secs = serde_json::from_str::<Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.get("error")?
                            .get("message")?
                            .as_str()
                            .map(|s| s.to_string())
                    })
                    .and_then(|msg| {
                        msg.split("in ")
                            .last()
                            .and_then(|s| s.trim_end_matches('s').parse::<u64>().ok())
                    })
                    .unwrap_or(5);
                LlmError::RateLimited {
                    retry_after_secs: retry_secs,
                }
            }
            s if s >= 500 => LlmError::ApiRequest {
                message: format!("Server error ({s}): {excerpt}"),
            },
            s => LlmError::ApiRequest {
                message: format!("HTTP {s}: {excerpt}"),
            },
        }
    }
}

/// Truncate an upstream diagnostic body to the excerpt limit.
fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(ERROR_EXCERPT_MAX) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %self.model, "sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(&request, false))
            .send()
            .await
            .map_err(|e| LlmError::Connection {
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| LlmError::ApiRequest {
            message: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body));
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| LlmError::ResponseParse {
            message: format!("invalid JSON: {e}"),
        })?;
        Self::parse_response(&json)
    }

    async fn complete_streaming(
        &self,
        request: CompletionRequest,
    ) -> Result<DeltaStream, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %self.model, "sending streaming completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(&request, true))
            .send()
            .await
            .map_err(|e| LlmError::Connection {
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body));
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            if let Err(e) = sse::relay_deltas(response.bytes_stream(), tx).await {
                debug!(error = %e, "streaming relay ended with error");
            }
        });
        Ok(ReceiverStream::new(rx))
    }
}
