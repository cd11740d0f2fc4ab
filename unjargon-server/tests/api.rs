//! Integration tests for the gateway endpoints, driven through the router
//! with a mock upstream provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower::ServiceExt;

use unjargon_core::config::AppConfig;
use unjargon_core::error::LlmError;
use unjargon_core::providers::{CompletionProvider, DeltaStream};
use unjargon_core::rate_limit::SlidingWindowLimiter;
use unjargon_core::types::CompletionRequest;
use unjargon_server::routes;
use unjargon_server::state::AppState;

/// Upstream stand-in: returns a canned reply and counts invocations.
struct MockProvider {
    reply: String,
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl MockProvider {
    fn new(reply: &str) -> (Arc<dyn CompletionProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider: Arc<dyn CompletionProvider> = Arc::new(Self {
            reply: reply.to_string(),
            calls: calls.clone(),
            fail: false,
        });
        (provider, calls)
    }

    fn failing() -> Arc<dyn CompletionProvider> {
        Arc::new(Self {
            reply: String::new(),
            calls: Arc::new(AtomicUsize::new(0)),
            fail: true,
        })
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LlmError::ApiRequest {
                message: "HTTP 500: upstream exploded".to_string(),
            });
        }
        Ok(self.reply.clone())
    }

    async fn complete_streaming(
        &self,
        _request: CompletionRequest,
    ) -> Result<DeltaStream, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LlmError::ApiRequest {
                message: "HTTP 500: upstream exploded".to_string(),
            });
        }
        let (tx, rx) = mpsc::channel(8);
        let reply = self.reply.clone().into_bytes();
        tokio::spawn(async move {
            for chunk in reply.chunks(5) {
                if tx.send(Ok(Bytes::copy_from_slice(chunk))).await.is_err() {
                    break;
                }
            }
        });
        Ok(ReceiverStream::new(rx))
    }
}

fn test_state(provider: Option<Arc<dyn CompletionProvider>>, config: AppConfig) -> AppState {
    AppState {
        route_limiter: Arc::new(SlidingWindowLimiter::new(
            config.rate_limit.route_limit,
            Duration::from_secs(config.rate_limit.route_window_secs),
        )),
        simplify_limiter: Arc::new(SlidingWindowLimiter::new(
            config.rate_limit.simplify_limit,
            Duration::from_secs(config.rate_limit.simplify_window_secs),
        )),
        config: Arc::new(config),
        provider,
        http: reqwest::Client::new(),
    }
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1_000_000)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (provider, _) = MockProvider::new("ok");
    let app = routes::router(test_state(Some(provider), AppConfig::default()));
    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_get_on_post_route_is_405() {
    let (provider, _) = MockProvider::new("ok");
    let app = routes::router(test_state(Some(provider), AppConfig::default()));
    let response = app
        .oneshot(Request::get("/api/simplify").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_missing_text_is_400() {
    let (provider, calls) = MockProvider::new("ok");
    let app = routes::router(test_state(Some(provider), AppConfig::default()));
    let response = app
        .oneshot(post_json("/api/simplify", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = read_json(response).await;
    assert_eq!(json["error"], "Missing \"text\" string.");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversized_text_is_413_before_upstream() {
    let (provider, calls) = MockProvider::new("ok");
    let app = routes::router(test_state(Some(provider), AppConfig::default()));
    let text = "x".repeat(10_001);
    let response = app
        .oneshot(post_json("/api/simplify", serde_json::json!({ "text": text })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = read_json(response).await;
    assert_eq!(json["error"], "Input too large");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_maintenance_mode_rejects_api_requests() {
    let (provider, calls) = MockProvider::new("ok");
    let mut config = AppConfig::default();
    config.maintenance.enabled = true;
    config.maintenance.message = "Back soon.".to_string();
    let app = routes::router(test_state(Some(provider), config));
    let response = app
        .oneshot(post_json("/api/simplify", serde_json::json!({ "text": "hi" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = read_json(response).await;
    assert_eq!(json["error"], "Under maintenance");
    assert_eq!(json["detail"], "Back soon.");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_route_rate_limit_rejects_with_429() {
    let (provider, _) = MockProvider::new("reply");
    let mut config = AppConfig::default();
    config.rate_limit.route_limit = 2;
    let state = test_state(Some(provider), config);
    let app = routes::router(state);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json("/api/simplify", serde_json::json!({ "text": "hello world" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app
        .oneshot(post_json("/api/simplify", serde_json::json!({ "text": "hello world" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_quota_limit_carries_headers() {
    let (provider, _) = MockProvider::new("reply");
    let mut config = AppConfig::default();
    config.rate_limit.simplify_limit = 1;
    let app = routes::router(test_state(Some(provider), config));

    let response = app
        .clone()
        .oneshot(post_json("/api/simplify", serde_json::json!({ "text": "hello world" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json("/api/simplify", serde_json::json!({ "text": "hello world" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let headers = response.headers();
    assert_eq!(headers.get("X-RateLimit-Limit").unwrap(), "1");
    assert_eq!(headers.get("X-RateLimit-Remaining").unwrap(), "0");
    assert!(headers.contains_key("X-RateLimit-Reset"));
}

#[tokio::test]
async fn test_streaming_relays_reply_verbatim() {
    let (provider, _) = MockProvider::new("1. Summary\nStreamed reply body.");
    let app = routes::router(test_state(Some(provider), AppConfig::default()));
    let response = app
        .oneshot(post_json("/api/simplify", serde_json::json!({ "text": "hello world" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/plain; charset=utf-8"
    );
    let body = axum::body::to_bytes(response.into_body(), 1_000_000)
        .await
        .unwrap();
    assert_eq!(&body[..], b"1. Summary\nStreamed reply body.");
}

#[tokio::test]
async fn test_non_streaming_fallback_repairs_reply() {
    let (provider, _) = MockProvider::new("Some summary text only.");
    let app = routes::router(test_state(Some(provider), AppConfig::default()));
    let response = app
        .oneshot(post_json(
            "/api/simplify",
            serde_json::json!({ "text": "hello world", "stream": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(
        json["simplified"],
        "1. Summary\nSome summary text only.\n\n2. Main Points\nN/A\n\n3. Helpful Definitions\nN/A"
    );
}

#[tokio::test]
async fn test_pdf_text_truncated_not_rejected() {
    let (provider, _) = MockProvider::new(
        "**Summary:** Extracted.\n\nMain Points\n- a\n\nHelpful Definitions\nT: d",
    );
    let app = routes::router(test_state(Some(provider), AppConfig::default()));
    let big = "word ".repeat(4_000);
    let response = app
        .oneshot(post_json(
            "/api/simplify",
            serde_json::json!({ "pdfText": big, "stream": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    let simplified = json["simplified"].as_str().unwrap();
    assert!(simplified.starts_with("1. Summary"));
    assert!(simplified.contains("2. Main Points\n- a"));
    assert!(simplified.contains("3. Helpful Definitions\n- **T**: d"));
}

#[tokio::test]
async fn test_upstream_failure_is_502() {
    let app = routes::router(test_state(
        Some(MockProvider::failing()),
        AppConfig::default(),
    ));
    let response = app
        .oneshot(post_json("/api/simplify", serde_json::json!({ "text": "hello world" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = read_json(response).await;
    assert_eq!(json["error"], "Upstream model error");
}

#[tokio::test]
async fn test_missing_api_key_is_500() {
    let app = routes::router(test_state(None, AppConfig::default()));
    let response = app
        .oneshot(post_json("/api/simplify", serde_json::json!({ "text": "hello world" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = read_json(response).await;
    assert_eq!(json["error"], "Server missing OPENAI_API_KEY");
}

#[tokio::test]
async fn test_raw_text_body_accepted() {
    let (provider, _) = MockProvider::new("1. Summary\nraw ok");
    let app = routes::router(test_state(Some(provider), AppConfig::default()));
    let request = Request::builder()
        .method("POST")
        .uri("/api/simplify")
        .body(Body::from("plain body text"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_image_missing_input_is_400() {
    let (provider, _) = MockProvider::new("ok");
    let app = routes::router(test_state(Some(provider), AppConfig::default()));
    let response = app
        .oneshot(post_json("/api/analyze-image", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = read_json(response).await;
    assert_eq!(json["error"], "Missing imageUrl or dataUrl");
}

#[tokio::test]
async fn test_image_unsupported_type_is_415_before_upstream() {
    let (provider, calls) = MockProvider::new("ok");
    let app = routes::router(test_state(Some(provider), AppConfig::default()));
    let response = app
        .oneshot(post_json(
            "/api/analyze-image",
            serde_json::json!({ "dataUrl": "data:image/bmp;base64,AAAA" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_image_data_url_analyzed_and_repaired() {
    let (provider, _) = MockProvider::new(
        "1. Summary\nA chart.\n\n2. Main Points\n* one bar\n\n3. Helpful Definitions\nAxis: a reference line",
    );
    let app = routes::router(test_state(Some(provider), AppConfig::default()));
    let response = app
        .oneshot(post_json(
            "/api/analyze-image",
            serde_json::json!({ "dataUrl": "data:image/png;base64,AAAA", "level": "beginner" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    let simplified = json["simplified"].as_str().unwrap();
    assert!(simplified.contains("- one bar"));
    assert!(simplified.contains("- **Axis**: a reference line"));
}
