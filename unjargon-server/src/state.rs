//! Shared application state for the gateway.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use unjargon_core::config::AppConfig;
use unjargon_core::providers::{CompletionProvider, OpenAiCompatibleClient};
use unjargon_core::rate_limit::{RateLimiter, SlidingWindowLimiter};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Upstream provider; `None` when the API key is not configured, in which
    /// case requests fail with a misconfiguration error instead of the server
    /// refusing to start.
    pub provider: Option<Arc<dyn CompletionProvider>>,
    /// Client for fetching image references before inlining them.
    pub http: reqwest::Client,
    /// Coarse per-route limiter, keyed by endpoint and client address.
    pub route_limiter: Arc<dyn RateLimiter>,
    /// Finer per-endpoint limiter stacked on the simplify path.
    pub simplify_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let provider: Option<Arc<dyn CompletionProvider>> =
            match OpenAiCompatibleClient::new(&config.llm) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!(error = %e, "upstream provider not configured; requests will fail");
                    None
                }
            };

        let route_limiter = Arc::new(SlidingWindowLimiter::new(
            config.rate_limit.route_limit,
            Duration::from_secs(config.rate_limit.route_window_secs),
        ));
        let simplify_limiter = Arc::new(SlidingWindowLimiter::new(
            config.rate_limit.simplify_limit,
            Duration::from_secs(config.rate_limit.simplify_window_secs),
        ));

        Self {
            config: Arc::new(config),
            provider,
            http: reqwest::Client::new(),
            route_limiter,
            simplify_limiter,
        }
    }
}
