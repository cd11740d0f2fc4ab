//! Configuration system for the Unjargon service.
//!
//! Uses `figment` for layered configuration: defaults -> `unjargon.toml` in the
//! working directory -> `UNJARGON_*` environment variables (double underscore
//! separates sections, e.g. `UNJARGON_LLM__MODEL`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Top-level configuration for the Unjargon service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    pub rate_limit: RateLimitConfig,
    pub maintenance: MaintenanceConfig,
}

/// Configuration for the upstream chat-completions provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier sent to the upstream API.
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Explicit API key; takes precedence over `api_key_env` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// Sampling temperature. Zero keeps the three-section formatting stable.
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            api_key: None,
            max_tokens: 450,
            temperature: 0.0,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the explicit value or the configured
    /// environment variable.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        std::env::var(&self.api_key_env).map_err(|_| ConfigError::EnvVarMissing {
            var: self.api_key_env.clone(),
        })
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Input size ceilings and the short-input heuristic thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum accepted characters for plain-text input.
    pub max_input_chars: usize,
    /// Characters kept from document-like inputs (extracted PDF text) before
    /// the prompt embeds them.
    pub max_document_chars: usize,
    /// Maximum accepted bytes for a fetched or inline image.
    pub max_image_bytes: usize,
    /// Inputs with at most this many words select the short-input prompt.
    pub short_input_max_words: usize,
    /// Inputs shorter than this many trimmed characters select the
    /// short-input prompt.
    pub short_input_min_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 10_000,
            max_document_chars: 15_000,
            max_image_bytes: 3_000_000,
            short_input_max_words: 5,
            short_input_min_chars: 40,
        }
    }
}

/// Sliding-window rate limit ceilings. Two limiters stack: a coarse per-route
/// guard and a finer per-endpoint one on simplify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub route_limit: usize,
    pub route_window_secs: u64,
    pub simplify_limit: usize,
    pub simplify_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            route_limit: 30,
            route_window_secs: 60,
            simplify_limit: 20,
            simplify_window_secs: 60,
        }
    }
}

/// Maintenance-mode gate applied to every API route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    pub enabled: bool,
    pub message: String,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            message: "Service temporarily unavailable.".to_string(),
        }
    }
}

/// Load configuration with figment layering: defaults -> config file -> env.
pub fn load_config(config_file: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    match config_file {
        Some(path) => {
            figment = figment.merge(Toml::file(path));
        }
        None => {
            let default_path = Path::new("unjargon.toml");
            if default_path.exists() {
                figment = figment.merge(Toml::file(default_path));
            }
        }
    }

    // Environment variables (UNJARGON_LLM__MODEL, UNJARGON_MAINTENANCE__ENABLED, etc.)
    figment = figment.merge(Env::prefixed("UNJARGON_").split("__"));

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}
