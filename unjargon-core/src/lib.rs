//! # Unjargon Core
//!
//! Core library for the Unjargon simplification service. Provides prompt
//! construction, the upstream chat-completions client, the SSE delta relay,
//! the output-contract repair passes, and the sliding-window rate limiter.

pub mod config;
pub mod error;
pub mod prompt;
pub mod providers;
pub mod rate_limit;
pub mod repair;
pub mod sse;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{AppConfig, LimitsConfig, LlmConfig, MaintenanceConfig};
pub use error::{ConfigError, LlmError, Result, UnjargonError};
pub use providers::{CompletionProvider, DeltaStream, OpenAiCompatibleClient};
pub use rate_limit::{Decision, RateLimiter, SlidingWindowLimiter};
pub use repair::{
    fix_definitions_formatting, fix_main_points_bullets, normalize_document_sections,
    normalize_headers, repair_document_reply, repair_reply,
};
pub use types::{CompletionRequest, Domain, Level};
