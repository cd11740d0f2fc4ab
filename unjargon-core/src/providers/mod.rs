//! Upstream generative-text providers.
//!
//! The `CompletionProvider` trait is the seam between the gateway and the
//! upstream API: one-shot completion for the non-streaming fallback, and a
//! streaming variant whose deltas are relayed straight to the client.

mod openai;

pub use openai::OpenAiCompatibleClient;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::LlmError;
use crate::types::CompletionRequest;

/// Ordered text deltas from a streaming completion. The stream ends when the
/// upstream terminates; an `Err` item aborts it.
pub type DeltaStream = ReceiverStream<Result<Bytes, LlmError>>;

/// Interface to an upstream chat-completions API.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Request a full completion and return the assistant message text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Request a streaming completion. Connection and upstream status errors
    /// surface here, before any byte reaches the client; once the stream is
    /// returned, the relay pumps deltas until the upstream terminates or the
    /// receiver goes away.
    async fn complete_streaming(
        &self,
        request: CompletionRequest,
    ) -> Result<DeltaStream, LlmError>;
}
