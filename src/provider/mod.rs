//! Provider boundary.
//!
//! The gateway talks to exactly one configured text-generation provider
//! through [`CompletionProvider`] — a single synchronous request/response
//! call. Failures surface as typed errors (timeout, upstream rate limit,
//! malformed response); the gateway never retries, selects fallbacks, or
//! holds state across calls.

pub mod http;

pub use http::HttpCompletionProvider;

use async_trait::async_trait;

use crate::Result;
use crate::types::{CompletionRequest, FinishReason};

/// Raw completion as returned by a provider, before the gateway wraps it
/// in a [`CompletionResponse`](crate::types::CompletionResponse) envelope.
#[derive(Debug, Clone)]
pub struct ProviderCompletion {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub finish_reason: FinishReason,
}

/// A text-generation provider.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logging and response attribution.
    fn name(&self) -> &str;

    /// Perform one completion call.
    async fn complete(&self, request: &CompletionRequest) -> Result<ProviderCompletion>;
}
