//! Completion request types.
//!
//! [`CompletionParams`] is what callers hand to the gateway: everything
//! optional defaults from gateway configuration. [`CompletionRequest`] is
//! the fully resolved form, every field concrete, and its structural
//! equality (order-sensitive on messages) is the cache identity.

use serde::{Deserialize, Serialize};

use super::message::Message;

/// Caller-facing request parameters (provider-agnostic).
///
/// Unset fields are resolved against the gateway's configured defaults
/// before any admission, trimming, or caching takes place.
#[derive(Debug, Clone, Default)]
pub struct CompletionParams {
    pub messages: Vec<Message>,
    pub system_prompt: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Serve structurally identical requests from the response cache.
    /// Default: true.
    pub use_cache: Option<bool>,
    /// Trim conversation history to the configured context budget.
    /// Default: true.
    pub trim_context: Option<bool>,
}

impl CompletionParams {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn use_cache(mut self, enabled: bool) -> Self {
        self.use_cache = Some(enabled);
        self
    }

    pub fn trim_context(mut self, enabled: bool) -> Self {
        self.trim_context = Some(enabled);
        self
    }
}

/// A fully resolved completion request.
///
/// Two requests are *equivalent* iff all fields are structurally equal,
/// including message order. Equivalent requests address the same cache
/// entry; any field difference produces a different cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub system_prompt: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}
