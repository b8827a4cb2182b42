//! Completion response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Stop,
    Length,
    Error,
}

/// A completed (or cache-served) generation.
///
/// Produced exactly once per admitted, uncached request. Cache-served
/// copies carry `cached = true` and keep the original cost and timestamp;
/// a hit is otherwise indistinguishable from a fresh call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub provider: String,
    pub tokens_used: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    #[serde(default)]
    pub finish_reason: FinishReason,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub cached: bool,
    pub cost_usd: f64,
}
