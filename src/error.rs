//! Heimdall error types

use std::time::Duration;

/// Heimdall error types
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    // Admission / budget errors (user-facing, structured)
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("daily budget exceeded: spent {current_cost_usd:.4} of {daily_limit_usd:.2} USD")]
    BudgetExceeded {
        current_cost_usd: f64,
        daily_limit_usd: f64,
    },

    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider rate limited, retry after {retry_after:?}")]
    UpstreamRateLimited { retry_after: Option<Duration> },

    #[error("provider request timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("empty response from model")]
    EmptyResponse,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("no provider configured")]
    NoProvider,

    #[error("configuration error: {0}")]
    Configuration(String),

    // Infrastructure degradation (fail-closed surfaces)
    #[error("rate-limit store unavailable: {0}")]
    LimiterUnavailable(String),

    #[error("cost ledger unavailable: {0}")]
    LedgerUnavailable(String),
}

impl GatewayError {
    /// Whether the caller may reasonably retry this operation later.
    ///
    /// Admission and budget rejections clear on their own; provider
    /// timeouts, upstream throttling, and store outages are transient.
    /// Configuration and input errors are permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited { .. }
                | GatewayError::BudgetExceeded { .. }
                | GatewayError::UpstreamRateLimited { .. }
                | GatewayError::Timeout(_)
                | GatewayError::Http(_)
                | GatewayError::LimiterUnavailable(_)
                | GatewayError::LedgerUnavailable(_)
        )
    }

    /// Retry-after hint, when one is known.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GatewayError::RateLimited { retry_after } => Some(*retry_after),
            GatewayError::UpstreamRateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for Heimdall operations
pub type Result<T> = std::result::Result<T, GatewayError>;
