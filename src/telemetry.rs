//! Telemetry metric name constants.
//!
//! Centralised metric names for heimdall operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `heimdall_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `status` — outcome: "ok" or "error"
//! - `direction` — token direction: "prompt" or "completion"
//! - `reason` — admission rejection window: "minute" or "day"

/// Total completion requests dispatched through the gateway.
///
/// Labels: `status` ("ok" | "error" | "cached").
pub const REQUESTS_TOTAL: &str = "heimdall_requests_total";

/// Provider request duration in seconds.
pub const REQUEST_DURATION_SECONDS: &str = "heimdall_request_duration_seconds";

/// Total requests rejected by admission control.
///
/// Labels: `reason` ("minute" | "day").
pub const ADMISSION_REJECTIONS_TOTAL: &str = "heimdall_admission_rejections_total";

/// Total requests rejected by the cost budget.
pub const BUDGET_REJECTIONS_TOTAL: &str = "heimdall_budget_rejections_total";

/// Total tokens consumed.
///
/// Labels: `direction` ("prompt" | "completion").
pub const TOKENS_TOTAL: &str = "heimdall_tokens_total";

/// Per-request provider cost in USD (histogram).
pub const COST_USD: &str = "heimdall_cost_usd";

/// Total response cache hits.
pub const CACHE_HITS_TOTAL: &str = "heimdall_cache_hits_total";

/// Total response cache misses.
pub const CACHE_MISSES_TOTAL: &str = "heimdall_cache_misses_total";

/// Total cache backend failures (degraded to miss / skipped store).
pub const CACHE_ERRORS_TOTAL: &str = "heimdall_cache_errors_total";
