//! Read-only usage introspection types

use serde::{Deserialize, Serialize};

use crate::limiter::RateLimits;

/// Snapshot of a caller's current admission counters, for UI display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUsage {
    pub requests_this_minute: u64,
    pub requests_today: u64,
    pub limits: RateLimits,
}
