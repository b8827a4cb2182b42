//! Fixed-window admission control.
//!
//! Two independent counters per caller — one per calendar minute, one per
//! UTC day — both incremented on every check, each expiring with its
//! window. This is deliberately fixed-window rather than sliding-window or
//! token-bucket: bursty but simple and cheap. A caller can burst up to 2x
//! the per-minute cap across a window boundary; that is an accepted edge
//! case, not a defect to smooth over.
//!
//! Counters live in the injected [`KvStore`], so admission stays correct
//! when multiple gateway instances share a backend. When the store is
//! unreachable the [`FailurePolicy`] decides: fail closed (default,
//! distinguishable [`GatewayError::LimiterUnavailable`]) or fail open.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::{FailurePolicy, KvStore};
use crate::telemetry;
use crate::types::UserUsage;
use crate::{GatewayError, Result};

const MINUTE_WINDOW: Duration = Duration::from_secs(60);
const DAY_WINDOW: Duration = Duration::from_secs(86_400);

/// Per-caller admission caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    pub requests_per_minute: u32,
    pub requests_per_day: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            requests_per_minute: 30,
            requests_per_day: 500,
        }
    }
}

impl RateLimits {
    pub fn new(requests_per_minute: u32, requests_per_day: u32) -> Self {
        Self {
            requests_per_minute,
            requests_per_day,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    /// Time remaining in the window that rejected the request.
    pub retry_after: Option<Duration>,
}

impl Admission {
    fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after: None,
        }
    }

    fn rejected(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after: Some(retry_after),
        }
    }
}

/// Fixed-window rate limiter over a shared counter store.
pub struct RateLimiter {
    store: Arc<dyn KvStore>,
    policy: FailurePolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KvStore>, policy: FailurePolicy) -> Self {
        Self { store, policy }
    }

    /// Check whether `caller` may proceed, recording the attempt.
    ///
    /// Both counters are incremented even when the request is ultimately
    /// rejected; rejected attempts still consume window capacity.
    pub async fn check_and_record(&self, caller: &str, limits: &RateLimits) -> Result<Admission> {
        self.check_and_record_at(caller, limits, Utc::now()).await
    }

    async fn check_and_record_at(
        &self,
        caller: &str,
        limits: &RateLimits,
        now: DateTime<Utc>,
    ) -> Result<Admission> {
        let ts = now.timestamp();

        let minute_count = match self
            .store
            .incr(&minute_key(caller, ts), MINUTE_WINDOW)
            .await
        {
            Ok(n) => n,
            Err(e) => return self.degraded(caller, e),
        };
        let day_count = match self.store.incr(&day_key(caller, ts), DAY_WINDOW).await {
            Ok(n) => n,
            Err(e) => return self.degraded(caller, e),
        };

        if minute_count > u64::from(limits.requests_per_minute) {
            metrics::counter!(telemetry::ADMISSION_REJECTIONS_TOTAL, "reason" => "minute")
                .increment(1);
            return Ok(Admission::rejected(seconds_to_next_minute(ts)));
        }
        if day_count > u64::from(limits.requests_per_day) {
            metrics::counter!(telemetry::ADMISSION_REJECTIONS_TOTAL, "reason" => "day")
                .increment(1);
            return Ok(Admission::rejected(seconds_to_next_day(ts)));
        }
        Ok(Admission::allowed())
    }

    /// Read a caller's current counters without recording anything.
    pub async fn usage(&self, caller: &str, limits: &RateLimits) -> Result<UserUsage> {
        self.usage_at(caller, limits, Utc::now()).await
    }

    async fn usage_at(
        &self,
        caller: &str,
        limits: &RateLimits,
        now: DateTime<Utc>,
    ) -> Result<UserUsage> {
        let ts = now.timestamp();
        let map_err = |e| GatewayError::LimiterUnavailable(format!("{e}"));
        let requests_this_minute = self
            .store
            .get_u64(&minute_key(caller, ts))
            .await
            .map_err(map_err)?
            .unwrap_or(0);
        let requests_today = self
            .store
            .get_u64(&day_key(caller, ts))
            .await
            .map_err(map_err)?
            .unwrap_or(0);
        Ok(UserUsage {
            requests_this_minute,
            requests_today,
            limits: *limits,
        })
    }

    fn degraded(&self, caller: &str, err: crate::store::StoreError) -> Result<Admission> {
        match self.policy {
            FailurePolicy::Open => {
                warn!(caller, error = %err, "rate-limit store unavailable, failing open");
                Ok(Admission::allowed())
            }
            FailurePolicy::Closed => Err(GatewayError::LimiterUnavailable(format!("{err}"))),
        }
    }
}

fn minute_key(caller: &str, ts: i64) -> String {
    format!("rate:{caller}:m:{}", ts.div_euclid(60))
}

fn day_key(caller: &str, ts: i64) -> String {
    format!("rate:{caller}:d:{}", ts.div_euclid(86_400))
}

/// Seconds until the next minute boundary, in `1..=60`.
fn seconds_to_next_minute(ts: i64) -> Duration {
    Duration::from_secs((60 - ts.rem_euclid(60)) as u64)
}

/// Seconds until the next UTC midnight, in `1..=86_400`.
fn seconds_to_next_day(ts: i64) -> Duration {
    Duration::from_secs((86_400 - ts.rem_euclid(86_400)) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryStore::new()), FailurePolicy::Closed)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn admits_up_to_minute_cap_then_rejects() {
        let limiter = limiter();
        let limits = RateLimits::new(10, 1000);
        // 15 seconds into a minute window.
        let now = at(90_015);

        for _ in 0..10 {
            let admission = limiter
                .check_and_record_at("alice", &limits, now)
                .await
                .unwrap();
            assert!(admission.allowed);
        }
        let eleventh = limiter
            .check_and_record_at("alice", &limits, now)
            .await
            .unwrap();
        assert!(!eleventh.allowed);
        let retry = eleventh.retry_after.unwrap();
        assert!(retry >= Duration::from_secs(1) && retry <= Duration::from_secs(60));
        assert_eq!(retry, Duration::from_secs(45));
    }

    #[tokio::test]
    async fn minute_windows_are_independent() {
        let limiter = limiter();
        let limits = RateLimits::new(2, 1000);

        let first_window = at(120);
        for _ in 0..2 {
            assert!(
                limiter
                    .check_and_record_at("bob", &limits, first_window)
                    .await
                    .unwrap()
                    .allowed
            );
        }
        assert!(
            !limiter
                .check_and_record_at("bob", &limits, first_window)
                .await
                .unwrap()
                .allowed
        );

        // Next minute bucket starts fresh.
        let next_window = at(180);
        assert!(
            limiter
                .check_and_record_at("bob", &limits, next_window)
                .await
                .unwrap()
                .allowed
        );
    }

    #[tokio::test]
    async fn day_cap_reports_seconds_to_midnight() {
        let limiter = limiter();
        let limits = RateLimits::new(1000, 1);
        // 2021-01-01T23:59:30Z
        let now = Utc.with_ymd_and_hms(2021, 1, 1, 23, 59, 30).unwrap();

        assert!(
            limiter
                .check_and_record_at("carol", &limits, now)
                .await
                .unwrap()
                .allowed
        );
        let rejected = limiter
            .check_and_record_at("carol", &limits, now)
            .await
            .unwrap();
        assert!(!rejected.allowed);
        assert_eq!(rejected.retry_after, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn rejected_attempts_still_consume_capacity() {
        let limiter = limiter();
        let limits = RateLimits::new(100, 3);
        let now = at(5_000);

        for _ in 0..6 {
            limiter
                .check_and_record_at("dave", &limits, now)
                .await
                .unwrap();
        }
        let usage = limiter.usage_at("dave", &limits, now).await.unwrap();
        assert_eq!(usage.requests_today, 6);
    }

    #[tokio::test]
    async fn callers_do_not_share_counters() {
        let limiter = limiter();
        let limits = RateLimits::new(1, 1000);
        let now = at(7_207);

        assert!(
            limiter
                .check_and_record_at("erin", &limits, now)
                .await
                .unwrap()
                .allowed
        );
        assert!(
            !limiter
                .check_and_record_at("erin", &limits, now)
                .await
                .unwrap()
                .allowed
        );
        assert!(
            limiter
                .check_and_record_at("frank", &limits, now)
                .await
                .unwrap()
                .allowed
        );
    }

    #[tokio::test]
    async fn usage_reads_both_windows() {
        let limiter = limiter();
        let limits = RateLimits::default();
        let now = at(86_400 * 100 + 3_601);

        for _ in 0..3 {
            limiter
                .check_and_record_at("grace", &limits, now)
                .await
                .unwrap();
        }
        let usage = limiter.usage_at("grace", &limits, now).await.unwrap();
        assert_eq!(usage.requests_this_minute, 3);
        assert_eq!(usage.requests_today, 3);
        assert_eq!(usage.limits, limits);
    }

    #[test]
    fn retry_after_on_exact_boundary_is_full_window() {
        assert_eq!(seconds_to_next_minute(120), Duration::from_secs(60));
        assert_eq!(seconds_to_next_minute(119), Duration::from_secs(1));
        assert_eq!(seconds_to_next_day(86_400), Duration::from_secs(86_400));
    }
}
