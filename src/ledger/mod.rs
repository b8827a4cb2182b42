//! Daily spend accounting and budget checks.
//!
//! The ledger keeps one float accumulator per (caller, UTC day) in the
//! shared [`KvStore`], plus a bounded list of per-operation records for
//! audit and debugging. Accounting is advisory and eventually consistent,
//! not a financial system of record: budget checks are read-then-compare
//! (estimate-then-charge), so a caller can overshoot its daily limit by at
//! most the cost of one in-flight completion.
//!
//! Accumulator keys expire after roughly two days rather than one, so
//! late-arriving writes near the day boundary land in a still-live key
//! instead of being silently dropped.

pub mod pricing;

pub use pricing::PricingTable;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::{FailurePolicy, KvStore, StoreError};
use crate::{GatewayError, Result};

/// Accumulator TTL: two days, covering timezone skew at the day boundary.
const DAY_COST_TTL: Duration = Duration::from_secs(2 * 86_400);

/// How long per-operation audit records are retained.
const OPERATION_RETENTION: Duration = Duration::from_secs(7 * 86_400);

/// Cap on retained audit records per caller.
const MAX_OPERATION_RECORDS: usize = 1_000;

/// One recorded gateway operation, kept for the audit window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub operation_id: String,
    pub caller_id: String,
    pub operation_type: String,
    pub cost_usd: f64,
    pub tokens_used: u32,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of an advisory budget check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetStatus {
    /// Whether the caller is strictly below its daily limit.
    pub ok: bool,
    pub current_cost_usd: f64,
}

/// Per-caller daily cost ledger over a shared store.
pub struct CostLedger {
    store: Arc<dyn KvStore>,
    pricing: PricingTable,
    policy: FailurePolicy,
}

impl CostLedger {
    pub fn new(store: Arc<dyn KvStore>, pricing: PricingTable, policy: FailurePolicy) -> Self {
        Self {
            store,
            pricing,
            policy,
        }
    }

    /// The pricing table used for estimates.
    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Estimated USD cost of `tokens` tokens against `model`.
    pub fn estimate_cost(&self, tokens: u64, model: &str) -> f64 {
        self.pricing.estimate(tokens, model)
    }

    /// Add `cost_usd` to the caller's accumulator for today.
    pub async fn record_cost(
        &self,
        caller: &str,
        operation_type: &str,
        cost_usd: f64,
    ) -> Result<f64> {
        self.record_cost_at(caller, operation_type, cost_usd, Utc::now())
            .await
    }

    async fn record_cost_at(
        &self,
        caller: &str,
        operation_type: &str,
        cost_usd: f64,
        now: DateTime<Utc>,
    ) -> Result<f64> {
        let total = self
            .store
            .add_f64(&day_key(caller, now), cost_usd, DAY_COST_TTL)
            .await
            .map_err(ledger_unavailable)?;
        debug!(caller, operation_type, cost_usd, daily_total = total, "recorded cost");
        Ok(total)
    }

    /// Record a completed operation: charge the daily accumulator and
    /// append an audit record.
    pub async fn record_operation(&self, record: OperationRecord) -> Result<()> {
        self.record_cost_at(
            &record.caller_id,
            &record.operation_type,
            record.cost_usd,
            record.timestamp,
        )
        .await?;
        let encoded = serde_json::to_string(&record)?;
        self.store
            .list_push(
                &ops_key(&record.caller_id),
                encoded,
                MAX_OPERATION_RECORDS,
                OPERATION_RETENTION,
            )
            .await
            .map_err(ledger_unavailable)?;
        Ok(())
    }

    /// The caller's accumulated spend for today (0.0 when absent).
    pub async fn daily_cost(&self, caller: &str) -> Result<f64> {
        self.daily_cost_at(caller, Utc::now()).await
    }

    async fn daily_cost_at(&self, caller: &str, now: DateTime<Utc>) -> Result<f64> {
        Ok(self
            .store
            .get_f64(&day_key(caller, now))
            .await
            .map_err(ledger_unavailable)?
            .unwrap_or(0.0))
    }

    /// Advisory budget check: `ok` iff current spend is strictly below
    /// `daily_limit_usd`.
    ///
    /// Read-then-compare: the true cost of a completion is only known
    /// after the provider responds, so the gateway checks before calling
    /// and charges after.
    pub async fn check_within_limit(
        &self,
        caller: &str,
        daily_limit_usd: f64,
    ) -> Result<BudgetStatus> {
        match self.daily_cost(caller).await {
            Ok(current_cost_usd) => Ok(BudgetStatus {
                ok: current_cost_usd < daily_limit_usd,
                current_cost_usd,
            }),
            Err(err) => match self.policy {
                FailurePolicy::Open => {
                    warn!(caller, error = %err, "cost ledger unavailable, failing open");
                    Ok(BudgetStatus {
                        ok: true,
                        current_cost_usd: 0.0,
                    })
                }
                FailurePolicy::Closed => Err(err),
            },
        }
    }

    /// Whether current spend has reached `threshold_fraction` of the limit.
    pub async fn check_warning_threshold(
        &self,
        caller: &str,
        limit_usd: f64,
        threshold_fraction: f64,
    ) -> Result<bool> {
        let current = self.daily_cost(caller).await?;
        Ok(current >= limit_usd * threshold_fraction)
    }

    /// Audit records for `caller` within the retention window, oldest
    /// first. Records past the window are filtered out on read; the
    /// backing list expires as a whole once the caller goes quiet.
    pub async fn recent_operations(&self, caller: &str) -> Result<Vec<OperationRecord>> {
        self.recent_operations_at(caller, Utc::now()).await
    }

    async fn recent_operations_at(
        &self,
        caller: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<OperationRecord>> {
        let cutoff = now - chrono::Duration::from_std(OPERATION_RETENTION).unwrap_or_default();
        let raw = self
            .store
            .list_range(&ops_key(caller))
            .await
            .map_err(ledger_unavailable)?;
        Ok(raw
            .iter()
            .filter_map(|entry| serde_json::from_str::<OperationRecord>(entry).ok())
            .filter(|record| record.timestamp >= cutoff)
            .collect())
    }
}

fn ledger_unavailable(err: StoreError) -> GatewayError {
    GatewayError::LedgerUnavailable(format!("{err}"))
}

fn day_key(caller: &str, now: DateTime<Utc>) -> String {
    format!("cost:{caller}:{}", now.format("%Y-%m-%d"))
}

fn ops_key(caller: &str) -> String {
    format!("ops:{caller}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn ledger() -> CostLedger {
        CostLedger::new(
            Arc::new(MemoryStore::new()),
            PricingTable::with_seed(),
            FailurePolicy::Closed,
        )
    }

    fn record(caller: &str, cost: f64, timestamp: DateTime<Utc>) -> OperationRecord {
        OperationRecord {
            operation_id: uuid::Uuid::new_v4().to_string(),
            caller_id: caller.to_owned(),
            operation_type: "completion".to_owned(),
            cost_usd: cost,
            tokens_used: 1200,
            model: "gpt-4o-mini".to_owned(),
            timestamp,
        }
    }

    #[tokio::test]
    async fn daily_total_accumulates() {
        let ledger = ledger();
        let now = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap();
        ledger
            .record_cost_at("alice", "completion", 0.10, now)
            .await
            .unwrap();
        ledger
            .record_cost_at("alice", "completion", 0.05, now)
            .await
            .unwrap();
        let total = ledger.daily_cost_at("alice", now).await.unwrap();
        assert!((total - 0.15).abs() < 1e-9);
    }

    #[tokio::test]
    async fn days_are_separate_buckets() {
        let ledger = ledger();
        let monday = Utc.with_ymd_and_hms(2021, 6, 7, 23, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2021, 6, 8, 1, 0, 0).unwrap();
        ledger
            .record_cost_at("bob", "completion", 0.40, monday)
            .await
            .unwrap();
        assert_eq!(ledger.daily_cost_at("bob", tuesday).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn within_limit_is_strict() {
        let ledger = ledger();
        let now = Utc.with_ymd_and_hms(2021, 6, 1, 9, 0, 0).unwrap();
        ledger
            .record_cost_at("carol", "completion", 0.96, now)
            .await
            .unwrap();

        // 0.96 of a 1.00 limit: warning fires, hard check still passes.
        assert!(
            ledger
                .check_warning_threshold("carol", 1.00, 0.8)
                .await
                .unwrap()
        );
        let status = ledger.check_within_limit("carol", 1.00).await.unwrap();
        assert!(status.ok);
        assert!((status.current_cost_usd - 0.96).abs() < 1e-9);

        // Pushing to the limit flips the check.
        ledger
            .record_cost_at("carol", "completion", 0.04, now)
            .await
            .unwrap();
        let status = ledger.check_within_limit("carol", 1.00).await.unwrap();
        assert!(!status.ok);
    }

    #[tokio::test]
    async fn operations_are_recorded_and_listed() {
        let ledger = ledger();
        let now = Utc::now();
        ledger.record_operation(record("dave", 0.02, now)).await.unwrap();
        ledger.record_operation(record("dave", 0.03, now)).await.unwrap();

        let ops = ledger.recent_operations("dave").await.unwrap();
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| op.caller_id == "dave"));

        // The daily accumulator matches the sum of recorded operations.
        let total = ledger.daily_cost("dave").await.unwrap();
        assert!((total - 0.05).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stale_operations_filtered_on_read() {
        let ledger = ledger();
        let now = Utc::now();
        let stale = now - chrono::Duration::days(8);
        ledger.record_operation(record("erin", 0.01, stale)).await.unwrap();
        ledger.record_operation(record("erin", 0.01, now)).await.unwrap();

        let ops = ledger.recent_operations("erin").await.unwrap();
        assert_eq!(ops.len(), 1);
    }

    #[tokio::test]
    async fn estimate_uses_pricing_table() {
        let ledger = ledger();
        let cost = ledger.estimate_cost(2_000_000, "gpt-4o-mini");
        assert!((cost - 0.90).abs() < 1e-9);
    }
}
