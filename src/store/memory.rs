//! In-process [`KvStore`] implementation.
//!
//! Backed by moka's sync cache with per-entry TTL (via the [`Expiry`]
//! policy — each stored value carries its own lifetime) and the entry API
//! for atomic read-modify-write, so counter increments are race-free
//! without an external store.
//!
//! Counter keys embed their window bucket, so a TTL re-armed on update
//! only delays garbage collection and never extends a window.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::sync::Cache;

use super::{KvStore, StoreResult};

/// Default maximum number of live entries.
const DEFAULT_MAX_ENTRIES: u64 = 100_000;

#[derive(Clone, Debug)]
enum Value {
    Count(u64),
    Amount(f64),
    Text(String),
    List(Vec<String>),
}

#[derive(Clone, Debug)]
struct Stored {
    value: Value,
    ttl: Duration,
}

/// Per-entry expiration: every value carries its own TTL.
struct PerEntryTtl;

impl Expiry<String, Stored> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Stored,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Stored,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Thread-safe in-memory store with TTL expiration.
///
/// Suitable for single-process deployments and tests; for multi-instance
/// deployments, inject a networked [`KvStore`] instead.
pub struct MemoryStore {
    entries: Cache<String, Stored>,
}

impl MemoryStore {
    /// Create a store with the default capacity.
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    /// Create a store with a custom max capacity.
    pub fn with_max_entries(max: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// Number of live entries (approximate, for diagnostics).
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn incr(&self, key: &str, ttl: Duration) -> StoreResult<u64> {
        let entry = self.entries.entry_by_ref(key).and_upsert_with(|existing| {
            let current = match existing.map(|e| e.into_value().value) {
                Some(Value::Count(n)) => n,
                _ => 0,
            };
            Stored {
                value: Value::Count(current + 1),
                ttl,
            }
        });
        match entry.into_value().value {
            Value::Count(n) => Ok(n),
            _ => unreachable!("incr always stores a count"),
        }
    }

    async fn get_u64(&self, key: &str) -> StoreResult<Option<u64>> {
        Ok(match self.entries.get(key).map(|s| s.value) {
            Some(Value::Count(n)) => Some(n),
            _ => None,
        })
    }

    async fn add_f64(&self, key: &str, amount: f64, ttl: Duration) -> StoreResult<f64> {
        let entry = self.entries.entry_by_ref(key).and_upsert_with(|existing| {
            let current = match existing.map(|e| e.into_value().value) {
                Some(Value::Amount(v)) => v,
                _ => 0.0,
            };
            Stored {
                value: Value::Amount(current + amount),
                ttl,
            }
        });
        match entry.into_value().value {
            Value::Amount(v) => Ok(v),
            _ => unreachable!("add_f64 always stores an amount"),
        }
    }

    async fn get_f64(&self, key: &str) -> StoreResult<Option<f64>> {
        Ok(match self.entries.get(key).map(|s| s.value) {
            Some(Value::Amount(v)) => Some(v),
            _ => None,
        })
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(match self.entries.get(key).map(|s| s.value) {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        })
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        self.entries.insert(
            key.to_owned(),
            Stored {
                value: Value::Text(value),
                ttl,
            },
        );
        Ok(())
    }

    async fn list_push(
        &self,
        key: &str,
        value: String,
        max_len: usize,
        ttl: Duration,
    ) -> StoreResult<()> {
        self.entries.entry_by_ref(key).and_upsert_with(|existing| {
            let mut list = match existing.map(|e| e.into_value().value) {
                Some(Value::List(l)) => l,
                _ => Vec::new(),
            };
            list.push(value);
            if list.len() > max_len {
                let excess = list.len() - max_len;
                list.drain(..excess);
            }
            Stored {
                value: Value::List(list),
                ttl,
            }
        });
        Ok(())
    }

    async fn list_range(&self, key: &str) -> StoreResult<Vec<String>> {
        Ok(match self.entries.get(key).map(|s| s.value) {
            Some(Value::List(l)) => l,
            _ => Vec::new(),
        })
    }
}
