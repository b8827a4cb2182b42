//! Shared key-value store abstraction.
//!
//! All of the gateway's shared, mutable state — admission counters, the
//! cost ledger, and the response cache — lives behind [`KvStore`], a small
//! set of primitives (atomic increment-with-expiration, get/set with
//! expiration, bounded list push) that any shared store with TTL support
//! can satisfy. The gateway depends only on these primitives, never on a
//! specific backend.
//!
//! [`memory::MemoryStore`] is the in-process implementation for
//! single-instance deployments and tests. A multi-instance deployment
//! injects a networked implementation via
//! [`HeimdallBuilder::store()`](crate::HeimdallBuilder::store); gateway
//! logic is unchanged either way.
//!
//! # Counter semantics
//!
//! `incr` must be atomic under concurrent writers: two concurrent calls on
//! the same key observe distinct post-increment values. The same holds for
//! `add_f64`, where a lost update would under-count spend. Implementations
//! must not use naive read-modify-write.

pub mod memory;

pub use memory::MemoryStore;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Store-level failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// What the limiter and ledger do when their backing store is down.
///
/// `Closed` (default) rejects the request with a distinguishable error so
/// the caller can surface a retry; `Open` admits it and logs a warning.
/// The response cache is not governed by this policy; it always degrades
/// to a miss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Closed,
    Open,
}

/// Shared key-value store with TTL-expiration primitives.
///
/// Keys are flat strings, namespaced by the caller (`rate:`, `cost:`,
/// `ops:`, `cache:`). Entries expire on their own; nothing is explicitly
/// deleted.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Atomically increment a counter, creating it with `ttl` if absent.
    /// Returns the post-increment value.
    async fn incr(&self, key: &str, ttl: Duration) -> StoreResult<u64>;

    /// Read a counter without modifying it.
    async fn get_u64(&self, key: &str) -> StoreResult<Option<u64>>;

    /// Atomically add to a float accumulator, (re-)arming its expiration
    /// to `ttl`. Returns the post-add value.
    async fn add_f64(&self, key: &str, amount: f64, ttl: Duration) -> StoreResult<f64>;

    /// Read a float accumulator without modifying it.
    async fn get_f64(&self, key: &str) -> StoreResult<Option<f64>>;

    /// Read a string value.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a string value with an expiration.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()>;

    /// Append to a list, dropping the oldest entries beyond `max_len`,
    /// (re-)arming the list's expiration to `ttl`.
    async fn list_push(
        &self,
        key: &str,
        value: String,
        max_len: usize,
        ttl: Duration,
    ) -> StoreResult<()>;

    /// Read a whole list, oldest first. Empty if absent.
    async fn list_range(&self, key: &str) -> StoreResult<Vec<String>>;
}
