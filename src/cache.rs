//! Content-addressed response cache.
//!
//! Keyed by a SHA-256 digest of the canonical JSON encoding of the fully
//! resolved [`CompletionRequest`] — messages in order, system prompt,
//! model, temperature, max tokens. Structurally identical requests always
//! address the same entry; any field difference (including message order)
//! produces a different key. The digest is stable across processes, so
//! multiple gateway instances sharing a [`KvStore`] deduplicate each
//! other's work.
//!
//! Entries carry a fixed TTL (default one hour) and there is no explicit
//! invalidation path: staleness is bounded by the TTL. Caching completions
//! produced at non-zero temperature is a deliberate fidelity/cost
//! trade-off; callers that need fresh sampling disable the cache per
//! request.
//!
//! The cache is a pure optimization layer, never a correctness
//! dependency: backend failures degrade lookups to misses and skip
//! stores, with a warning and an error counter.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::store::KvStore;
use crate::telemetry;
use crate::types::{CompletionRequest, CompletionResponse};

/// Configuration for the response cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live for cached entries. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Response cache over a shared key-value store.
pub struct ResponseCache {
    store: Arc<dyn KvStore>,
    config: CacheConfig,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KvStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Look up a cached response for a structurally identical request.
    ///
    /// Returns `None` on miss, on an unreadable entry, and on backend
    /// failure. Emits hit/miss metrics.
    pub async fn lookup(&self, request: &CompletionRequest) -> Option<CompletionResponse> {
        let key = cache_key(request);
        let raw = match self.store.get(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                metrics::counter!(telemetry::CACHE_ERRORS_TOTAL).increment(1);
                warn!(error = %e, "cache lookup failed, treating as miss");
                return None;
            }
        };
        match raw.as_deref().map(serde_json::from_str::<CompletionResponse>) {
            Some(Ok(response)) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(response)
            }
            Some(Err(e)) => {
                metrics::counter!(telemetry::CACHE_ERRORS_TOTAL).increment(1);
                warn!(error = %e, "cache entry unreadable, treating as miss");
                None
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Store a response under its request's content address.
    ///
    /// Backend failures are logged and swallowed; a missed store only
    /// costs a future cache miss.
    pub async fn store(&self, request: &CompletionRequest, response: &CompletionResponse) {
        let key = cache_key(request);
        let encoded = match serde_json::to_string(response) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "failed to encode response for cache");
                return;
            }
        };
        if let Err(e) = self.store.set(&key, encoded, self.config.ttl).await {
            metrics::counter!(telemetry::CACHE_ERRORS_TOTAL).increment(1);
            warn!(error = %e, "cache store failed, skipping");
        }
    }
}

/// Compute the content address of a request.
///
/// SHA-256 over the canonical JSON encoding. serde_json emits struct
/// fields and sequence elements in declaration order, so the encoding is
/// stable and order-preserving across processes.
fn cache_key(request: &CompletionRequest) -> String {
    let canonical =
        serde_json::to_string(request).expect("CompletionRequest serialization cannot fail");
    let digest = Sha256::digest(canonical.as_bytes());
    format!("cache:{digest:x}")
}
