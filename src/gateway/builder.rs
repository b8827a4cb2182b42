//! Builder for configuring gateway instances.
//!
//! The gateway is an explicitly constructed, dependency-injected service:
//! callers hold the [`LlmGateway`](super::LlmGateway) they build and pass
//! it where it is needed. There is no module-level global.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheConfig, ResponseCache};
use crate::ledger::{CostLedger, PricingTable};
use crate::limiter::{RateLimiter, RateLimits};
use crate::provider::{CompletionProvider, HttpCompletionProvider};
use crate::store::{FailurePolicy, KvStore, MemoryStore};
use crate::{GatewayError, Result};

use super::LlmGateway;
use super::service::GatewaySettings;

/// Main entry point for creating gateway instances.
pub struct Heimdall;

impl Heimdall {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> HeimdallBuilder {
        HeimdallBuilder::new()
    }
}

/// Builder for configuring gateway instances.
pub struct HeimdallBuilder {
    provider: Option<Arc<dyn CompletionProvider>>,
    store: Option<Arc<dyn KvStore>>,
    limits: RateLimits,
    daily_budget_usd: f64,
    warn_threshold: f64,
    pricing: PricingTable,
    cache: Option<CacheConfig>,
    failure_policy: FailurePolicy,
    provider_timeout: Duration,
    default_model: String,
    default_temperature: f32,
    default_max_tokens: u32,
    max_context_messages: usize,
    max_context_tokens: usize,
}

impl HeimdallBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            store: None,
            limits: RateLimits::default(),
            daily_budget_usd: 10.0,
            warn_threshold: 0.8,
            pricing: PricingTable::with_seed(),
            cache: Some(CacheConfig::default()),
            failure_policy: FailurePolicy::default(),
            provider_timeout: Duration::from_secs(60),
            default_model: "gpt-4o-mini".to_owned(),
            default_temperature: 0.7,
            default_max_tokens: 1024,
            max_context_messages: 20,
            max_context_tokens: 4_000,
        }
    }

    /// Use a custom provider implementation.
    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Configure the default OpenAI-compatible HTTP provider.
    pub fn openai(self, api_key: impl Into<String>) -> Self {
        let timeout = self.provider_timeout;
        self.provider(Arc::new(
            HttpCompletionProvider::new(api_key).timeout(timeout),
        ))
    }

    /// Configure an OpenAI-compatible provider at a custom base URL.
    pub fn openai_compatible(
        self,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let timeout = self.provider_timeout;
        self.provider(Arc::new(
            HttpCompletionProvider::with_base_url(api_key, base_url).timeout(timeout),
        ))
    }

    /// Inject the shared key-value store backing counters, ledger, and
    /// cache. Defaults to an in-process [`MemoryStore`].
    pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set per-caller admission caps.
    pub fn limits(mut self, limits: RateLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the per-caller daily budget in USD.
    pub fn daily_budget_usd(mut self, budget: f64) -> Self {
        self.daily_budget_usd = budget;
        self
    }

    /// Set the budget fraction at which a warning is logged (default 0.8).
    pub fn warn_threshold(mut self, fraction: f64) -> Self {
        self.warn_threshold = fraction;
        self
    }

    /// Replace the pricing table.
    pub fn pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    /// Configure the response cache (enabled with defaults otherwise).
    pub fn response_cache(mut self, config: CacheConfig) -> Self {
        self.cache = Some(config);
        self
    }

    /// Disable the response cache entirely.
    pub fn disable_response_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Set the fail-open/fail-closed policy for limiter and ledger
    /// store outages (default: fail closed).
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Bound the provider call (default: 60 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Model used when a request does not name one.
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Temperature used when a request does not set one (default 0.7).
    pub fn default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = temperature;
        self
    }

    /// Max completion tokens when a request does not set them.
    pub fn default_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens;
        self
    }

    /// Context-trimming caps: message count and estimated token budget.
    pub fn context_window(mut self, max_messages: usize, max_tokens: usize) -> Self {
        self.max_context_messages = max_messages;
        self.max_context_tokens = max_tokens;
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<LlmGateway> {
        let provider = self.provider.ok_or(GatewayError::NoProvider)?;
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));

        let limiter = RateLimiter::new(store.clone(), self.failure_policy);
        let ledger = CostLedger::new(store.clone(), self.pricing, self.failure_policy);
        let cache = self
            .cache
            .map(|config| ResponseCache::new(store, config));

        Ok(LlmGateway::new(
            provider,
            limiter,
            ledger,
            cache,
            GatewaySettings {
                limits: self.limits,
                daily_budget_usd: self.daily_budget_usd,
                warn_threshold: self.warn_threshold,
                provider_timeout: self.provider_timeout,
                default_model: self.default_model,
                default_temperature: self.default_temperature,
                default_max_tokens: self.default_max_tokens,
                max_context_messages: self.max_context_messages,
                max_context_tokens: self.max_context_tokens,
            },
        ))
    }
}

impl Default for HeimdallBuilder {
    fn default() -> Self {
        Self::new()
    }
}
