//! Gateway orchestration.
//!
//! [`LlmGateway::generate_completion`] is the single entry point: admit,
//! check budget, trim context, consult the cache, call the provider at
//! most once, then charge and cache. All shared state lives in the
//! injected store; the gateway itself holds no locks across any await
//! point, so any number of handlers can call it concurrently.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::cache::ResponseCache;
use crate::context;
use crate::ledger::{CostLedger, OperationRecord};
use crate::limiter::{RateLimiter, RateLimits};
use crate::provider::CompletionProvider;
use crate::telemetry;
use crate::types::{CompletionParams, CompletionRequest, CompletionResponse, UserUsage};
use crate::{GatewayError, Result};

/// Resolved gateway configuration.
pub(super) struct GatewaySettings {
    pub limits: RateLimits,
    pub daily_budget_usd: f64,
    pub warn_threshold: f64,
    pub provider_timeout: Duration,
    pub default_model: String,
    pub default_temperature: f32,
    pub default_max_tokens: u32,
    pub max_context_messages: usize,
    pub max_context_tokens: usize,
}

/// The LLM request gateway.
///
/// Construct via [`Heimdall::builder()`](crate::Heimdall::builder).
pub struct LlmGateway {
    provider: Arc<dyn CompletionProvider>,
    limiter: RateLimiter,
    ledger: CostLedger,
    cache: Option<ResponseCache>,
    settings: GatewaySettings,
}

impl LlmGateway {
    pub(super) fn new(
        provider: Arc<dyn CompletionProvider>,
        limiter: RateLimiter,
        ledger: CostLedger,
        cache: Option<ResponseCache>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            provider,
            limiter,
            ledger,
            cache,
            settings,
        }
    }

    /// Generate a completion for `params`, attributed to `caller`.
    ///
    /// When `caller` is present, admission and budget checks run first and
    /// the resulting cost is charged to the caller's daily ledger.
    /// Anonymous calls skip accounting entirely.
    ///
    /// Within the cache TTL, repeated structurally identical requests
    /// produce at most one provider call and one ledger charge; hits are
    /// served with `cached = true` at zero incremental cost.
    #[instrument(skip_all, fields(caller = caller.unwrap_or("-")))]
    pub async fn generate_completion(
        &self,
        caller: Option<&str>,
        params: CompletionParams,
    ) -> Result<CompletionResponse> {
        if params.messages.is_empty() {
            return Err(GatewayError::InvalidInput("messages must not be empty".into()));
        }
        let use_cache = params.use_cache.unwrap_or(true);
        let trim_context = params.trim_context.unwrap_or(true);

        if let Some(caller) = caller {
            self.admit(caller).await?;
        }

        let mut request = self.resolve(params);
        if trim_context {
            request.messages = context::trim_messages(
                &request.messages,
                request.system_prompt.as_deref(),
                self.settings.max_context_messages,
                self.settings.max_context_tokens,
            );
        }

        if use_cache && let Some(cache) = &self.cache {
            if let Some(mut hit) = cache.lookup(&request).await {
                hit.cached = true;
                metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => "cached").increment(1);
                debug!(model = %request.model, "served completion from cache");
                return Ok(hit);
            }
        }

        let response = match self.call_provider(&request).await {
            Ok(response) => response,
            Err(e) => {
                metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => "error").increment(1);
                return Err(e);
            }
        };

        if use_cache && let Some(cache) = &self.cache {
            cache.store(&request, &response).await;
        }
        if let Some(caller) = caller {
            self.charge(caller, &response).await;
        }

        metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => "ok").increment(1);
        Ok(response)
    }

    /// Current admission counters for a caller, for UI display.
    pub async fn get_user_usage(&self, caller: &str) -> Result<UserUsage> {
        self.limiter.usage(caller, &self.settings.limits).await
    }

    /// A caller's accumulated spend for today, in USD.
    pub async fn get_daily_cost(&self, caller: &str) -> Result<f64> {
        self.ledger.daily_cost(caller).await
    }

    /// A caller's recorded operations within the audit window.
    pub async fn get_recent_operations(&self, caller: &str) -> Result<Vec<OperationRecord>> {
        self.ledger.recent_operations(caller).await
    }

    /// Admission control and budget check; both must pass before any
    /// provider work happens.
    async fn admit(&self, caller: &str) -> Result<()> {
        let admission = self
            .limiter
            .check_and_record(caller, &self.settings.limits)
            .await?;
        if !admission.allowed {
            return Err(GatewayError::RateLimited {
                retry_after: admission.retry_after.unwrap_or(Duration::from_secs(60)),
            });
        }

        let budget = self.settings.daily_budget_usd;
        let status = self.ledger.check_within_limit(caller, budget).await?;
        if !status.ok {
            metrics::counter!(telemetry::BUDGET_REJECTIONS_TOTAL).increment(1);
            return Err(GatewayError::BudgetExceeded {
                current_cost_usd: status.current_cost_usd,
                daily_limit_usd: budget,
            });
        }
        if self
            .ledger
            .check_warning_threshold(caller, budget, self.settings.warn_threshold)
            .await?
        {
            warn!(
                caller,
                current_cost_usd = status.current_cost_usd,
                daily_limit_usd = budget,
                "caller approaching daily budget"
            );
        }
        Ok(())
    }

    /// Fill unset request fields from the configured defaults.
    fn resolve(&self, params: CompletionParams) -> CompletionRequest {
        CompletionRequest {
            messages: params.messages,
            system_prompt: params.system_prompt,
            model: params
                .model
                .unwrap_or_else(|| self.settings.default_model.clone()),
            temperature: params
                .temperature
                .unwrap_or(self.settings.default_temperature),
            max_tokens: params.max_tokens.unwrap_or(self.settings.default_max_tokens),
        }
    }

    /// Call the provider exactly once, bounded by the configured timeout,
    /// and wrap the raw completion in a response envelope.
    ///
    /// On timeout or error nothing is cached and nothing is charged;
    /// only actually billed usage is ever recorded.
    async fn call_provider(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let started = Instant::now();
        let timeout = self.settings.provider_timeout;
        let completion = tokio::time::timeout(timeout, self.provider.complete(request))
            .await
            .map_err(|_| GatewayError::Timeout(timeout))??;
        let elapsed = started.elapsed();

        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS).record(elapsed.as_secs_f64());
        metrics::counter!(telemetry::TOKENS_TOTAL, "direction" => "prompt")
            .increment(u64::from(completion.prompt_tokens));
        metrics::counter!(telemetry::TOKENS_TOTAL, "direction" => "completion")
            .increment(u64::from(completion.completion_tokens));

        let cost_usd = self
            .ledger
            .estimate_cost(u64::from(completion.total_tokens), &request.model);
        metrics::histogram!(telemetry::COST_USD).record(cost_usd);

        Ok(CompletionResponse {
            content: completion.content,
            model: completion.model,
            provider: self.provider.name().to_owned(),
            tokens_used: completion.total_tokens,
            prompt_tokens: completion.prompt_tokens,
            completion_tokens: completion.completion_tokens,
            finish_reason: completion.finish_reason,
            response_time_ms: elapsed.as_millis() as u64,
            timestamp: Utc::now(),
            cached: false,
            cost_usd,
        })
    }

    /// Charge a completed call to the caller's ledger.
    ///
    /// The response has already been produced and paid for upstream, so a
    /// recording failure degrades to a warning rather than failing the
    /// request; accounting is advisory (see ledger docs).
    async fn charge(&self, caller: &str, response: &CompletionResponse) {
        let record = OperationRecord {
            operation_id: Uuid::new_v4().to_string(),
            caller_id: caller.to_owned(),
            operation_type: "completion".to_owned(),
            cost_usd: response.cost_usd,
            tokens_used: response.tokens_used,
            model: response.model.clone(),
            timestamp: response.timestamp,
        };
        if let Err(e) = self.ledger.record_operation(record).await {
            warn!(caller, error = %e, "failed to record completion cost");
        }
    }
}
