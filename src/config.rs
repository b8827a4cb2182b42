//! Configuration loading for gateway deployments.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. explicit path (if provided)
//! 2. `~/.heimdall/config.toml` (user)
//! 3. `/etc/heimdall/config.toml` (system)
//!
//! The provider API key is loaded separately with a mandatory permission
//! check on `~/.heimdall/secrets.toml` (must be 0600), falling back to the
//! `HEIMDALL_API_KEY` environment variable.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::gateway::HeimdallBuilder;
use crate::ledger::PricingTable;
use crate::limiter::RateLimits;
use crate::store::FailurePolicy;
use crate::{GatewayError, Heimdall, Result};

/// Gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

/// Upstream provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// OpenAI-compatible base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model used when a request does not name one.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Temperature used when a request does not set one.
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
    /// Max completion tokens when a request does not set them.
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
    /// Provider call timeout in seconds (default: 60).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout() -> u64 {
    60
}

/// Per-caller admission caps.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_rpm")]
    pub requests_per_minute: u32,
    #[serde(default = "default_rpd")]
    pub requests_per_day: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_rpm(),
            requests_per_day: default_rpd(),
        }
    }
}

fn default_rpm() -> u32 {
    30
}

fn default_rpd() -> u32 {
    500
}

/// Daily spend budget.
#[derive(Debug, Clone, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_daily_limit")]
    pub daily_limit_usd: f64,
    /// Fraction of the limit at which a warning is logged.
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: f64,
    /// Behaviour when the counter/ledger store is unreachable.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            daily_limit_usd: default_daily_limit(),
            warn_threshold: default_warn_threshold(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

fn default_daily_limit() -> f64 {
    10.0
}

fn default_warn_threshold() -> f64 {
    0.8
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    3600
}

/// Context-trimming caps.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    #[serde(default = "default_token_budget")]
    pub max_tokens: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            max_tokens: default_token_budget(),
        }
    }
}

fn default_max_messages() -> usize {
    20
}

fn default_token_budget() -> usize {
    4_000
}

/// Pricing table overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PricingConfig {
    /// Price for models not listed under `[pricing.models]`.
    #[serde(default)]
    pub default_per_million_usd: Option<f64>,
    /// Model → USD per million tokens.
    #[serde(default)]
    pub models: HashMap<String, f64>,
}

impl Config {
    /// Load configuration from the standard locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        Self::load_from_file(&path)
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GatewayError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            GatewayError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(GatewayError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".heimdall").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/heimdall/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(GatewayError::Configuration(
            "No config file found. Create ~/.heimdall/config.toml or /etc/heimdall/config.toml"
                .to_string(),
        ))
    }

    /// Build the pricing table this config describes.
    pub fn pricing_table(&self) -> PricingTable {
        let mut table = PricingTable::with_seed();
        if let Some(default) = self.pricing.default_per_million_usd {
            table = table.default_price(default);
        }
        for (model, price) in &self.pricing.models {
            table = table.price(model.clone(), *price);
        }
        table
    }

    /// Wire a gateway builder from this config and the loaded secrets.
    ///
    /// The store defaults to in-memory; multi-instance deployments call
    /// [`HeimdallBuilder::store()`] on the result before building.
    pub fn gateway_builder(&self, secrets: &Secrets) -> Result<HeimdallBuilder> {
        let api_key = secrets.api_key().ok_or_else(|| {
            GatewayError::Configuration(
                "No provider API key. Set HEIMDALL_API_KEY or ~/.heimdall/secrets.toml"
                    .to_string(),
            )
        })?;

        let mut builder = Heimdall::builder()
            .timeout(Duration::from_secs(self.provider.timeout_secs))
            .openai_compatible(api_key, self.provider.base_url.clone())
            .limits(RateLimits::new(
                self.limits.requests_per_minute,
                self.limits.requests_per_day,
            ))
            .daily_budget_usd(self.budget.daily_limit_usd)
            .warn_threshold(self.budget.warn_threshold)
            .failure_policy(self.budget.failure_policy)
            .pricing(self.pricing_table())
            .default_model(self.provider.default_model.clone())
            .default_temperature(self.provider.default_temperature)
            .default_max_tokens(self.provider.default_max_tokens)
            .context_window(self.context.max_messages, self.context.max_tokens);

        builder = if self.cache.enabled {
            builder.response_cache(CacheConfig::new().ttl(Duration::from_secs(self.cache.ttl_secs)))
        } else {
            builder.disable_response_cache()
        };
        Ok(builder)
    }
}

/// Provider secrets (API key).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub provider: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

/// Environment variable consulted when no secrets file has a key.
const API_KEY_ENV_VAR: &str = "HEIMDALL_API_KEY";

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (the env var may still
    /// provide a key).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".heimdall").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/heimdall/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            GatewayError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            GatewayError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            GatewayError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(GatewayError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// The provider API key, falling back to `HEIMDALL_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.provider
            .as_ref()
            .map(|s| s.api_key.clone())
            .or_else(|| std::env::var(API_KEY_ENV_VAR).ok())
    }
}
