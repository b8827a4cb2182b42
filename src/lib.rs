//! Heimdall - Admission-controlled request gateway for paid LLM APIs
//!
//! This crate turns an application-level "generate a completion" request
//! into a safe call against a paid, rate-limited text-generation provider:
//! per-caller admission control (request-rate and daily spend budgets),
//! content-addressed response caching, context-window trimming, and
//! crash-safe cost accounting — all backed by a shared key-value store so
//! multiple gateway instances stay correct together.
//!
//! # Example
//!
//! ```rust,no_run
//! use heimdall::{CompletionParams, Heimdall, Message, RateLimits};
//!
//! #[tokio::main]
//! async fn main() -> heimdall::Result<()> {
//!     let gateway = Heimdall::builder()
//!         .openai("sk-your-key")
//!         .limits(RateLimits::new(10, 200))
//!         .daily_budget_usd(1.0)
//!         .build()?;
//!
//!     let response = gateway
//!         .generate_completion(
//!             Some("user-42"),
//!             CompletionParams::new(vec![Message::user("What is the capital of France?")])
//!                 .system_prompt("You are a patient tutor."),
//!         )
//!         .await?;
//!
//!     println!("{} (${:.4})", response.content, response.cost_usd);
//!     Ok(())
//! }
//! ```
//!
//! # Degradation
//!
//! The limiter and ledger fail closed by default when their store is
//! unreachable (configurable via
//! [`FailurePolicy`](crate::store::FailurePolicy)); the response cache
//! always fails open to a miss. No failure path ever fabricates a
//! successful completion.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod limiter;
pub mod provider;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use error::{GatewayError, Result};
pub use gateway::{Heimdall, HeimdallBuilder, LlmGateway};

pub use cache::CacheConfig;
pub use config::{Config, Secrets};
pub use ledger::{BudgetStatus, CostLedger, OperationRecord, PricingTable};
pub use limiter::{Admission, RateLimiter, RateLimits};
pub use provider::{CompletionProvider, HttpCompletionProvider, ProviderCompletion};
pub use store::{FailurePolicy, KvStore, MemoryStore, StoreError};
pub use types::{
    CompletionParams, CompletionRequest, CompletionResponse, FinishReason, Message, Role,
    UserUsage,
};
