//! Gateway construction and orchestration

mod builder;
mod service;

pub use builder::{Heimdall, HeimdallBuilder};
pub use service::LlmGateway;
