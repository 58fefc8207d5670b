//! LLM provider domain models and traits

mod message;
mod provider;
mod provider_config;
mod request;
mod response;
mod retry;

pub use message::{Message, MessageRole};
pub use provider::LlmProvider;
pub use provider_config::{DEFAULT_TIMEOUT_SECS, ProviderConfig, ProviderKind, model_id_problem};
pub use request::{GenerationOptions, LlmRequest, LlmRequestBuilder};
pub use response::{FinishReason, LlmResponse, Usage};
pub use retry::RetryConfig;

#[cfg(test)]
pub use provider::mock::MockLlmProvider;
