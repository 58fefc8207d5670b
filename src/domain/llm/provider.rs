use async_trait::async_trait;
use std::fmt::Debug;

use super::{LlmRequest, LlmResponse};
use crate::domain::DomainError;

/// Trait for LLM providers (Gemini, OpenAI, Anthropic)
///
/// Implementations translate the normalized request into their backend's
/// wire format and map the reply, or the failure, back into the shared
/// shapes. Instances are shared read-only across concurrent calls.
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Run a single generation call
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Model used when a request does not name one
    fn default_model(&self) -> &str;
}
