//! Domain layer - Core types and provider contract

pub mod error;
pub mod llm;

pub use error::{DomainError, ProviderErrorKind};
pub use llm::{
    FinishReason, GenerationOptions, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse,
    Message, MessageRole, ProviderConfig, ProviderKind, RetryConfig, Usage,
};
