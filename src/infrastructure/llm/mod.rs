//! LLM provider implementations

mod anthropic;
mod factory;
mod gemini;
mod http_client;
mod openai;
mod retrying;

pub use anthropic::AnthropicProvider;
pub use factory::{DEFAULT_PROMPT, LlmFactory};
pub use gemini::GeminiProvider;
pub use http_client::{HttpClient, HttpClientTrait, extract_error_message, with_deadline};
pub use openai::OpenAiProvider;
pub use retrying::RetryingProvider;
