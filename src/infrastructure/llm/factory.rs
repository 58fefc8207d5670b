use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, trace};

use super::http_client::HttpClient;
use super::{AnthropicProvider, GeminiProvider, OpenAiProvider, RetryingProvider};
use crate::config::LlmConfig;
use crate::domain::{
    DomainError, GenerationOptions, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole,
    ProviderConfig, ProviderKind,
};

/// Prompt sent when the caller supplies none
pub const DEFAULT_PROMPT: &str = "I am a jelly donut";

/// Single entry point for text generation.
///
/// Holds exactly one active provider, chosen at startup. Calls take `&self`
/// and share nothing mutable, so a factory can serve any number of
/// concurrent requests; clones share the same provider.
#[derive(Debug, Clone)]
pub struct LlmFactory {
    provider: Arc<dyn LlmProvider>,
}

impl LlmFactory {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Build the configured provider
    pub fn from_config(config: &LlmConfig) -> Result<Self, DomainError> {
        let provider_config = config.provider_config()?;
        let provider = Self::create_provider(config.provider, provider_config)?;

        info!(
            provider = provider.provider_name(),
            model = provider.default_model(),
            "LLM provider initialized"
        );

        Ok(Self::new(provider))
    }

    /// Create a provider client, wrapped in the retry decorator when its
    /// policy allows retries
    pub fn create_provider(
        kind: ProviderKind,
        config: ProviderConfig,
    ) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let http_client = HttpClient::with_timeout(config.timeout())?;
        let retry = config.retry().clone();

        let provider: Arc<dyn LlmProvider> = match kind {
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(http_client, config)?),
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(http_client, config)?),
            ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(http_client, config)?),
        };

        if retry.is_enabled() {
            Ok(Arc::new(RetryingProvider::new(provider, retry)))
        } else {
            Ok(provider)
        }
    }

    /// The prompt a call will actually send: the caller's, or
    /// [`DEFAULT_PROMPT`] when there is none
    pub fn effective_prompt(prompt: Option<&str>) -> Result<&str, DomainError> {
        match prompt {
            None => Ok(DEFAULT_PROMPT),
            Some(p) if p.trim().is_empty() => {
                Err(DomainError::invalid_request("Prompt must not be blank"))
            }
            Some(p) => Ok(p),
        }
    }

    /// Generate text for a single prompt
    pub async fn generate_text(
        &self,
        prompt: Option<&str>,
        options: GenerationOptions,
    ) -> Result<LlmResponse, DomainError> {
        let prompt = Self::effective_prompt(prompt)?;
        options.validate()?;
        let request = LlmRequest::builder().user(prompt).options(options).build();

        self.dispatch("generate_text", request).await
    }

    /// Stateless multi-message call; nothing is retained between calls
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<LlmResponse, DomainError> {
        if messages.is_empty() {
            return Err(DomainError::invalid_request(
                "Chat requires at least one message",
            ));
        }

        if !messages.iter().any(|m| m.role() == MessageRole::User) {
            return Err(DomainError::invalid_request(
                "Chat requires at least one user message",
            ));
        }

        options.validate()?;

        let request = LlmRequest::builder()
            .messages(messages)
            .options(options)
            .build();

        self.dispatch("chat", request).await
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn default_model(&self) -> &str {
        self.provider.default_model()
    }

    async fn dispatch(
        &self,
        operation: &'static str,
        request: LlmRequest,
    ) -> Result<LlmResponse, DomainError> {
        let provider = self.provider.provider_name();
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string());

        trace!(
            provider,
            model = %model,
            prompt = request.last_user_content().unwrap_or_default(),
            "Dispatching {}",
            operation
        );

        let started = Instant::now();
        let result = self.provider.generate(request).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) if response.text.trim().is_empty() => {
                let err = DomainError::invalid_upstream(provider, "Provider returned empty text");
                error!(
                    provider,
                    model = %model,
                    kind = ?err.kind(),
                    latency_ms,
                    "{} failed",
                    operation
                );
                Err(err)
            }
            Ok(response) => {
                info!(
                    provider,
                    model = %response.model,
                    latency_ms,
                    "{} succeeded",
                    operation
                );
                trace!(text = %response.text, "Generated text");
                Ok(response.with_latency_ms(latency_ms))
            }
            Err(e) => {
                error!(
                    provider,
                    model = %model,
                    kind = ?e.kind(),
                    latency_ms,
                    error = %e,
                    "{} failed",
                    operation
                );
                Err(e)
            }
        }
    }
}
