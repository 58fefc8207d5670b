use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::{DomainError, LlmProvider, LlmRequest, LlmResponse, RetryConfig};

/// Provider decorator that re-issues failed calls with exponential backoff.
///
/// Only transient, timeout and rate-limit failures are retried; everything
/// else surfaces after the first attempt.
#[derive(Debug)]
pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
    retry: RetryConfig,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, retry: RetryConfig) -> Self {
        Self { inner, retry }
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                let delay = self.retry.delay_for_attempt(attempt - 1);
                debug!(
                    provider = self.inner.provider_name(),
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }

            match self.inner.generate(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                    warn!(
                        provider = self.inner.provider_name(),
                        attempt = attempt + 1,
                        max_attempts = max_attempts,
                        error = %e,
                        "Provider call failed, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProviderErrorKind;
    use crate::domain::llm::MockLlmProvider;
    use std::time::Duration;

    fn request() -> LlmRequest {
        LlmRequest::builder().user("Explain photosynthesis").build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_authentication_failure_is_not_retried() {
        let mock = Arc::new(
            MockLlmProvider::new("gemini")
                .with_error(ProviderErrorKind::Authentication, "API key not valid"),
        );
        let provider = RetryingProvider::new(mock.clone(), RetryConfig::new(3));

        let error = provider.generate(request()).await.unwrap_err();

        assert_eq!(error.kind(), Some(ProviderErrorKind::Authentication));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_succeed_on_third_attempt() {
        let mock = Arc::new(
            MockLlmProvider::new("gemini")
                .with_error(ProviderErrorKind::Transient, "HTTP 503")
                .with_error(ProviderErrorKind::RateLimited, "HTTP 429")
                .with_response("Plants turn light into sugar."),
        );
        let provider = RetryingProvider::new(
            mock.clone(),
            RetryConfig::new(2).with_initial_delay(100).with_max_delay(1000),
        );

        let started = tokio::time::Instant::now();
        let response = provider.generate(request()).await.unwrap();

        assert_eq!(response.text, "Plants turn light into sugar.");
        assert_eq!(mock.call_count(), 3);
        // 100ms then 200ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let mock = Arc::new(
            MockLlmProvider::new("openai")
                .with_error(ProviderErrorKind::Timeout, "timed out")
                .with_error(ProviderErrorKind::Timeout, "timed out")
                .with_error(ProviderErrorKind::Timeout, "timed out again")
                .with_response("too late"),
        );
        let provider = RetryingProvider::new(mock.clone(), RetryConfig::new(2));

        let error = provider.generate(request()).await.unwrap_err();

        assert_eq!(error.kind(), Some(ProviderErrorKind::Timeout));
        assert!(error.to_string().contains("timed out again"));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_policy_surfaces_first_failure() {
        let mock = Arc::new(
            MockLlmProvider::new("gemini")
                .with_error(ProviderErrorKind::Transient, "HTTP 502")
                .with_response("never reached"),
        );
        let provider = RetryingProvider::new(mock.clone(), RetryConfig::disabled());

        let error = provider.generate(request()).await.unwrap_err();

        assert_eq!(error.kind(), Some(ProviderErrorKind::Transient));
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_delegates_identity() {
        let mock = Arc::new(MockLlmProvider::new("anthropic").with_model("claude-test"));
        let provider = RetryingProvider::new(mock, RetryConfig::default());

        assert_eq!(provider.provider_name(), "anthropic");
        assert_eq!(provider.default_model(), "claude-test");
    }
}
