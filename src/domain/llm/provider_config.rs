//! Static per-provider settings, resolved once at startup

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RetryConfig;
use crate::domain::DomainError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Why `model` cannot be used as a model identifier, if it cannot.
///
/// Identifiers end up in request URL paths, so path and query delimiters
/// are refused.
pub fn model_id_problem(model: &str) -> Option<String> {
    if model.trim().is_empty() {
        return Some("Model identifier is required".to_string());
    }

    model
        .chars()
        .find(|c| matches!(c, '/' | '?' | '#'))
        .map(|c| format!("Model identifier '{}' must not contain '{}'", model, c))
}

/// Backend that serves generation requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Gemini,
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-pro",
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-sonnet-latest",
        }
    }

    /// Environment variables consulted, in order, when no key is configured
    pub fn api_key_env_vars(self) -> &'static [&'static str] {
        match self {
            Self::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            Self::OpenAi => &["OPENAI_API_KEY"],
            Self::Anthropic => &["ANTHROPIC_API_KEY"],
        }
    }

    pub fn default_temperature(self) -> Option<f32> {
        match self {
            Self::Gemini => Some(0.7),
            Self::OpenAi | Self::Anthropic => None,
        }
    }

    pub fn default_max_tokens(self) -> Option<u32> {
        match self {
            Self::Gemini | Self::Anthropic => Some(4096),
            Self::OpenAi => None,
        }
    }

    pub fn default_top_p(self) -> Option<f32> {
        match self {
            Self::Gemini => Some(0.95),
            Self::OpenAi | Self::Anthropic => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Immutable settings for one provider client.
///
/// The credential never appears in `Debug` output.
#[derive(Clone)]
pub struct ProviderConfig {
    api_key: String,
    model: String,
    base_url: Option<String>,
    timeout: Duration,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    top_p: Option<f32>,
    top_k: Option<u32>,
    retry: RetryConfig,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temperature: None,
            max_tokens: None,
            top_p: None,
            top_k: None,
            retry: RetryConfig::disabled(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_top_p(mut self, top_p: Option<f32>) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_top_k(mut self, top_k: Option<u32>) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Fail fast on settings that could never produce a successful call
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.api_key.trim().is_empty() {
            return Err(DomainError::configuration("API key is required"));
        }

        if let Some(problem) = model_id_problem(&self.model) {
            return Err(DomainError::configuration(problem));
        }

        if self.timeout.is_zero() {
            return Err(DomainError::configuration("Timeout must be greater than zero"));
        }

        if let Some(base_url) = &self.base_url {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(DomainError::configuration(format!(
                    "Base URL must be an http(s) URL, got '{}'",
                    base_url
                )));
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(DomainError::configuration(format!(
                    "Temperature must be between 0.0 and 2.0, got {}",
                    temperature
                )));
            }
        }

        self.retry.validate()
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    pub fn top_p(&self) -> Option<f32> {
        self.top_p
    }

    pub fn top_k(&self) -> Option<u32> {
        self.top_k
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ProviderConfig::new("super-secret-key", "gemini-1.5-pro");
        let debug = format!("{:?}", config);

        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("gemini-1.5-pro"));
    }

    #[test]
    fn test_validate_requires_credential() {
        let result = ProviderConfig::new("   ", "gemini-1.5-pro").validate();
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_validate_requires_model() {
        let result = ProviderConfig::new("key", "").validate();
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_validate_rejects_path_characters_in_model() {
        for model in ["models/gemini-1.5-pro", "gemini?alt=sse", "gemini#frag"] {
            let result = ProviderConfig::new("key", model).validate();
            assert!(
                matches!(result, Err(DomainError::Configuration { .. })),
                "{} should be rejected",
                model
            );
        }
        assert!(model_id_problem("claude-3-5-sonnet@20240620").is_none());
    }

    #[test]
    fn test_validate_rejects_runaway_retry_policy() {
        let endless = ProviderConfig::new("key", "gemini-1.5-pro")
            .with_retry(RetryConfig::new(u32::MAX))
            .validate();
        assert!(matches!(endless, Err(DomainError::Configuration { .. })));

        let shrinking = ProviderConfig::new("key", "gemini-1.5-pro")
            .with_retry(RetryConfig::new(2).with_backoff_multiplier(0.5))
            .validate();
        assert!(matches!(shrinking, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let result = ProviderConfig::new("key", "gpt-4o-mini")
            .with_timeout(Duration::ZERO)
            .validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let result = ProviderConfig::new("key", "gpt-4o-mini")
            .with_base_url("ftp://example.com")
            .validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_valid_config() {
        let config = ProviderConfig::new("key", "gemini-1.5-pro")
            .with_temperature(Some(0.7))
            .with_base_url("http://localhost:8080");
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_provider_kind_serde() {
        let kind: ProviderKind = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);
        assert_eq!(ProviderKind::Gemini.to_string(), "gemini");
        assert_eq!(ProviderKind::default(), ProviderKind::Gemini);
    }
}
