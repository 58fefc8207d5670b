use std::time::Duration;

use serde::Deserialize;

use crate::domain::{
    DomainError, ProviderConfig, ProviderKind, RetryConfig, llm::DEFAULT_TIMEOUT_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Which backend is active, plus the settings of every known backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub gemini: ProviderSettings,
    pub openai: ProviderSettings,
    pub anthropic: ProviderSettings,
}

/// Raw per-provider settings; anything left unset takes the provider default
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub retry: RetryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("retry", &self.retry)
            .finish()
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl LlmConfig {
    pub fn settings(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
        }
    }

    /// Resolve the active provider's settings, reading the credential from
    /// the process environment when the configuration has none
    pub fn provider_config(&self) -> Result<ProviderConfig, DomainError> {
        self.resolve(self.provider, |name| std::env::var(name).ok())
    }

    fn resolve<F>(&self, kind: ProviderKind, lookup: F) -> Result<ProviderConfig, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = self.settings(kind);

        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                kind.api_key_env_vars()
                    .iter()
                    .filter_map(|name| lookup(name))
                    .find(|key| !key.trim().is_empty())
            })
            .ok_or_else(|| {
                DomainError::configuration(format!(
                    "No API key configured for {}; set {}",
                    kind,
                    kind.api_key_env_vars().join(" or ")
                ))
            })?;

        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| kind.default_model().to_string());

        let timeout = Duration::from_secs(settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        let mut config = ProviderConfig::new(api_key, model)
            .with_timeout(timeout)
            .with_temperature(settings.temperature.or(kind.default_temperature()))
            .with_max_tokens(settings.max_tokens.or(kind.default_max_tokens()))
            .with_top_p(settings.top_p.or(kind.default_top_p()))
            .with_top_k(settings.top_k)
            .with_retry(settings.retry.clone());

        if let Some(ref base_url) = settings.base_url {
            config = config.with_base_url(base_url);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.llm.provider, ProviderKind::Gemini);
        assert_eq!(config.llm.gemini.retry.max_attempts(), 3);
    }

    #[test]
    fn test_gemini_defaults_applied() {
        let mut llm = LlmConfig::default();
        llm.gemini.api_key = Some("configured-key".to_string());

        let config = llm.resolve(ProviderKind::Gemini, no_env).unwrap();

        assert_eq!(config.api_key(), "configured-key");
        assert_eq!(config.model(), "gemini-1.5-pro");
        assert_eq!(config.temperature(), Some(0.7));
        assert_eq!(config.max_tokens(), Some(4096));
        assert_eq!(config.top_p(), Some(0.95));
        assert_eq!(config.top_k(), None);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_explicit_settings_override_defaults() {
        let mut llm = LlmConfig::default();
        llm.openai = ProviderSettings {
            api_key: Some("sk-key".to_string()),
            model: Some("gpt-4o".to_string()),
            base_url: Some("http://localhost:8080".to_string()),
            timeout_secs: Some(5),
            temperature: Some(0.2),
            ..Default::default()
        };

        let config = llm.resolve(ProviderKind::OpenAi, no_env).unwrap();

        assert_eq!(config.model(), "gpt-4o");
        assert_eq!(config.base_url(), Some("http://localhost:8080"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.temperature(), Some(0.2));
    }

    #[test]
    fn test_api_key_falls_back_to_environment() {
        let llm = LlmConfig::default();

        let config = llm
            .resolve(ProviderKind::Gemini, |name| {
                (name == "GOOGLE_API_KEY").then(|| "google-key".to_string())
            })
            .unwrap();

        assert_eq!(config.api_key(), "google-key");
    }

    #[test]
    fn test_blank_configured_key_uses_environment() {
        let mut llm = LlmConfig::default();
        llm.anthropic.api_key = Some("   ".to_string());

        let config = llm
            .resolve(ProviderKind::Anthropic, |name| {
                (name == "ANTHROPIC_API_KEY").then(|| "env-key".to_string())
            })
            .unwrap();

        assert_eq!(config.api_key(), "env-key");
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let llm = LlmConfig::default();

        let error = llm.resolve(ProviderKind::Gemini, no_env).unwrap_err();

        assert!(matches!(error, DomainError::Configuration { .. }));
        assert!(error.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut llm = LlmConfig::default();
        llm.gemini.api_key = Some("key".to_string());
        llm.gemini.base_url = Some("ftp://example.com".to_string());

        assert!(llm.resolve(ProviderKind::Gemini, no_env).is_err());
    }

    #[test]
    fn test_provider_settings_debug_redacts_key() {
        let settings = ProviderSettings {
            api_key: Some("super-secret".to_string()),
            ..Default::default()
        };

        let debug = format!("{:?}", settings);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_deserialize_llm_section() {
        let json = serde_json::json!({
            "provider": "anthropic",
            "anthropic": { "model": "claude-3-haiku", "retry": { "max_retries": 0 } }
        });

        let llm: LlmConfig = serde_json::from_value(json).unwrap();

        assert_eq!(llm.provider, ProviderKind::Anthropic);
        assert_eq!(llm.anthropic.model.as_deref(), Some("claude-3-haiku"));
        assert!(!llm.anthropic.retry.is_enabled());
        assert_eq!(llm.gemini.model, None);
    }
}
