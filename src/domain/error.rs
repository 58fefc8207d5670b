use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure category reported by a provider client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Credential rejected or expired
    Authentication,
    /// Quota exceeded or backoff requested by the backend
    RateLimited,
    /// Network-level failure or momentary overload
    Transient,
    /// The call exceeded the configured timeout
    Timeout,
    /// The backend replied but the payload could not be normalized
    InvalidUpstreamResponse,
    /// Anything uncategorized
    Unknown,
}

impl ProviderErrorKind {
    /// Whether a bounded retry may plausibly succeed
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Transient | Self::Timeout)
    }

    /// Classify an HTTP status returned by a backend
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimited,
            408 | 500..=599 => Self::Transient,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication_error"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Transient => write!(f, "transient_error"),
            Self::Timeout => write!(f, "timeout"),
            Self::InvalidUpstreamResponse => write!(f, "invalid_upstream_response"),
            Self::Unknown => write!(f, "unknown_provider_error"),
        }
    }
}

/// Core domain errors
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Generation failed: {provider} ({kind}) - {message}")]
    Generation {
        provider: String,
        kind: ProviderErrorKind,
        message: String,
    },
}

impl DomainError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn generation(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Generation {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn authentication(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::generation(provider, ProviderErrorKind::Authentication, message)
    }

    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::generation(provider, ProviderErrorKind::RateLimited, message)
    }

    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::generation(provider, ProviderErrorKind::Transient, message)
    }

    pub fn timeout(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::generation(provider, ProviderErrorKind::Timeout, message)
    }

    pub fn invalid_upstream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::generation(provider, ProviderErrorKind::InvalidUpstreamResponse, message)
    }

    pub fn unknown(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::generation(provider, ProviderErrorKind::Unknown, message)
    }

    /// Provider failure kind, if this is a generation failure
    pub fn kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Self::Generation { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Name of the provider that failed, if any
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Generation { provider, .. } => Some(provider),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_some_and(ProviderErrorKind::is_retryable)
    }

    /// Re-attribute a generation failure to the given provider.
    ///
    /// The HTTP layer reports failures as `http`; provider clients call this
    /// so that callers always see the backend that was actually invoked.
    pub fn with_provider(self, name: &str) -> Self {
        match self {
            Self::Generation { kind, message, .. } => Self::Generation {
                provider: name.to_string(),
                kind,
                message,
            },
            other => other,
        }
    }
}
