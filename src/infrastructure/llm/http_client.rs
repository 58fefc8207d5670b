use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{DomainError, ProviderErrorKind};

const HTTP: &str = "http";
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    /// POST a JSON body and decode the JSON reply.
    ///
    /// Failures are classified into provider error kinds and reported under
    /// the `http` provider name; callers re-attribute them.
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &Value,
    ) -> Result<Value, DomainError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &Value,
    ) -> Result<Value, DomainError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, "Request failed"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(e, "Failed to read response body"))?;

        if !status.is_success() {
            return Err(DomainError::generation(
                HTTP,
                ProviderErrorKind::from_status(status.as_u16()),
                format!("HTTP {}: {}", status.as_u16(), extract_error_message(&text)),
            ));
        }

        serde_json::from_str(&text).map_err(|e| {
            DomainError::invalid_upstream(HTTP, format!("Failed to parse response: {}", e))
        })
    }
}

/// Map a reqwest failure to an error kind. URLs are dropped from the
/// message since some backends accept credentials as query parameters.
fn classify_reqwest_error(error: reqwest::Error, context: &str) -> DomainError {
    let error = error.without_url();
    let message = format!("{}: {}", context, error);

    if error.is_timeout() {
        DomainError::timeout(HTTP, message)
    } else if error.is_connect() || error.is_request() || error.is_body() {
        DomainError::transient(HTTP, message)
    } else if error.is_decode() {
        DomainError::invalid_upstream(HTTP, message)
    } else {
        DomainError::unknown(HTTP, message)
    }
}

/// Pull the human-readable message out of a backend error body.
///
/// Gemini, OpenAI and Anthropic all nest it under `error.message`; anything
/// else is passed through, truncated.
pub fn extract_error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        json.pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    let message = from_json.unwrap_or_else(|| body.trim().to_string());

    if message.chars().count() > MAX_ERROR_BODY_CHARS {
        let truncated: String = message.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", truncated)
    } else {
        message
    }
}

/// Bound a provider call by `limit`, reporting expiry as a timeout failure
pub async fn with_deadline<T, F>(provider: &str, limit: Duration, future: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::timeout(
            provider,
            format!("Request timed out after {}ms", limit.as_millis()),
        )),
    }
}
