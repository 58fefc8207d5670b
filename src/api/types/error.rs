//! HTTP error responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::domain::DomainError;

const INTERNAL_ERROR_DETAIL: &str = "Internal server error";

/// Error body returned by every endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub detail: String,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                detail: detail.into(),
            },
        }
    }

    /// Bad request error
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    /// Internal server error; the cause stays in the logs
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_DETAIL)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::InvalidRequest { message } => Self::bad_request(message),
            DomainError::Configuration { .. } => {
                error!(error = %err, "Configuration error while handling request");
                Self::internal()
            }
            DomainError::Generation { provider, kind, .. } => {
                // Already logged at error level where the call failed
                debug!(
                    provider = %provider,
                    kind = %kind,
                    error = %err,
                    "Generation error while handling request"
                );
                Self::internal()
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status.as_u16(), self.response.detail)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProviderErrorKind;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_invalid_request_maps_to_bad_request() {
        let api_err: ApiError = DomainError::invalid_request("Prompt must not be blank").into();

        assert_eq!(api_err.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_err.response.detail, "Prompt must not be blank");
    }

    #[test]
    fn test_generation_error_does_not_leak_details() {
        let domain_err = DomainError::generation(
            "gemini",
            ProviderErrorKind::Authentication,
            "API key not valid. Please pass a valid API key.",
        );
        let api_err: ApiError = domain_err.into();

        assert_eq!(api_err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_err.response.detail, INTERNAL_ERROR_DETAIL);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_generation_error_is_not_logged_again_at_info() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let _: ApiError =
                DomainError::generation("openai", ProviderErrorKind::Transient, "HTTP 503").into();
        });

        assert!(logs.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_configuration_error_is_internal() {
        let api_err: ApiError = DomainError::configuration("missing key").into();

        assert_eq!(api_err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api_err.response.detail.contains("missing key"));
    }

    #[test]
    fn test_error_serialization() {
        let err = ApiError::bad_request("Invalid message");
        let json = serde_json::to_string(&err.response).unwrap();

        assert_eq!(json, r#"{"detail":"Invalid message"}"#);
    }
}
