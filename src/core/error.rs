//! # Error Handling Module
//!
//! Error taxonomy for the gateway using the `thiserror` crate, with HTTP status
//! code mappings for the few paths that can actually fail a client request.
//!
//! Claim enrichment itself never produces a `GatewayError` for the requester:
//! a missing token, an undecodable token or an unreachable directory all degrade
//! to "fewer headers". Errors surface to clients only from the forwarding path
//! (unreadable request body, upstream unreachable, upstream timeout) and from
//! startup (bad configuration, bind failures).
//!
//! ## Rust Concepts Used
//!
//! - `Result<T, E>` with the `?` operator instead of exceptions
//! - `#[derive(thiserror::Error)]` to implement `Display` and `Error`
//! - `From` implementations so `?` converts library errors automatically
//! - `IntoResponse` so axum handlers can return `Result<Response, GatewayError>`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::directory::DirectoryError;

/// Main result type used throughout the gateway
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Error types for the gateway
///
/// Each variant represents a different category of error that can occur.
/// The `#[error("...")]` attribute from `thiserror` implements `Display`.
#[derive(Debug, Error, Clone)]
pub enum GatewayError {
    /// Configuration-related errors (invalid values, unreadable files, etc.)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Upstream request timeout
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Request validation errors (unreadable or oversized body, etc.)
    #[error("Request validation failed: {field} - {reason}")]
    RequestValidation { field: String, reason: String },

    /// Directory service failures (group resolution)
    #[error("Directory error: {message}")]
    Directory { message: String },

    /// Internal server errors for unexpected failures
    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// HTTP client errors when calling the upstream
    #[error("HTTP client error: {message}")]
    HttpClient { message: String },
}

impl GatewayError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a request validation error for a specific field
    pub fn validation<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::RequestValidation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RequestValidation { .. } => StatusCode::BAD_REQUEST,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::HttpClient { .. } | Self::Directory { .. } => StatusCode::BAD_GATEWAY,
            Self::Configuration { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be retried
    ///
    /// Transient upstream failures can be retried, everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::HttpClient { .. } | Self::Directory { .. }
        )
    }

    /// Get a string representation of the error type for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::Timeout { .. } => "timeout",
            Self::RequestValidation { .. } => "request_validation_error",
            Self::Directory { .. } => "directory_error",
            Self::Internal { .. } => "internal_error",
            Self::HttpClient { .. } => "http_client_error",
        }
    }
}

impl From<DirectoryError> for GatewayError {
    fn from(err: DirectoryError) -> Self {
        Self::Directory {
            message: err.to_string(),
        }
    }
}

/// Converts errors into structured JSON responses for axum handlers
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_response = json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
                "type": self.error_type(),
                "retryable": self.is_retryable(),
            }
        });

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            GatewayError::config("bad interval").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::validation("body", "too large").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::Timeout { timeout_ms: 5000 }.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GatewayError::HttpClient {
                message: "connection refused".to_string()
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(GatewayError::HttpClient {
            message: "connection refused".to_string()
        }
        .is_retryable());
        assert!(GatewayError::Timeout { timeout_ms: 5000 }.is_retryable());
        assert!(!GatewayError::config("invalid").is_retryable());
        assert!(!GatewayError::validation("body", "unreadable").is_retryable());
    }

    #[test]
    fn test_directory_error_conversion() {
        let err: GatewayError = DirectoryError::MissingCredentials.into();
        assert_eq!(err.error_type(), "directory_error");
        assert!(err.to_string().contains("credentials"));
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = GatewayError::Timeout { timeout_ms: 250 }.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"]["code"], 504);
        assert_eq!(value["error"]["type"], "timeout");
        assert_eq!(value["error"]["retryable"], true);
    }
}
