// ABOUTME: Unified error handling with stable error codes and HTTP response formatting
// ABOUTME: Maps application failures to the {error, message} JSON body the client relies on
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! # Unified Error Handling
//!
//! Standard error codes and HTTP response formatting for the relay. Non-redirect
//! failures always serialize to a stable `{error, message}` body so the
//! front-end can branch on the `error` label without parsing prose.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Path parameter names a provider outside the supported set
    InvalidProvider,
    /// Provider is supported but has no client credentials configured
    ProviderNotConfigured,
    /// Malformed or missing request input
    InvalidInput,
    /// Handoff credential or refresh token has expired
    AuthExpired,
    /// Handoff credential failed verification
    AuthInvalid,
    /// Upstream provider rejected a token operation
    ExternalAuthFailed,
    /// Per-IP request budget exhausted
    RateLimitExceeded,
    /// Server-side configuration problem
    ConfigError,
    /// Anything else
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::InvalidProvider | Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::AuthExpired | Self::AuthInvalid | Self::ExternalAuthFailed => {
                StatusCode::UNAUTHORIZED
            }
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::ProviderNotConfigured => StatusCode::NOT_IMPLEMENTED,
            Self::ConfigError | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short human-readable label carried in the `error` field
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InvalidProvider => "Invalid provider",
            Self::ProviderNotConfigured => "Provider not configured",
            Self::InvalidInput => "Invalid request",
            Self::AuthExpired => "Token expired",
            Self::AuthInvalid => "Invalid token",
            Self::ExternalAuthFailed => "Authentication failed",
            Self::RateLimitExceeded => "Rate limit exceeded",
            Self::ConfigError => "Configuration error",
            Self::InternalError => "Internal server error",
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
}

impl AppError {
    /// Create a new error with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Provider path segment is not one of the supported providers
    pub fn invalid_provider(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidProvider, message)
    }

    /// Provider exists but is missing client credentials
    pub fn provider_not_configured(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProviderNotConfigured, message)
    }

    /// Malformed request input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Expired handoff credential; the client should restart the flow
    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthExpired, message)
    }

    /// Invalid or tampered handoff credential
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Upstream provider rejected a token operation
    pub fn external_auth_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExternalAuthFailed, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.label(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response body with the stable `{error, message}` shape
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short stable label, e.g. "Invalid provider"
    pub error: String,
    /// Human-readable detail
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        // 5xx detail stays in the logs, not the response body
        let message = if error.http_status().is_server_error() {
            error.code.label().to_owned()
        } else {
            error.message.clone()
        };
        Self {
            error: error.code.label().to_owned(),
            message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.http_status().is_server_error() {
            tracing::error!(code = ?self.code, "{}", self.message);
        }
        (self.http_status(), Json(ErrorResponse::from(&self))).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(
            ErrorCode::InvalidProvider.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::ProviderNotConfigured.http_status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(ErrorCode::AuthExpired.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorCode::RateLimitExceeded.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_error_response_shape() {
        let error = AppError::invalid_provider("Provider must be one of: google, outlook, yahoo, apple");
        let body = ErrorResponse::from(&error);
        assert_eq!(body.error, "Invalid provider");
        assert!(body.message.contains("google"));
    }

    #[test]
    fn test_internal_detail_suppressed() {
        let error = AppError::internal("sqlite disk I/O error at /var/data");
        let body = ErrorResponse::from(&error);
        assert_eq!(body.message, "Internal server error");
    }
}
