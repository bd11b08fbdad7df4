//! Common error types for session token handling.
//!
//! This crate provides the failure taxonomy shared by token issuance and
//! validation, plus an API-facing error response.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token-related errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The signing secret could not be decoded or is too short.
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    /// Configuration values could not be parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Token signature mismatch")]
    SignatureMismatch,

    #[error("Token expired")]
    TokenExpired,

    /// The token header names an algorithm other than the trusted one.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A claim is absent or does not have the expected shape.
    #[error("Missing claim: {0}")]
    MissingClaim(String),

    #[error("Token creation failed: {0}")]
    TokenCreationFailed(String),
}

impl AuthError {
    /// Stable error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidKey(_) => "AUTH_INVALID_KEY",
            AuthError::InvalidConfig(_) => "AUTH_INVALID_CONFIG",
            AuthError::MalformedToken(_) => "AUTH_MALFORMED_TOKEN",
            AuthError::SignatureMismatch => "AUTH_SIGNATURE_MISMATCH",
            AuthError::TokenExpired => "AUTH_TOKEN_EXPIRED",
            AuthError::UnsupportedAlgorithm(_) => "AUTH_UNSUPPORTED_ALGORITHM",
            AuthError::MissingClaim(_) => "AUTH_MISSING_CLAIM",
            AuthError::TokenCreationFailed(_) => "AUTH_TOKEN_CREATION_FAILED",
        }
    }
}

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error response.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        let message = match &err {
            AuthError::InvalidKey(_) | AuthError::InvalidConfig(_) => "Token service misconfigured",
            AuthError::MalformedToken(_) => "Malformed token",
            AuthError::SignatureMismatch => "Invalid token signature",
            AuthError::TokenExpired => "Token has expired",
            AuthError::UnsupportedAlgorithm(_) => "Unsupported token algorithm",
            AuthError::MissingClaim(_) => "Token is missing a required claim",
            AuthError::TokenCreationFailed(_) => "Failed to create token",
        };
        let response = Self::new(err.code(), message);
        // Key and config details stay server-side.
        match err {
            AuthError::MalformedToken(d)
            | AuthError::UnsupportedAlgorithm(d)
            | AuthError::MissingClaim(d) => response.with_details(d),
            _ => response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_from_missing_claim() {
        let response = ErrorResponse::from(AuthError::MissingClaim("auth".to_string()));
        assert_eq!(response.code, "AUTH_MISSING_CLAIM");
        assert_eq!(response.details.as_deref(), Some("auth"));
    }

    #[test]
    fn test_error_response_hides_key_details() {
        let response = ErrorResponse::from(AuthError::InvalidKey("only 8 bytes".to_string()));
        assert_eq!(response.code, "AUTH_INVALID_KEY");
        assert!(response.details.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("details").is_none());
    }
}
