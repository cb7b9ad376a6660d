//! Error types for gateway operations.
//!
//! One enum covers every failure the client can surface. Nothing is retried
//! internally; [`GatewayError::is_retryable`] is guidance for the caller.

use thiserror::Error;

use crate::config::{ConfigError, ValidationError};

/// Errors returned by gateway client operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration was missing or invalid when the client was built.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The payment request failed local checks before signing.
    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),

    /// A callback signature did not match the recomputed value.
    #[error("Signature mismatch")]
    SignatureMismatch,

    /// The gateway accepted the POST but no redirect URL came back.
    #[error("Payment initiation failed: {0}")]
    PaymentInitiation(String),

    /// A base64 callback payload could not be decoded or parsed.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Transport failure or non-2xx response.
    #[error(
        "Network error{}: {message}",
        status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
    )]
    Network {
        /// HTTP status, when a response was received.
        status: Option<u16>,
        message: String,
    },

    /// The call did not complete within its timeout.
    #[error("Request timed out")]
    Timeout,

    /// A 2xx response whose body was not the expected JSON.
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Create a network error without an HTTP status.
    pub fn network(message: impl Into<String>) -> Self {
        GatewayError::Network {
            status: None,
            message: message.into(),
        }
    }

    /// Create a network error for a non-2xx response.
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        GatewayError::Network {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        GatewayError::Decode(message.into())
    }

    /// Check if this error came from the network layer.
    pub fn is_network(&self) -> bool {
        matches!(self, GatewayError::Network { .. } | GatewayError::Timeout)
    }

    /// Returns true if the same call might succeed when repeated.
    ///
    /// Transport failures, timeouts and 5xx/429 responses qualify. The client
    /// itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Timeout => true,
            GatewayError::Network { status: None, .. } => true,
            GatewayError::Network {
                status: Some(status),
                ..
            } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<ValidationError> for GatewayError {
    fn from(err: ValidationError) -> Self {
        GatewayError::Config(ConfigError::ValidationFailed(err))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Network {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}
