//! Gateway error taxonomy.
//!
//! Every core operation returns [`GatewayResult`]. The HTTP layer never sees an
//! unstructured failure: each [`GatewayError`] variant maps to exactly one
//! [`ErrorCode`], and each code carries its wire name and HTTP status.
//!
//! # Usage
//!
//! ```
//! use stowage_core::error::{ErrorCode, GatewayError};
//!
//! let err = GatewayError::NoSuchKey {
//!     key: "photos/cat.jpg".to_owned(),
//! };
//! assert_eq!(err.code(), ErrorCode::NoSuchKey);
//! assert_eq!(err.code().status_code(), http::StatusCode::NOT_FOUND);
//! ```

use std::fmt;

/// Wire-level error codes emitted by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Malformed request: empty key, escaping path, bad bucket name.
    InvalidRequest,
    /// Bearer token missing or mismatched, or signature mismatch.
    InvalidToken,
    /// Signed grant past its expiry.
    ExpiredToken,
    /// Object absent.
    NoSuchKey,
    /// Underlying I/O failure or any unexpected condition.
    InternalError,
    /// A required secret is not configured.
    ConfigError,
    /// The HTTP method is not served on this path.
    MethodNotAllowed,
    /// No route matches the request path.
    NoSuchRoute,
}

impl ErrorCode {
    /// Returns the error code as it appears in the `<Code>` element.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "InvalidRequest",
            Self::InvalidToken => "InvalidToken",
            Self::ExpiredToken => "ExpiredToken",
            Self::NoSuchKey => "NoSuchKey",
            Self::InternalError => "InternalError",
            Self::ConfigError => "ConfigError",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::NoSuchRoute => "NoSuchRoute",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::InvalidRequest => http::StatusCode::BAD_REQUEST,
            Self::InvalidToken | Self::ExpiredToken => http::StatusCode::FORBIDDEN,
            Self::NoSuchKey | Self::NoSuchRoute => http::StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::InternalError | Self::ConfigError => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message used when no specific one is available.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "The request is invalid.",
            Self::InvalidToken => "The provided token is invalid",
            Self::ExpiredToken => "The provided token has expired",
            Self::NoSuchKey => "The specified key does not exist.",
            Self::InternalError => "We encountered an internal error. Please try again.",
            Self::ConfigError => "The server is missing required configuration.",
            Self::MethodNotAllowed => "The specified method is not allowed against this resource.",
            Self::NoSuchRoute => "No route matches the requested path.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway error type.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request is malformed.
    #[error("{message}")]
    InvalidRequest {
        /// Description of what is wrong with the request.
        message: String,
    },

    /// Authentication failed.
    #[error("The provided token is invalid")]
    InvalidToken,

    /// The signed grant has expired.
    #[error("The provided token has expired")]
    ExpiredToken,

    /// The specified key does not exist.
    #[error("The specified key does not exist.")]
    NoSuchKey {
        /// The key that was not found.
        key: String,
    },

    /// A required secret is missing from the configuration.
    #[error("{message}")]
    Config {
        /// Which setting is missing.
        message: String,
    },

    /// The HTTP method is not allowed on this resource.
    #[error("The specified method is not allowed against this resource: {method}")]
    MethodNotAllowed {
        /// The rejected method.
        method: String,
    },

    /// No route matches the request path.
    #[error("No route matches the requested path: {path}")]
    NoSuchRoute {
        /// The unmatched path.
        path: String,
    },

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    /// Build an [`GatewayError::InvalidRequest`] from a message.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Build a [`GatewayError::Config`] from a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Map an I/O failure on `key`. A missing file (or a file standing where a
    /// directory is expected) becomes [`GatewayError::NoSuchKey`]; anything
    /// else is internal.
    #[must_use]
    pub fn from_io(err: std::io::Error, key: &str, action: &str) -> Self {
        if matches!(
            err.kind(),
            std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
        ) {
            Self::NoSuchKey {
                key: key.to_owned(),
            }
        } else {
            Self::Internal(anyhow::anyhow!("failed to {action} {key}: {err}"))
        }
    }

    /// The wire code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            Self::InvalidToken => ErrorCode::InvalidToken,
            Self::ExpiredToken => ErrorCode::ExpiredToken,
            Self::NoSuchKey { .. } => ErrorCode::NoSuchKey,
            Self::Config { .. } => ErrorCode::ConfigError,
            Self::MethodNotAllowed { .. } => ErrorCode::MethodNotAllowed,
            Self::NoSuchRoute { .. } => ErrorCode::NoSuchRoute,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// The object key to echo in the `<Key>` element, if the error concerns one.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::NoSuchKey { key } => Some(key),
            _ => None,
        }
    }
}

/// Convenience result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
