//! Bearer-token authentication for mutating requests.

use std::fmt;

use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};

/// Checks `Authorization: Bearer <token>` against one configured secret.
#[derive(Clone)]
pub struct BearerAuthenticator {
    secret: Option<String>,
}

impl fmt::Debug for BearerAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuthenticator")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl BearerAuthenticator {
    /// Create an authenticator. `None` or an empty secret leaves it
    /// unconfigured, and every check then fails with `ConfigError`.
    #[must_use]
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Validate the raw `Authorization` header value.
    ///
    /// ```
    /// use stowage_core::auth::BearerAuthenticator;
    ///
    /// let auth = BearerAuthenticator::new(Some("s3cr3t".to_owned()));
    /// assert!(auth.authenticate(Some("Bearer s3cr3t")).is_ok());
    /// assert!(auth.authenticate(Some("Bearer guess")).is_err());
    /// assert!(auth.authenticate(None).is_err());
    /// ```
    pub fn authenticate(&self, authorization: Option<&str>) -> GatewayResult<()> {
        let Some(secret) = self.secret.as_deref() else {
            return Err(GatewayError::config("AUTH_BEARER is not configured"));
        };
        let Some(token) = authorization.and_then(extract_bearer) else {
            debug!("missing bearer token");
            return Err(GatewayError::InvalidToken);
        };
        if token.as_bytes().ct_eq(secret.as_bytes()).into() {
            Ok(())
        } else {
            debug!("bearer token mismatch");
            Err(GatewayError::InvalidToken)
        }
    }
}

/// Extract the token from a `Bearer <token>` header value. The scheme is
/// matched case-insensitively.
#[must_use]
pub fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}
