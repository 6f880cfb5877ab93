//! Gateway configuration.
//!
//! Provides [`GatewayConfig`], loaded once at startup and shared behind an
//! `Arc`. Core components never read the environment themselves.

use std::fmt;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default lifetime of an issued signed URL, in seconds.
pub const DEFAULT_SIGNED_URL_TTL: u64 = 3600;

/// Gateway configuration.
///
/// # Examples
///
/// ```
/// use stowage_core::config::GatewayConfig;
///
/// let config = GatewayConfig::builder()
///     .storage_root("/srv/objects".to_owned())
///     .auth_bearer(Some("s3cr3t".to_owned()))
///     .build();
/// assert_eq!(config.gateway_listen, "0.0.0.0:8080");
/// assert_eq!(config.effective_signing_key(), Some("s3cr3t"));
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Bind address for the gateway.
    #[builder(default = String::from("0.0.0.0:8080"))]
    pub gateway_listen: String,

    /// Directory under which every bucket lives.
    #[builder(default = String::from("./storage"))]
    pub storage_root: String,

    /// Externally reachable base URL, used when issuing signed URLs.
    #[builder(default = String::from("http://localhost:8080"))]
    pub public_url: String,

    /// Bearer secret required for mutating requests.
    #[builder(default)]
    pub auth_bearer: Option<String>,

    /// HMAC key for signed URLs. Falls back to `auth_bearer` when unset.
    #[builder(default)]
    pub signing_key: Option<String>,

    /// Lifetime of a signed URL when the caller does not ask for one.
    #[builder(default = DEFAULT_SIGNED_URL_TTL)]
    pub default_signed_url_ttl: u64,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:8080"),
            storage_root: String::from("./storage"),
            public_url: String::from("http://localhost:8080"),
            auth_bearer: None,
            signing_key: None,
            default_signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
            log_level: String::from("info"),
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("gateway_listen", &self.gateway_listen)
            .field("storage_root", &self.storage_root)
            .field("public_url", &self.public_url)
            .field("auth_bearer", &redact(self.auth_bearer.as_deref()))
            .field("signing_key", &redact(self.signing_key.as_deref()))
            .field("default_signed_url_ttl", &self.default_signed_url_ttl)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8080` |
    /// | `STORAGE_ROOT` | `./storage` |
    /// | `PUBLIC_URL` | `http://localhost:8080` |
    /// | `AUTH_BEARER` | unset |
    /// | `SIGNING_KEY` | unset |
    /// | `SIGNED_URL_DEFAULT_TTL` | `3600` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Empty secrets are treated as unset.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("STORAGE_ROOT") {
            config.storage_root = v;
        }
        if let Ok(v) = std::env::var("PUBLIC_URL") {
            config.public_url = v;
        }
        if let Ok(v) = std::env::var("AUTH_BEARER") {
            config.auth_bearer = non_empty(v);
        }
        if let Ok(v) = std::env::var("SIGNING_KEY") {
            config.signing_key = non_empty(v);
        }
        if let Ok(v) = std::env::var("SIGNED_URL_DEFAULT_TTL") {
            if let Ok(n) = v.parse::<u64>() {
                config.default_signed_url_ttl = n;
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// The key used to sign URLs: `signing_key`, else `auth_bearer`.
    #[must_use]
    pub fn effective_signing_key(&self) -> Option<&str> {
        self.signing_key
            .as_deref()
            .or(self.auth_bearer.as_deref())
            .filter(|k| !k.is_empty())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn redact(secret: Option<&str>) -> &'static str {
    match secret {
        Some(_) => "[REDACTED]",
        None => "<unset>",
    }
}
