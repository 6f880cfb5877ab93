//! Time-limited signed upload URLs.
//!
//! A signed URL authorizes exactly one upload: `PUT` to one bucket and key,
//! until an absolute Unix expiry. The grant is stateless; verification
//! recomputes the HMAC-SHA256 over the canonical payload
//!
//! ```text
//! PUT\n<len>:<bucket>\n<len>:<key>\n<expires_at>
//! ```
//!
//! Length prefixes keep the encoding unambiguous whatever bytes bucket and key
//! contain. Signatures are lowercase hex and compared in constant time.

use std::fmt;

use chrono::Utc;
use hmac::{Hmac, KeyInit, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};

type HmacSha256 = Hmac<Sha256>;

/// Shortest allowed lifetime, in seconds.
pub const MIN_TTL: u64 = 1;

/// Longest allowed lifetime (seven days), in seconds.
pub const MAX_TTL: u64 = 604_800;

/// The only method a signed grant authorizes.
pub const SIGNED_METHOD: &str = "PUT";

/// Characters left unescaped in URL path segments.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A signed grant presented by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedGrant {
    /// Bucket the grant is for.
    pub bucket: String,
    /// Key the grant is for.
    pub key: String,
    /// Absolute Unix expiry.
    pub expires_at: i64,
    /// Hex signature.
    pub signature: String,
}

impl SignedGrant {
    /// Build a grant from the raw `expires` and `signature` query values.
    ///
    /// An `expires` value that is not an integer cannot match any issued
    /// grant and is rejected as `InvalidToken`.
    pub fn parse(bucket: &str, key: &str, expires: &str, signature: &str) -> GatewayResult<Self> {
        let expires_at = expires
            .trim()
            .parse::<i64>()
            .map_err(|_| GatewayError::InvalidToken)?;
        Ok(Self {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            expires_at,
            signature: signature.to_owned(),
        })
    }
}

/// A freshly issued signed URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedUrl {
    /// Full upload URL carrying `expires` and `signature` query parameters.
    pub url: String,
    /// Hex signature embedded in the URL.
    #[serde(skip_serializing)]
    pub signature: String,
    /// Absolute Unix expiry.
    pub expires_at: i64,
    /// Lifetime in seconds.
    pub expires_in: u64,
    /// Method the URL authorizes.
    pub method: &'static str,
}

/// Issues and verifies signed upload URLs.
#[derive(Clone)]
pub struct SignedUrlIssuer {
    key: Option<Vec<u8>>,
    public_url: String,
    default_ttl: u64,
}

impl fmt::Debug for SignedUrlIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedUrlIssuer")
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("public_url", &self.public_url)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl SignedUrlIssuer {
    /// Create an issuer. An empty key is treated as unset.
    pub fn new(key: Option<&str>, public_url: impl Into<String>, default_ttl: u64) -> Self {
        let public_url: String = public_url.into();
        Self {
            key: key
                .filter(|k| !k.is_empty())
                .map(|k| k.as_bytes().to_vec()),
            public_url: public_url.trim_end_matches('/').to_owned(),
            default_ttl: default_ttl.clamp(MIN_TTL, MAX_TTL),
        }
    }

    /// Create an issuer from the gateway configuration.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            config.effective_signing_key(),
            config.public_url.clone(),
            config.default_signed_url_ttl,
        )
    }

    /// Resolve a requested lifetime: missing means the default, anything else
    /// is clamped to `[MIN_TTL, MAX_TTL]`.
    #[must_use]
    pub fn effective_ttl(&self, requested: Option<u64>) -> u64 {
        requested.map_or(self.default_ttl, |ttl| ttl.clamp(MIN_TTL, MAX_TTL))
    }

    /// Issue a signed upload URL valid from now.
    ///
    /// ```
    /// use stowage_core::signing::SignedUrlIssuer;
    ///
    /// let issuer = SignedUrlIssuer::new(Some("k3y"), "https://files.example.com", 3600);
    /// let issued = issuer.issue("b", "k", Some(60)).unwrap();
    /// assert!(issued.url.starts_with("https://files.example.com/buckets/b/k?expires="));
    /// assert!(issuer.verify(&issued.signature, "b", "k", issued.expires_at).unwrap());
    /// ```
    pub fn issue(&self, bucket: &str, key: &str, ttl: Option<u64>) -> GatewayResult<IssuedUrl> {
        self.issue_at(bucket, key, ttl, Utc::now().timestamp())
    }

    /// Issue a signed upload URL valid from `now` (Unix seconds).
    pub fn issue_at(
        &self,
        bucket: &str,
        key: &str,
        ttl: Option<u64>,
        now: i64,
    ) -> GatewayResult<IssuedUrl> {
        let expires_in = self.effective_ttl(ttl);
        let expires_at = now.saturating_add(i64::try_from(expires_in).unwrap_or(i64::MAX));
        let signature = self.sign(bucket, key, expires_at)?;

        let encoded_key = key
            .split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        let url = format!(
            "{}/buckets/{}/{encoded_key}?expires={expires_at}&signature={signature}",
            self.public_url,
            utf8_percent_encode(bucket, PATH_SEGMENT),
        );

        debug!(bucket = %bucket, key = %key, expires_at, "issued signed url");
        Ok(IssuedUrl {
            url,
            signature,
            expires_at,
            expires_in,
            method: SIGNED_METHOD,
        })
    }

    /// Compute the signature for `(bucket, key, expires_at)`.
    pub fn sign(&self, bucket: &str, key: &str, expires_at: i64) -> GatewayResult<String> {
        let secret = self.secret()?;
        let mut mac =
            HmacSha256::new_from_slice(secret).expect("HMAC can accept keys of any length");
        mac.update(canonical_payload(bucket, key, expires_at).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check `signature` against `(bucket, key, expires_at)` in constant time.
    ///
    /// Does not look at the clock; see [`Self::authorize`].
    pub fn verify(
        &self,
        signature: &str,
        bucket: &str,
        key: &str,
        expires_at: i64,
    ) -> GatewayResult<bool> {
        let expected = self.sign(bucket, key, expires_at)?;
        Ok(signature.as_bytes().ct_eq(expected.as_bytes()).into())
    }

    /// Accept `grant` at time `now`: expiry first, then the signature.
    pub fn authorize(&self, grant: &SignedGrant, now: i64) -> GatewayResult<()> {
        if now > grant.expires_at {
            debug!(bucket = %grant.bucket, key = %grant.key, "signed grant expired");
            return Err(GatewayError::ExpiredToken);
        }
        if self.verify(&grant.signature, &grant.bucket, &grant.key, grant.expires_at)? {
            Ok(())
        } else {
            debug!(bucket = %grant.bucket, key = %grant.key, "signed grant mismatch");
            Err(GatewayError::InvalidToken)
        }
    }

    fn secret(&self) -> GatewayResult<&[u8]> {
        self.key
            .as_deref()
            .ok_or_else(|| GatewayError::config("Signing key is not configured"))
    }
}

fn canonical_payload(bucket: &str, key: &str, expires_at: i64) -> String {
    format!(
        "{SIGNED_METHOD}\n{}:{bucket}\n{}:{key}\n{expires_at}",
        bucket.len(),
        key.len()
    )
}
