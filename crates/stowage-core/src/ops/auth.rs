//! Authorization and signed URL issuance.

use chrono::Utc;
use tracing::info;

use crate::error::GatewayResult;
use crate::provider::Gateway;
use crate::signing::{IssuedUrl, SignedGrant};

impl Gateway {
    /// Require a valid bearer token.
    pub fn authorize_bearer(&self, authorization: Option<&str>) -> GatewayResult<()> {
        self.bearer.authenticate(authorization)
    }

    /// Authorize an upload with either a bearer token or a signed grant.
    ///
    /// A valid bearer token always suffices. Otherwise a presented grant is
    /// checked (expiry first, then signature), and without a grant the bearer
    /// failure is returned.
    pub fn authorize_upload(
        &self,
        authorization: Option<&str>,
        grant: Option<&SignedGrant>,
    ) -> GatewayResult<()> {
        match (self.bearer.authenticate(authorization), grant) {
            (Ok(()), _) => Ok(()),
            (Err(_), Some(grant)) => self.signer.authorize(grant, Utc::now().timestamp()),
            (Err(e), None) => Err(e),
        }
    }

    /// Issue a signed upload URL for `bucket/key`.
    ///
    /// The key is normalized first, so the grant matches the path a client
    /// will later upload to.
    pub fn issue_signed_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Option<u64>,
    ) -> GatewayResult<IssuedUrl> {
        let object = self.store.codec().resolve(bucket, key)?;
        let issued = self
            .signer
            .issue(object.bucket().name(), object.key(), ttl)?;
        info!(
            bucket = %bucket,
            key = %object.key(),
            expires_in = issued.expires_in,
            "issued signed upload url"
        );
        Ok(issued)
    }
}
