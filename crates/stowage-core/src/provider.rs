//! The gateway provider.
//!
//! [`Gateway`] owns the configuration, the object store and the components
//! built on top of it. Individual operations are implemented in the
//! [`crate::ops`] submodules as `impl Gateway` blocks.

use std::sync::Arc;

use crate::auth::BearerAuthenticator;
use crate::config::GatewayConfig;
use crate::error::GatewayResult;
use crate::listing::ListingEngine;
use crate::signing::SignedUrlIssuer;
use crate::storage::{LocalFsStore, ObjectStore};

/// Gateway state shared by every request handler.
///
/// All fields are `Arc`-wrapped for cheap cloning across handler tasks.
#[derive(Debug, Clone)]
pub struct Gateway {
    /// Gateway configuration.
    pub(crate) config: Arc<GatewayConfig>,
    /// Object storage backend.
    pub(crate) store: Arc<dyn ObjectStore>,
    /// Listing engine over `store`.
    pub(crate) listing: ListingEngine,
    /// Signed URL issuer.
    pub(crate) signer: Arc<SignedUrlIssuer>,
    /// Bearer check for mutating requests.
    pub(crate) bearer: Arc<BearerAuthenticator>,
}

impl Gateway {
    /// Create a gateway over an existing store.
    #[must_use]
    pub fn new(config: GatewayConfig, store: Arc<dyn ObjectStore>) -> Self {
        let signer = SignedUrlIssuer::from_config(&config);
        let bearer = BearerAuthenticator::new(config.auth_bearer.clone());
        Self {
            listing: ListingEngine::new(Arc::clone(&store)),
            store,
            signer: Arc::new(signer),
            bearer: Arc::new(bearer),
            config: Arc::new(config),
        }
    }

    /// Create a gateway backed by a [`LocalFsStore`] at `config.storage_root`,
    /// creating the directory if it does not exist.
    ///
    /// # Examples
    ///
    /// ```
    /// # tokio_test::block_on(async {
    /// use stowage_core::{Gateway, GatewayConfig};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let config = GatewayConfig::builder()
    ///     .storage_root(dir.path().display().to_string())
    ///     .build();
    /// let gateway = Gateway::open(config).await.unwrap();
    /// assert!(gateway.store().codec().root().is_absolute());
    /// # });
    /// ```
    pub async fn open(config: GatewayConfig) -> GatewayResult<Self> {
        let store = LocalFsStore::open(&config.storage_root).await?;
        Ok(Self::new(config, Arc::new(store)))
    }

    /// Returns the gateway configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Returns the object store.
    #[must_use]
    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// Returns the listing engine.
    #[must_use]
    pub fn listing(&self) -> &ListingEngine {
        &self.listing
    }

    /// Returns the signed URL issuer.
    #[must_use]
    pub fn signer(&self) -> &SignedUrlIssuer {
        &self.signer
    }
}
