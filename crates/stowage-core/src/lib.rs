//! Core of the stowage object gateway.
//!
//! Stowage serves S3-style bucket/key operations from a local directory tree
//! and issues signed URLs for delegated uploads. This crate holds everything
//! below the HTTP layer: key-to-path mapping, the storage capability, the
//! listing algorithm, signing and bearer authentication.
//!
//! # Architecture
//!
//! ```text
//!   stowage-http (routing, XML, auth headers)
//!        |
//!        v
//!   Gateway (ops: put/get/head/delete/list/signed-url)
//!        |                 |
//!        v                 v
//!   ListingEngine     SignedUrlIssuer, BearerAuthenticator
//!        |
//!        v
//!   ObjectStore (LocalFsStore) <- KeyPathCodec
//! ```

pub mod auth;
pub mod checksums;
pub mod config;
pub mod error;
pub mod keypath;
pub mod listing;
pub mod ops;
pub mod provider;
pub mod signing;
pub mod storage;

pub use config::GatewayConfig;
pub use error::{ErrorCode, GatewayError, GatewayResult};
pub use provider::Gateway;
