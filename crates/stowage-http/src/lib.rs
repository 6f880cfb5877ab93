//! HTTP layer for stowage: routing, authentication, response building and
//! the hyper service.
//!
//! - **Routing** ([`router`]): maps method and path to a
//!   [`GatewayOperation`], percent-decoding bucket and key.
//! - **Response** ([`response`]): turns core outputs and errors into HTTP
//!   responses (XML listings and error envelopes, JSON for signed URLs).
//! - **Service** ([`service`]): the [`GatewayService`] implementing hyper's
//!   `Service` trait.
//! - **Body** ([`body`]): the [`GatewayBody`] type supporting buffered,
//!   streamed and empty responses.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> GatewayService (hyper Service)
//!     -> CORS preflight interception
//!     -> route (operation, bucket, key, query)
//!     -> bearer / signed grant authorization
//!     -> Gateway operation (stowage-core)
//!     -> Common response headers (x-amz-request-id, Server, CORS)
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use stowage_core::{Gateway, GatewayConfig};
//! use stowage_http::GatewayService;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Gateway::open(GatewayConfig::from_env()).await?;
//! let service = GatewayService::new(gateway);
//! // Serve `service` with hyper.
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod response;
pub mod router;
pub mod service;

pub use body::GatewayBody;
pub use router::{GatewayOperation, RoutingContext, route};
pub use service::GatewayService;
