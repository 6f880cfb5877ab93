//! XML wire format for stowage.
//!
//! - [`list_bucket_result`] renders a [`stowage_core::listing::ListingPage`]
//!   as a `ListBucketResult` document
//! - [`error_to_xml`] renders the flat `<Error>` envelope used by every
//!   failing object route

pub mod error;
pub mod serialize;

pub use error::{XmlError, error_to_xml};
pub use serialize::{XmlSerialize, format_timestamp, list_bucket_result, to_xml};
