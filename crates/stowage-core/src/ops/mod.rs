//! Gateway operation handlers.
//!
//! Each submodule adds methods to [`crate::provider::Gateway`]. The HTTP
//! layer calls these after routing and never touches the store directly.

pub mod auth;
pub mod list;
pub mod object;
