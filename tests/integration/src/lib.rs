//! Integration tests for the stowage server.
//!
//! These tests require a running server at `localhost:8080` started with
//! `AUTH_BEARER` matching `STOWAGE_BEARER` (default `test-token`).
//! They are marked `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! AUTH_BEARER=test-token stowage-server &
//! cargo test -p stowage-integration -- --ignored
//! ```

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("STOWAGE_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:8080".to_owned())
}

/// Bearer secret the server was started with.
#[must_use]
pub fn bearer_token() -> String {
    std::env::var("STOWAGE_BEARER").unwrap_or_else(|_| "test-token".to_owned())
}

/// Create an HTTP client.
#[must_use]
pub fn http_client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::new()
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// URL of an object.
#[must_use]
pub fn object_url(bucket: &str, key: &str) -> String {
    format!("{}/buckets/{bucket}/{key}", endpoint_url())
}

/// Upload `body` with bearer auth, panicking on failure.
pub async fn put_object(client: &reqwest::Client, bucket: &str, key: &str, body: &[u8]) {
    let resp = client
        .put(object_url(bucket, key))
        .bearer_auth(bearer_token())
        .body(body.to_vec())
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to put {bucket}/{key}: {e}"));
    assert_eq!(resp.status(), 200, "put {bucket}/{key}");
}

/// Delete every listed key, ignoring failures.
pub async fn cleanup_keys(client: &reqwest::Client, bucket: &str, keys: &[&str]) {
    for key in keys {
        let _ = client
            .delete(object_url(bucket, key))
            .bearer_auth(bearer_token())
            .send()
            .await;
    }
}

mod test_error;
mod test_list;
mod test_object;
mod test_signed_url;
