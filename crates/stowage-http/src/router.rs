//! Request routing.
//!
//! Route table:
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | GET, HEAD | `/health`, `/_health` | health check |
//! | GET | `/hello` | greeting |
//! | GET | `/buckets/{bucket}` | list objects |
//! | GET | `/buckets/{bucket}/{key}` | get object (list if the key is empty) |
//! | HEAD | `/buckets/{bucket}/{key}` | head object |
//! | PUT, POST | `/buckets/{bucket}/{key}` | put object |
//! | DELETE | `/buckets/{bucket}/{key}` | delete object |
//! | POST | `/buckets/{bucket}/{key}/signed-url` | issue signed upload URL |
//!
//! Bucket and key are percent-decoded; the query string is decoded with
//! `application/x-www-form-urlencoded` rules.

use http::Method;
use percent_encoding::percent_decode_str;
use stowage_core::error::{GatewayError, GatewayResult};

/// Path prefix of every bucket route.
pub const BUCKETS_PREFIX: &str = "/buckets/";

/// Suffix that turns a POST into a signed URL request.
pub const SIGNED_URL_SUFFIX: &str = "/signed-url";

/// Operations the gateway serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOperation {
    /// Liveness probe.
    Health,
    /// Greeting.
    Hello,
    /// List a bucket.
    ListObjects,
    /// Download an object.
    GetObject,
    /// Object metadata.
    HeadObject,
    /// Upload an object.
    PutObject,
    /// Remove an object.
    DeleteObject,
    /// Issue a signed upload URL.
    CreateSignedUrl,
}

impl GatewayOperation {
    /// Operation name for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::Hello => "Hello",
            Self::ListObjects => "ListObjects",
            Self::GetObject => "GetObject",
            Self::HeadObject => "HeadObject",
            Self::PutObject => "PutObject",
            Self::DeleteObject => "DeleteObject",
            Self::CreateSignedUrl => "CreateSignedUrl",
        }
    }
}

/// The result of routing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingContext {
    /// The identified operation.
    pub operation: GatewayOperation,
    /// Decoded bucket name, for bucket routes.
    pub bucket: String,
    /// Decoded object key, possibly empty.
    pub key: String,
    /// Decoded query parameters in request order.
    pub query_params: Vec<(String, String)>,
}

impl RoutingContext {
    /// First value of query parameter `name`.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Query parameters as borrowed pairs.
    pub fn query_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query_params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Resolve a request to an operation.
///
/// Fails with `NoSuchRoute` for unknown paths and `MethodNotAllowed` for
/// known paths hit with an unsupported method.
pub fn route<B>(req: &http::Request<B>) -> GatewayResult<RoutingContext> {
    let method = req.method();
    let uri = req.uri();
    let path = uri.path();
    let query_params = parse_query_params(uri.query().unwrap_or(""));

    let context = |operation, bucket: String, key: String| RoutingContext {
        operation,
        bucket,
        key,
        query_params: query_params.clone(),
    };

    match path {
        "/health" | "/_health" => {
            return match *method {
                Method::GET | Method::HEAD => {
                    Ok(context(GatewayOperation::Health, String::new(), String::new()))
                }
                _ => Err(method_not_allowed(method)),
            };
        }
        "/hello" => {
            return match *method {
                Method::GET | Method::HEAD => {
                    Ok(context(GatewayOperation::Hello, String::new(), String::new()))
                }
                _ => Err(method_not_allowed(method)),
            };
        }
        _ => {}
    }

    let Some(rest) = path.strip_prefix(BUCKETS_PREFIX) else {
        return Err(no_such_route(path));
    };
    let (bucket_raw, key_raw) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket_raw.is_empty() {
        return Err(no_such_route(path));
    }
    let bucket = decode_uri_component(bucket_raw);

    let (operation, key_raw) = match *method {
        Method::GET if key_raw.trim_matches('/').is_empty() => (GatewayOperation::ListObjects, ""),
        Method::GET => (GatewayOperation::GetObject, key_raw),
        Method::HEAD => (GatewayOperation::HeadObject, key_raw),
        Method::PUT => (GatewayOperation::PutObject, key_raw),
        Method::POST => match key_raw.strip_suffix(SIGNED_URL_SUFFIX) {
            Some(object) if !object.trim_matches('/').is_empty() => {
                (GatewayOperation::CreateSignedUrl, object)
            }
            _ => (GatewayOperation::PutObject, key_raw),
        },
        Method::DELETE => (GatewayOperation::DeleteObject, key_raw),
        _ => return Err(method_not_allowed(method)),
    };

    Ok(context(operation, bucket, decode_uri_component(key_raw)))
}

fn method_not_allowed(method: &Method) -> GatewayError {
    GatewayError::MethodNotAllowed {
        method: method.to_string(),
    }
}

fn no_such_route(path: &str) -> GatewayError {
    GatewayError::NoSuchRoute {
        path: path.to_owned(),
    }
}

/// Decode a percent-encoded URI component.
fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Parse a query string into key-value pairs.
fn parse_query_params(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}
