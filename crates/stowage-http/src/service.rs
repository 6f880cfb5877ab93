//! The hyper service fronting a [`Gateway`].
//!
//! [`GatewayService`] handles, in order:
//!
//! 1. CORS preflight (`OPTIONS`)
//! 2. Routing via [`route`]
//! 3. Authentication: bearer token, or a signed grant for uploads
//! 4. Dispatch to the core operation
//! 5. Common response headers (`x-amz-request-id`, `Server`, CORS)
//! 6. Error formatting (XML envelope, JSON for signed URL issuance)

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use http::header::{self, HeaderValue};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use stowage_core::Gateway;
use stowage_core::error::GatewayResult;
use stowage_core::keypath::trim_slashes;
use stowage_core::listing::ListRequest;
use stowage_core::signing::SignedGrant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::response::{
    GatewayResponse, SERVICE_NAME, cors_preflight_response, delete_object_response,
    error_to_json_response, error_to_response, get_object_response, head_object_response,
    health_response, hello_response, list_objects_response, put_object_response,
    signed_url_response,
};
use crate::router::{GatewayOperation, RoutingContext, route};

/// Response header carrying the per-request identifier.
pub const REQUEST_ID_HEADER: &str = "x-amz-request-id";

/// The gateway HTTP service implementing hyper's `Service` trait.
#[derive(Debug, Clone)]
pub struct GatewayService {
    gateway: Arc<Gateway>,
}

impl GatewayService {
    /// Create a service around `gateway`.
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }

    /// Handle one request with any body type.
    ///
    /// Never fails: every error is rendered into the response.
    pub async fn handle<B>(&self, req: http::Request<B>) -> GatewayResponse
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = Uuid::new_v4().to_string();
        let response = process_request(&self.gateway, req, &request_id).await;
        add_common_headers(response, &request_id)
    }
}

impl Service<http::Request<Incoming>> for GatewayService {
    type Response = GatewayResponse;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

async fn process_request<B>(
    gateway: &Gateway,
    req: http::Request<B>,
    request_id: &str,
) -> GatewayResponse
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing request");

    if method == http::Method::OPTIONS {
        return cors_preflight_response();
    }

    let ctx = match route(&req) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%method, %uri, error = %err, request_id, "failed to route request");
            return error_to_response(&err, request_id);
        }
    };

    info!(
        operation = ctx.operation.as_str(),
        bucket = %ctx.bucket,
        key = %ctx.key,
        request_id,
        "routed request"
    );

    let operation = ctx.operation;
    match dispatch(gateway, req, ctx).await {
        Ok(response) => response,
        Err(err) => {
            debug!(
                operation = operation.as_str(),
                error = %err,
                request_id,
                "operation returned error"
            );
            if operation == GatewayOperation::CreateSignedUrl {
                error_to_json_response(&err, request_id)
            } else {
                error_to_response(&err, request_id)
            }
        }
    }
}

async fn dispatch<B>(
    gateway: &Gateway,
    req: http::Request<B>,
    ctx: RoutingContext,
) -> GatewayResult<GatewayResponse>
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let authorization = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match ctx.operation {
        GatewayOperation::Health => health_response(),
        GatewayOperation::Hello => hello_response(),
        GatewayOperation::ListObjects => {
            let request = ListRequest::from_query(ctx.query_pairs());
            let page = gateway.list_bucket(&ctx.bucket, &request).await?;
            list_objects_response(&page)
        }
        GatewayOperation::GetObject => {
            let output = gateway.get_object(&ctx.bucket, &ctx.key).await?;
            get_object_response(output)
        }
        GatewayOperation::HeadObject => {
            let metadata = gateway.head_object(&ctx.bucket, &ctx.key).await?;
            head_object_response(&metadata)
        }
        GatewayOperation::PutObject => {
            match signed_grant(&ctx) {
                Ok(grant) => gateway.authorize_upload(authorization, grant.as_ref())?,
                // a malformed grant only matters when the bearer token fails too
                Err(malformed) => gateway
                    .authorize_bearer(authorization)
                    .map_err(|_| malformed)?,
            }
            let stream = body.into_data_stream().map_err(io::Error::other);
            let output = gateway.put_object(&ctx.bucket, &ctx.key, stream).await?;
            put_object_response(&output)
        }
        GatewayOperation::DeleteObject => {
            gateway.authorize_bearer(authorization)?;
            gateway.delete_object(&ctx.bucket, &ctx.key).await?;
            delete_object_response()
        }
        GatewayOperation::CreateSignedUrl => {
            gateway.authorize_bearer(authorization)?;
            let ttl = match ctx.query_value("expires") {
                Some(raw) => parse_ttl(raw),
                None => ttl_from_body(body).await,
            };
            let issued = gateway.issue_signed_url(&ctx.bucket, &ctx.key, ttl)?;
            signed_url_response(&issued)
        }
    }
}

/// The grant carried by `signature` and `expires` query parameters, if any.
fn signed_grant(ctx: &RoutingContext) -> GatewayResult<Option<SignedGrant>> {
    let Some(signature) = ctx.query_value("signature") else {
        return Ok(None);
    };
    let expires = ctx.query_value("expires").unwrap_or_default();
    SignedGrant::parse(&ctx.bucket, trim_slashes(&ctx.key), expires, signature).map(Some)
}

/// Parse a requested lifetime. Unparsable values fall back to the default;
/// negative ones are clamped by the issuer.
fn parse_ttl(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .map(|n| u64::try_from(n).unwrap_or(0))
}

/// Read `{"expires": n}` from a JSON request body.
async fn ttl_from_body<B>(body: B) -> Option<u64>
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = body.collect().await.ok()?.to_bytes();
    if bytes.is_empty() {
        return None;
    }
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    match value.get("expires")? {
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(|n| u64::try_from(n).unwrap_or(0)),
        serde_json::Value::String(s) => parse_ttl(s),
        _ => None,
    }
}

/// Add common headers to every response.
fn add_common_headers(mut response: GatewayResponse, request_id: &str) -> GatewayResponse {
    let headers = response.headers_mut();

    if let Ok(hv) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, hv);
    }
    headers.insert(header::SERVER, HeaderValue::from_static(SERVICE_NAME));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("ETag, x-amz-request-id"),
    );

    response
}

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};
    use http_body_util::Full;
    use stowage_core::GatewayConfig;

    use super::*;

    const BEARER: &str = "Bearer test-token";

    async fn service() -> (tempfile::TempDir, GatewayService) {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let config = GatewayConfig::builder()
            .storage_root(dir.path().display().to_string())
            .public_url("http://gateway.test".to_owned())
            .auth_bearer(Some("test-token".to_owned()))
            .build();
        let gateway = Gateway::open(config)
            .await
            .unwrap_or_else(|e| panic!("open failed: {e}"));
        (dir, GatewayService::new(gateway))
    }

    fn request(method: Method, uri: &str, auth: Option<&str>, body: &'static [u8]) -> http::Request<Full<Bytes>> {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder
            .body(Full::new(Bytes::from_static(body)))
            .expect("valid request")
    }

    async fn body_string(response: GatewayResponse) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .unwrap_or_else(|e| panic!("collect failed: {e}"))
            .to_bytes();
        String::from_utf8(bytes.to_vec()).expect("valid UTF-8")
    }

    fn header_str<'a>(response: &'a GatewayResponse, name: &str) -> &'a str {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_should_put_get_head_delete_roundtrip() {
        let (_dir, svc) = service().await;

        let put = svc
            .handle(request(Method::PUT, "/buckets/docs/notes/a.txt", Some(BEARER), b"hello world"))
            .await;
        assert_eq!(put.status(), StatusCode::OK);
        assert_eq!(header_str(&put, "etag"), "\"5eb63bbbe01eeed093cb22bb8f5acdc3\"");
        assert_eq!(header_str(&put, "content-length"), "0");

        let get = svc
            .handle(request(Method::GET, "/buckets/docs/notes/a.txt", None, b""))
            .await;
        assert_eq!(get.status(), StatusCode::OK);
        assert_eq!(header_str(&get, "content-type"), "text/plain");
        assert_eq!(header_str(&get, "content-length"), "11");
        assert_eq!(header_str(&get, "etag"), "\"5eb63bbbe01eeed093cb22bb8f5acdc3\"");
        assert!(header_str(&get, "last-modified").ends_with(" GMT"));
        assert_eq!(body_string(get).await, "hello world");

        let head = svc
            .handle(request(Method::HEAD, "/buckets/docs/notes/a.txt", None, b""))
            .await;
        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(header_str(&head, "content-length"), "11");
        assert!(body_string(head).await.is_empty());

        let delete = svc
            .handle(request(Method::DELETE, "/buckets/docs/notes/a.txt", Some(BEARER), b""))
            .await;
        assert_eq!(delete.status(), StatusCode::NO_CONTENT);

        let missing = svc
            .handle(request(Method::DELETE, "/buckets/docs/notes/a.txt", Some(BEARER), b""))
            .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let body = body_string(missing).await;
        assert!(body.contains("<Code>NoSuchKey</Code>"));
        assert!(body.contains("<Key>notes/a.txt</Key>"));
    }

    #[tokio::test]
    async fn test_should_list_bucket_as_xml() {
        let (_dir, svc) = service().await;
        for key in ["a/b/c", "a/b/d", "top.txt"] {
            let uri = format!("/buckets/files/{key}");
            let response = svc.handle(request(Method::PUT, &uri, Some(BEARER), b"x")).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = svc.handle(request(Method::GET, "/buckets/files", None, b"")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, "content-type"), "application/xml");
        let xml = body_string(response).await;
        assert!(xml.contains("<Name>files</Name>"));
        assert!(xml.contains("<KeyCount>2</KeyCount>"));
        assert!(xml.contains("<CommonPrefixes><Prefix>a/</Prefix></CommonPrefixes>"));
        assert!(xml.contains("<Key>top.txt</Key>"));
        assert!(!xml.contains("<Key>a/b/c</Key>"));
    }

    #[tokio::test]
    async fn test_should_require_bearer_for_writes() {
        let (_dir, svc) = service().await;
        let put = svc
            .handle(request(Method::PUT, "/buckets/b/k", None, b"x"))
            .await;
        assert_eq!(put.status(), StatusCode::FORBIDDEN);
        assert!(body_string(put).await.contains("<Code>InvalidToken</Code>"));

        let delete = svc
            .handle(request(Method::DELETE, "/buckets/b/k", Some("Bearer wrong"), b""))
            .await;
        assert_eq!(delete.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_should_upload_with_issued_signed_url() {
        let (_dir, svc) = service().await;
        let issued = svc
            .handle(request(
                Method::POST,
                "/buckets/uploads/avatar.png/signed-url?expires=120",
                Some(BEARER),
                b"",
            ))
            .await;
        assert_eq!(issued.status(), StatusCode::OK);
        let json: serde_json::Value =
            serde_json::from_str(&body_string(issued).await).expect("valid JSON");
        assert_eq!(json["method"], "PUT");
        assert_eq!(json["expires_in"], 120);
        let url = json["url"].as_str().expect("url string");
        let path_and_query = url
            .strip_prefix("http://gateway.test")
            .expect("url under public base");

        let put = svc
            .handle(request(Method::PUT, path_and_query, None, b"png-bytes"))
            .await;
        assert_eq!(put.status(), StatusCode::OK);

        let other_key = path_and_query.replace("avatar.png", "other.png");
        let forged = svc
            .handle(request(Method::PUT, &other_key, None, b"png-bytes"))
            .await;
        assert_eq!(forged.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_should_read_signed_url_ttl_from_json_body() {
        let (_dir, svc) = service().await;
        let issued = svc
            .handle(request(
                Method::POST,
                "/buckets/uploads/a.bin/signed-url",
                Some(BEARER),
                br#"{"expires": 30}"#,
            ))
            .await;
        let json: serde_json::Value =
            serde_json::from_str(&body_string(issued).await).expect("valid JSON");
        assert_eq!(json["expires_in"], 30);
    }

    #[tokio::test]
    async fn test_should_return_json_error_for_signed_url() {
        let (_dir, svc) = service().await;
        let response = svc
            .handle(request(Method::POST, "/buckets/uploads/a.bin/signed-url", None, b""))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(header_str(&response, "content-type"), "application/json");
        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).expect("valid JSON");
        assert_eq!(json["Error"]["Code"], "InvalidToken");
    }

    #[tokio::test]
    async fn test_should_reject_expired_signature() {
        let (_dir, svc) = service().await;
        let response = svc
            .handle(request(
                Method::PUT,
                "/buckets/b/k?expires=1&signature=00",
                None,
                b"x",
            ))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_string(response).await.contains("<Code>ExpiredToken</Code>"));
    }

    #[tokio::test]
    async fn test_should_accept_bearer_despite_malformed_signature() {
        let (_dir, svc) = service().await;
        let response = svc
            .handle(request(Method::PUT, "/buckets/b/k.txt?signature=abc", Some(BEARER), b"x"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let unauthorized = svc
            .handle(request(Method::PUT, "/buckets/b/k.txt?signature=abc", None, b"x"))
            .await;
        assert_eq!(unauthorized.status(), StatusCode::FORBIDDEN);
        assert!(body_string(unauthorized).await.contains("<Code>InvalidToken</Code>"));
    }

    #[tokio::test]
    async fn test_should_reject_traversal_key() {
        let (_dir, svc) = service().await;
        let response = svc
            .handle(request(Method::GET, "/buckets/b/..%2F..%2Fetc%2Fpasswd", None, b""))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("<Code>InvalidRequest</Code>"));
    }

    #[tokio::test]
    async fn test_should_add_common_headers_to_every_response() {
        let (_dir, svc) = service().await;
        let response = svc
            .handle(request(Method::GET, "/nowhere", None, b""))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let request_id = header_str(&response, REQUEST_ID_HEADER).to_owned();
        assert!(!request_id.is_empty());
        assert_eq!(header_str(&response, "server"), "stowage");
        assert_eq!(header_str(&response, "access-control-allow-origin"), "*");
        let body = body_string(response).await;
        assert!(body.contains("<Code>NoSuchRoute</Code>"));
        assert!(body.contains(&format!("<RequestId>{request_id}</RequestId>")));
    }

    #[tokio::test]
    async fn test_should_answer_preflight_and_health() {
        let (_dir, svc) = service().await;
        let preflight = svc
            .handle(request(Method::OPTIONS, "/buckets/b/k", None, b""))
            .await;
        assert_eq!(preflight.status(), StatusCode::OK);
        assert!(!header_str(&preflight, "access-control-allow-methods").is_empty());

        let health = svc.handle(request(Method::GET, "/health", None, b"")).await;
        assert_eq!(health.status(), StatusCode::OK);
        assert!(body_string(health).await.contains("\"running\""));
    }

    #[tokio::test]
    async fn test_should_return_method_not_allowed() {
        let (_dir, svc) = service().await;
        let response = svc
            .handle(request(Method::PATCH, "/buckets/b/k", None, b""))
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_should_parse_ttl_tolerantly() {
        assert_eq!(parse_ttl("60"), Some(60));
        assert_eq!(parse_ttl("-5"), Some(0));
        assert_eq!(parse_ttl("soon"), None);
    }
}
