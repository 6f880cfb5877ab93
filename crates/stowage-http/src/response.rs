//! Conversion of gateway outputs and errors into HTTP responses.
//!
//! Response categories:
//! - **Header-only**: HEAD, PUT acknowledgements, DELETE.
//! - **XML body**: bucket listings and the `<Error>` envelope.
//! - **JSON body**: health, greeting, signed URL issuance and its errors.
//! - **Streaming body**: GET passes the object through in chunks.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{self, HeaderValue};
use http::StatusCode;
use serde::Serialize;
use stowage_core::error::{ErrorCode, GatewayError};
use stowage_core::listing::ListingPage;
use stowage_core::ops::object::{GetObjectOutput, ObjectMetadata, PutObjectOutput};
use stowage_core::signing::IssuedUrl;
use stowage_xml::{error_to_xml, list_bucket_result};
use tracing::error;

use crate::body::GatewayBody;

/// `Content-Type` of XML responses.
pub const CONTENT_TYPE_XML: &str = "application/xml";

/// `Content-Type` of JSON responses.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Service name reported by health checks and the `Server` header.
pub const SERVICE_NAME: &str = "stowage";

/// HTTP response carrying a [`GatewayBody`].
pub type GatewayResponse = http::Response<GatewayBody>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Set a header on a response builder if the value is a valid header value.
fn set_optional_header(
    builder: http::response::Builder,
    name: header::HeaderName,
    value: Option<&str>,
) -> http::response::Builder {
    if let Some(v) = value {
        if let Ok(hv) = HeaderValue::from_str(v) {
            return builder.header(name, hv);
        }
    }
    builder
}

/// Format a timestamp as an RFC 1123 HTTP date.
#[must_use]
pub fn http_date(ts: &DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Build a response from a builder, converting build errors to `GatewayError`.
fn build_response(
    builder: http::response::Builder,
    body: GatewayBody,
) -> Result<GatewayResponse, GatewayError> {
    builder
        .body(body)
        .map_err(|e| GatewayError::Internal(anyhow::anyhow!("failed to build HTTP response: {e}")))
}

fn object_headers(metadata: &ObjectMetadata) -> http::response::Builder {
    let builder = http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, metadata.size)
        .header(header::LAST_MODIFIED, http_date(&metadata.last_modified));
    let builder = set_optional_header(builder, header::CONTENT_TYPE, Some(&metadata.content_type));
    set_optional_header(builder, header::ETAG, Some(&metadata.etag))
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<GatewayResponse, GatewayError> {
    let body = serde_json::to_vec(value)
        .map_err(|e| GatewayError::Internal(anyhow::anyhow!("failed to encode JSON: {e}")))?;
    build_response(
        http::Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, CONTENT_TYPE_JSON)
            .header(header::CONTENT_LENGTH, body.len()),
        GatewayBody::from_bytes(body),
    )
}

// ---------------------------------------------------------------------------
// Success responses
// ---------------------------------------------------------------------------

/// 200 with the object streamed as the body.
pub fn get_object_response(output: GetObjectOutput) -> Result<GatewayResponse, GatewayError> {
    let builder = object_headers(&output.metadata);
    build_response(builder, GatewayBody::from_reader(output.body))
}

/// 200 with object headers and no body.
pub fn head_object_response(metadata: &ObjectMetadata) -> Result<GatewayResponse, GatewayError> {
    build_response(object_headers(metadata), GatewayBody::empty())
}

/// 200 acknowledging an upload.
pub fn put_object_response(output: &PutObjectOutput) -> Result<GatewayResponse, GatewayError> {
    let builder = http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, 0);
    build_response(
        set_optional_header(builder, header::ETAG, Some(&output.etag)),
        GatewayBody::empty(),
    )
}

/// 204 after a delete.
pub fn delete_object_response() -> Result<GatewayResponse, GatewayError> {
    build_response(
        http::Response::builder().status(StatusCode::NO_CONTENT),
        GatewayBody::empty(),
    )
}

/// 200 with a `ListBucketResult` document.
pub fn list_objects_response(page: &ListingPage) -> Result<GatewayResponse, GatewayError> {
    let xml = list_bucket_result(page)
        .map_err(|e| GatewayError::Internal(anyhow::anyhow!("failed to serialize listing: {e}")))?;
    build_response(
        http::Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, CONTENT_TYPE_XML)
            .header(header::CONTENT_LENGTH, xml.len()),
        GatewayBody::from_bytes(xml),
    )
}

/// 200 with the issued URL as JSON.
pub fn signed_url_response(issued: &IssuedUrl) -> Result<GatewayResponse, GatewayError> {
    json_response(StatusCode::OK, issued)
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    service: &'static str,
}

#[derive(Serialize)]
struct HelloBody {
    message: &'static str,
}

/// 200 health status.
pub fn health_response() -> Result<GatewayResponse, GatewayError> {
    json_response(
        StatusCode::OK,
        &HealthBody {
            status: "running",
            service: SERVICE_NAME,
        },
    )
}

/// 200 greeting.
pub fn hello_response() -> Result<GatewayResponse, GatewayError> {
    json_response(
        StatusCode::OK,
        &HelloBody {
            message: "Hello World",
        },
    )
}

/// 200 CORS preflight answer.
#[must_use]
pub fn cors_preflight_response() -> GatewayResponse {
    http::Response::builder()
        .status(StatusCode::OK)
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "GET, HEAD, PUT, POST, DELETE, OPTIONS")
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "*")
        .header(header::ACCESS_CONTROL_MAX_AGE, "86400")
        .body(GatewayBody::empty())
        .expect("static CORS response should be valid")
}

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

/// Client-facing message. Internal details stay in the logs.
fn public_message(err: &GatewayError) -> String {
    match err {
        GatewayError::Internal(_) => ErrorCode::InternalError.default_message().to_owned(),
        other => other.to_string(),
    }
}

/// Render `err` as an XML `<Error>` response.
#[must_use]
pub fn error_to_response(err: &GatewayError, request_id: &str) -> GatewayResponse {
    let code = err.code();
    if code.status_code().is_server_error() {
        error!(code = %code, error = %err, request_id, "request failed");
    }
    let xml = error_to_xml(code.as_str(), &public_message(err), err.key(), request_id);
    let len = xml.len();

    http::Response::builder()
        .status(code.status_code())
        .header(header::CONTENT_TYPE, CONTENT_TYPE_XML)
        .header(header::CONTENT_LENGTH, len)
        .body(GatewayBody::from_bytes(Bytes::from(xml)))
        .unwrap_or_else(|_| {
            http::Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(GatewayBody::empty())
                .expect("static error response should be valid")
        })
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct JsonErrorDetail<'a> {
    code: &'a str,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct JsonErrorBody<'a> {
    error: JsonErrorDetail<'a>,
}

/// Render `err` as a JSON `{"Error":{"Code","Message"}}` response.
#[must_use]
pub fn error_to_json_response(err: &GatewayError, request_id: &str) -> GatewayResponse {
    let code = err.code();
    if code.status_code().is_server_error() {
        error!(code = %code, error = %err, request_id, "request failed");
    }
    let body = JsonErrorBody {
        error: JsonErrorDetail {
            code: code.as_str(),
            message: public_message(err),
        },
    };
    match json_response(code.status_code(), &body) {
        Ok(response) => response,
        Err(_) => http::Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(GatewayBody::empty())
            .expect("static error response should be valid"),
    }
}
