//! Response post-processing.
//!
//! # Responsibilities
//! - Attach the standard `Server`, `X-Powered-By` and `Module` headers
//! - Negotiate gzip content-encoding against `Accept-Encoding`
//! - Add `Date` and the configured CORS origin when absent
//! - Mark every response `Connection: close` (one exchange per
//!   connection is a protocol rule here, not an accident)
//!
//! # Design Decisions
//! - Responses that already declare a `Content-Encoding` pass through
//!   untouched; the handler is trusted to have pre-encoded them
//! - gzip is negotiated on a case-insensitive substring match over the
//!   `Accept-Encoding` values, not on parsed tokens

use std::io::Write;

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use http_body_util::Full;
use hyper::header::{
    HeaderMap, HeaderValue, ACCEPT_ENCODING, ACCESS_CONTROL_ALLOW_ORIGIN, CONNECTION,
    CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, DATE, SERVER, VARY,
};
use hyper::{Response, StatusCode, Version};

/// `Server` header value.
pub(crate) const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

/// `X-Powered-By` header value.
pub(crate) const POWERED_BY: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A terse status-only response. Detail stays in the log.
pub(crate) fn error_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(SERVER, SERVER_NAME)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONNECTION, "close")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static error response")
}

/// The `204 No Content` emitted when a handler returns nothing.
pub(crate) fn no_content_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(CONNECTION, "close")
        .body(Full::new(Bytes::new()))
        .expect("static no-content response")
}

/// Normalize a handler-produced response before it hits the wire.
pub(crate) fn post_process(
    response: Response<Bytes>,
    module_id: &str,
    request_headers: &HeaderMap,
    cors_origin: Option<&str>,
) -> Response<Full<Bytes>> {
    let (mut parts, mut body) = response.into_parts();

    parts.version = Version::HTTP_11;
    parts
        .headers
        .insert(SERVER, HeaderValue::from_static(SERVER_NAME));
    parts
        .headers
        .insert("x-powered-by", HeaderValue::from_static(POWERED_BY));
    if let Ok(value) = HeaderValue::from_str(module_id) {
        parts.headers.insert("module", value);
    }

    if !parts.headers.contains_key(CONTENT_ENCODING) && accepts_gzip(request_headers) {
        match gzip(&body) {
            Ok(compressed) => {
                parts
                    .headers
                    .insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
                parts
                    .headers
                    .append(VARY, HeaderValue::from_static("Accept-Encoding"));
                parts
                    .headers
                    .insert(CONTENT_LENGTH, HeaderValue::from(compressed.len()));
                body = Bytes::from(compressed);
            }
            Err(e) => {
                tracing::warn!(error = %e, "gzip encoding failed, sending identity");
            }
        }
    }

    if !parts.headers.contains_key(DATE) {
        if let Ok(value) = HeaderValue::from_str(&http_date()) {
            parts.headers.insert(DATE, value);
        }
    }

    if let Some(origin) = cors_origin {
        if !parts.headers.contains_key(ACCESS_CONTROL_ALLOW_ORIGIN) {
            if let Ok(value) = HeaderValue::from_str(origin) {
                parts.headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
            }
        }
    }

    parts
        .headers
        .insert(CONNECTION, HeaderValue::from_static("close"));

    Response::from_parts(parts, Full::new(body))
}

/// Whether any `Accept-Encoding` value contains `gzip`, case-insensitively.
fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.to_ascii_lowercase().contains("gzip"))
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Current time in RFC 7231 IMF-fixdate format.
fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
