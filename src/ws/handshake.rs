//! WebSocket handshake validation and response construction.
//!
//! # Design Decisions
//! - Only protocol version 13 (RFC 6455) is accepted; anything else gets
//!   the protocol-defined `426 Upgrade Required` rejection carrying
//!   `Sec-WebSocket-Version: 13`
//! - The handshake location (`ws://` or `wss://`) is derived from the
//!   `Host` header and the original URI; the scheme observes whether TLS
//!   sits beneath the connection

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderMap, HeaderValue, CONNECTION, HOST, UPGRADE};
use hyper::{Response, StatusCode, Uri};
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;

const SEC_WEBSOCKET_KEY: &str = "sec-websocket-key";
const SEC_WEBSOCKET_VERSION: &str = "sec-websocket-version";
const SEC_WEBSOCKET_ACCEPT: &str = "sec-websocket-accept";

/// Error type for handshake validation.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The client requested a protocol version other than 13.
    #[error("unsupported WebSocket version")]
    UnsupportedVersion,

    /// The `Upgrade` header does not name the websocket protocol.
    #[error("Upgrade header does not request websocket")]
    NotWebSocket,

    /// `Sec-WebSocket-Key` is missing or unreadable.
    #[error("missing Sec-WebSocket-Key header")]
    MissingKey,
}

/// Handshake data handed to the stream module alongside the request.
#[derive(Debug, Clone)]
pub struct HandshakeInfo {
    /// Full `ws://` or `wss://` location of the upgraded connection.
    pub location: String,

    /// The client's `Sec-WebSocket-Key`.
    pub key: String,
}

/// Validate upgrade headers and return the client's key.
pub fn validate(headers: &HeaderMap) -> Result<String, HandshakeError> {
    let upgrade_is_websocket = headers
        .get(UPGRADE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);
    if !upgrade_is_websocket {
        return Err(HandshakeError::NotWebSocket);
    }

    let version_ok = headers
        .get(SEC_WEBSOCKET_VERSION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim() == "13")
        .unwrap_or(false);
    if !version_ok {
        return Err(HandshakeError::UnsupportedVersion);
    }

    headers
        .get(SEC_WEBSOCKET_KEY)
        .and_then(|value| value.to_str().ok())
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or(HandshakeError::MissingKey)
}

/// Build the `101 Switching Protocols` response for a validated key.
pub fn accept_response(key: &str) -> Response<Full<Bytes>> {
    let accept = derive_accept_key(key.as_bytes());
    Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(CONNECTION, "Upgrade")
        .header(UPGRADE, "websocket")
        .header(SEC_WEBSOCKET_ACCEPT, accept)
        .body(Full::new(Bytes::new()))
        .expect("static handshake response")
}

/// The protocol-defined rejection for an unsupported version.
pub fn unsupported_version_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::UPGRADE_REQUIRED)
        .header(SEC_WEBSOCKET_VERSION, "13")
        .body(Full::new(Bytes::new()))
        .expect("static handshake response")
}

/// The `ws(s)://host/uri` location reported to the stream module.
pub fn location(secure: bool, headers: &HeaderMap, uri: &Uri) -> String {
    let scheme = if secure { "wss" } else { "ws" };
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    format!("{}://{}{}", scheme, host, uri)
}
