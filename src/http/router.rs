//! Request routing and dispatch.
//!
//! # Responsibilities
//! - Extract the module identifier (first path segment) from the URI
//! - Run the interception hook before any registry lookup
//! - Resolve the identifier and check handler kind against upgrade intent
//! - Build the module-facing request (sub-path, parameters, body)
//! - Convert handler faults into the 4xx/5xx taxonomy
//!
//! # Dispatch rules
//! ```text
//! malformed request          → 400 (rejected by the decoder)
//! hook denies                → 403, lookup never happens
//! unknown identifier         → 404
//! upgrade intent  + Request  → 404 (kind mismatch)
//! no intent       + Stream   → 404 (kind mismatch)
//! no intent       + Request  → handler → post-processor
//! upgrade intent  + Stream   → handshake → session manager
//! handler fault              → 500, logged, connection closed
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::UPGRADE;
use hyper::{Request, Response, StatusCode};

use crate::http::intercept::{InterceptDecision, InterceptRequest, Interceptor};
use crate::http::response;
use crate::module::request::parse_query;
use crate::module::{BoxError, Handler, ModuleRegistry, ModuleRequest, StreamModule};
use crate::observability::{self, RateCounters};
use crate::ws;
use crate::ws::handshake::{self, HandshakeError, HandshakeInfo};

/// Fixed body sent with interception denials.
const DENIED_BODY: &str = "The request has been canceled by an interceptor";

/// Per-server routing state shared by all connections.
pub struct Router {
    registry: Arc<ModuleRegistry>,
    interceptor: Arc<dyn Interceptor>,
    counters: Arc<RateCounters>,
    cors_origin: Option<String>,
    max_body_bytes: usize,
}

impl Router {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        interceptor: Arc<dyn Interceptor>,
        counters: Arc<RateCounters>,
        cors_origin: Option<String>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            registry,
            interceptor,
            counters,
            cors_origin,
            max_body_bytes,
        }
    }

    /// Turn one decoded request into a response.
    ///
    /// `secure` reports whether TLS sits beneath the connection; it only
    /// influences the WebSocket location scheme.
    pub async fn route<B>(
        &self,
        request: Request<B>,
        remote_addr: SocketAddr,
        secure: bool,
    ) -> Response<Full<Bytes>>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let start_time = Instant::now();
        let (module_id, sub_path) = split_identifier(request.uri().path());
        let (module_id, sub_path) = (module_id.to_string(), sub_path.to_string());

        let decision = self.interceptor.intercept(&InterceptRequest {
            module_id: module_id.clone(),
            remote_addr,
        });
        let module_id = match decision {
            InterceptDecision::Allow => module_id,
            InterceptDecision::Rewrite(id) => {
                tracing::debug!(from = %module_id, to = %id, "Interceptor rewrote module id");
                id
            }
            InterceptDecision::Deny => {
                tracing::warn!(
                    module_id = %module_id,
                    peer_addr = %remote_addr,
                    "Request denied by interceptor"
                );
                return response::error_response(StatusCode::FORBIDDEN, DENIED_BODY);
            }
        };

        let Some(handler) = self.registry.lookup(&module_id) else {
            tracing::debug!(module_id = %module_id, "No module bound");
            return response::error_response(StatusCode::NOT_FOUND, "Not Found");
        };

        let upgrade_intent = request.headers().contains_key(UPGRADE);
        match (upgrade_intent, handler) {
            (false, Handler::Request(module)) => {
                let method = request.method().as_str().to_string();
                let request_headers = request.headers().clone();

                let module_request = match self
                    .build_module_request(request, sub_path, remote_addr)
                    .await
                {
                    Ok(module_request) => module_request,
                    Err(rejection) => return rejection,
                };

                match module.handle(module_request).await {
                    Ok(handled) => {
                        self.counters.http.increment();
                        let processed = match handled {
                            None => response::no_content_response(),
                            Some(produced) => response::post_process(
                                produced,
                                &module_id,
                                &request_headers,
                                self.cors_origin.as_deref(),
                            ),
                        };
                        observability::metrics::record_request(
                            &method,
                            processed.status().as_u16(),
                            start_time,
                        );
                        processed
                    }
                    Err(e) => {
                        tracing::error!(
                            module_id = %module_id,
                            error = %e,
                            "Module handler failed"
                        );
                        observability::metrics::record_request(&method, 500, start_time);
                        response::error_response(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "Internal Server Error",
                        )
                    }
                }
            }
            (true, Handler::Stream(module)) => {
                self.upgrade(request, &module_id, sub_path, remote_addr, secure, module)
                    .await
            }
            (intent, handler) => {
                tracing::debug!(
                    module_id = %module_id,
                    upgrade_intent = intent,
                    kind = ?handler.kind(),
                    "Handler kind does not match request intent"
                );
                response::error_response(StatusCode::NOT_FOUND, "Not Found")
            }
        }
    }

    /// WebSocket path: validate the handshake, commit to the upgrade and
    /// hand the connection to the session manager.
    async fn upgrade<B>(
        &self,
        mut request: Request<B>,
        module_id: &str,
        sub_path: String,
        remote_addr: SocketAddr,
        secure: bool,
        module: Arc<dyn StreamModule>,
    ) -> Response<Full<Bytes>>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let key = match handshake::validate(request.headers()) {
            Ok(key) => key,
            Err(HandshakeError::UnsupportedVersion) => {
                tracing::debug!(module_id = %module_id, "Unsupported WebSocket version");
                return handshake::unsupported_version_response();
            }
            Err(e) => {
                tracing::debug!(module_id = %module_id, error = %e, "Invalid WebSocket handshake");
                return response::error_response(StatusCode::BAD_REQUEST, "Bad Request");
            }
        };

        let location = handshake::location(secure, request.headers(), request.uri());
        let on_upgrade = hyper::upgrade::on(&mut request);

        let module_request = match self
            .build_module_request(request, sub_path, remote_addr)
            .await
        {
            Ok(module_request) => module_request,
            Err(rejection) => return rejection,
        };

        self.counters.websocket.increment();
        observability::metrics::record_upgrade();
        tracing::debug!(module_id = %module_id, location = %location, "WebSocket handshake accepted");

        ws::spawn_session(
            on_upgrade,
            module,
            HandshakeInfo {
                location,
                key: key.clone(),
            },
            module_request,
        );
        handshake::accept_response(&key)
    }

    /// Aggregate the body and assemble the request a module sees.
    ///
    /// Rejections: 413 when the body exceeds the configured limit, 400
    /// when it cannot be read at all.
    async fn build_module_request<B>(
        &self,
        request: Request<B>,
        sub_path: String,
        remote_addr: SocketAddr,
    ) -> Result<ModuleRequest, Response<Full<Bytes>>>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();
        let params = parts.uri.query().map(parse_query).unwrap_or_default();

        let body = match Limited::new(body, self.max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::debug!(
                    limit = self.max_body_bytes,
                    peer_addr = %remote_addr,
                    "Request body over limit"
                );
                return Err(response::error_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Payload Too Large",
                ));
            }
            Err(e) => {
                tracing::debug!(error = %e, peer_addr = %remote_addr, "Failed to read request body");
                return Err(response::error_response(
                    StatusCode::BAD_REQUEST,
                    "Bad Request",
                ));
            }
        };

        Ok(ModuleRequest {
            method: parts.method,
            path: sub_path,
            params,
            body,
            headers: parts.headers,
            remote_addr,
        })
    }
}

/// Split a request path into (module identifier, sub-path).
///
/// The identifier is the first path segment, possibly empty (requests to
/// `/`). The sub-path is the remainder, always `/`-initial.
fn split_identifier(path: &str) -> (&str, &str) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let end = trimmed.find('/').unwrap_or(trimmed.len());
    let remainder = &trimmed[end..];
    (&trimmed[..end], if remainder.is_empty() { "/" } else { remainder })
}
