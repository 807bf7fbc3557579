//! Per-connection protocol pipeline.
//!
//! # Responsibilities
//! - Drive the HTTP/1.1 decoder/encoder over one accepted stream
//! - Enable protocol upgrades so WebSocket takeover can happen
//! - Enforce the one-exchange-per-connection rule (keep-alive off)
//! - Bound the exchange with a timeout so half-open connections cannot
//!   hold a slot forever
//!
//! # Design Decisions
//! - Malformed requests are answered with `400` by the decoder itself;
//!   the router only ever sees well-formed requests
//! - The pipeline is generic over the transport, so TLS termination
//!   beneath it is invisible to everything above

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::http::router::Router;

/// Serve one connection until its single exchange completes, it
/// upgrades, or the timeout fires.
pub(crate) async fn serve_connection<I>(
    io: I,
    router: Arc<Router>,
    remote_addr: SocketAddr,
    secure: bool,
    exchange_timeout: Duration,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |request| {
        let router = router.clone();
        async move {
            Ok::<_, Infallible>(router.route(request, remote_addr, secure).await)
        }
    });

    let connection = http1::Builder::new()
        .keep_alive(false)
        .serve_connection(TokioIo::new(io), service)
        .with_upgrades();

    match tokio::time::timeout(exchange_timeout, connection).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            // Covers malformed requests (the decoder has already written
            // the 400) and mid-exchange disconnects.
            tracing::debug!(peer_addr = %remote_addr, error = %e, "Connection ended with protocol error");
        }
        Err(_) => {
            tracing::debug!(
                peer_addr = %remote_addr,
                timeout_secs = exchange_timeout.as_secs(),
                "Connection dropped before completing an exchange"
            );
        }
    }
}
