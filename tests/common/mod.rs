//! Shared helpers for socket-level tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use modgate::net::Listener;
use modgate::observability::RateCounters;
use modgate::{
    BoxError, HandshakeInfo, Message, ModuleRequest, RequestModule, Server, ServerConfig, Session,
    SessionPeer, StreamModule,
};

/// Request module answering with a plain-text reflection of the dispatch.
pub struct ReflectModule;

#[async_trait]
impl RequestModule for ReflectModule {
    async fn handle(&self, request: ModuleRequest) -> Result<Option<Response<Bytes>>, BoxError> {
        let mut params: Vec<_> = request
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        params.sort();
        let body = format!("path={} params=[{}]", request.path, params.join(","));
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/plain")
            .body(Bytes::from(body))?;
        Ok(Some(response))
    }
}

/// Stream module echoing every frame.
pub struct EchoStream;

struct EchoSession;

#[async_trait]
impl StreamModule for EchoStream {
    async fn connect(&self, _handshake: HandshakeInfo, _request: ModuleRequest) -> Box<dyn Session> {
        Box::new(EchoSession)
    }
}

#[async_trait]
impl Session for EchoSession {
    async fn register(&mut self, _peer: &SessionPeer) -> Result<(), BoxError> {
        Ok(())
    }

    async fn on_message(&mut self, peer: &SessionPeer, message: Message) -> Result<(), BoxError> {
        peer.send(message).await
    }

    async fn on_error(&mut self, _peer: &SessionPeer, _error: BoxError) {}

    async fn on_close(&mut self) {}
}

/// Loopback config on an ephemeral port.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.network.ip = "127.0.0.1".to_string();
    config.network.port = 0;
    config.observability.metrics_enabled = false;
    config
}

/// Bind the server and serve it in the background.
///
/// Returns the bound address and the server's rate counters.
pub async fn start(server: Server) -> (SocketAddr, Arc<RateCounters>) {
    let counters = server.counters();
    let listener = Listener::bind(&server.config().network, &server.config().limits)
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(server.serve(listener));
    (addr, counters)
}

/// One parsed HTTP response read off a raw socket.
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Send one raw HTTP request and read the response until close.
pub async fn raw_request(addr: SocketAddr, request: &str) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream
        .write_all(request.as_bytes())
        .await
        .expect("write request");

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.expect("read response");

    parse_response(&raw)
}

fn parse_response(raw: &[u8]) -> RawResponse {
    let split = raw
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .expect("header terminator");
    let head = std::str::from_utf8(&raw[..split]).expect("header text");
    let body = raw[split + 4..].to_vec();

    let mut lines = head.lines();
    let status_line = lines.next().expect("status line");
    let status = status_line
        .split_whitespace()
        .nth(1)
        .expect("status code")
        .parse()
        .expect("numeric status");

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    RawResponse {
        status,
        headers,
        body,
    }
}

/// A GET request in origin form with optional extra headers.
pub fn get_request(target: &str, extra_headers: &[(&str, &str)]) -> String {
    let mut request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n", target);
    for (name, value) in extra_headers {
        request.push_str(&format!("{}: {}\r\n", name, value));
    }
    request.push_str("\r\n");
    request
}
