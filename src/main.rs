//! Demo host for the module front-end.
//!
//! Registers an echo request module and an echo stream module, then
//! serves them. Real deployments embed [`modgate::Server`] in their own
//! process and register their own modules.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use clap::Parser;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modgate::observability::metrics;
use modgate::{
    BoxError, Handler, HandshakeInfo, Message, ModuleRequest, RequestModule, Server, ServerConfig,
    Session, SessionPeer, StreamModule,
};

#[derive(Parser)]
#[command(name = "modgate")]
#[command(about = "Embeddable HTTP/WebSocket module front-end", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Request module echoing back what the router dispatched.
struct EchoModule;

#[async_trait]
impl RequestModule for EchoModule {
    async fn handle(&self, request: ModuleRequest) -> Result<Option<Response<Bytes>>, BoxError> {
        let payload = serde_json::json!({
            "path": request.path,
            "params": request.params,
            "body": request.text(),
        });
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from(payload.to_string()))?;
        Ok(Some(response))
    }
}

/// Stream module echoing every frame back to the peer.
struct EchoStream;

struct EchoSession {
    location: String,
}

#[async_trait]
impl StreamModule for EchoStream {
    async fn connect(&self, handshake: HandshakeInfo, _request: ModuleRequest) -> Box<dyn Session> {
        Box::new(EchoSession {
            location: handshake.location,
        })
    }
}

#[async_trait]
impl Session for EchoSession {
    async fn register(&mut self, peer: &SessionPeer) -> Result<(), BoxError> {
        peer.send_text(format!("connected: {}", self.location)).await
    }

    async fn on_message(&mut self, peer: &SessionPeer, message: Message) -> Result<(), BoxError> {
        peer.send(message).await
    }

    async fn on_error(&mut self, _peer: &SessionPeer, error: BoxError) {
        tracing::warn!(error = %error, "Echo session error");
    }

    async fn on_close(&mut self) {
        tracing::debug!(location = %self.location, "Echo session closed");
    }
}

// Two I/O workers service all connections; handlers run on whichever
// worker owns the connection.
#[tokio::main(worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modgate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => modgate::config::load_config(path)?,
        None => ServerConfig::default(),
    };

    tracing::info!(
        ip = %config.network.ip,
        port = config.network.port,
        cors = config.cors_origin().unwrap_or("-"),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = Server::new(config);
    let registry = server.registry();
    registry.register("echo", Handler::Request(Arc::new(EchoModule)))?;
    registry.register("echo-ws", Handler::Stream(Arc::new(EchoStream)))?;

    metrics::spawn_reporter(registry, server.counters());

    tokio::select! {
        result = server.run() => {
            if let Err(e) = &result {
                tracing::error!(error = %e, "Network service disabled");
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
