//! Server wiring: listener, optional TLS, accept loop.
//!
//! # Responsibilities
//! - Own the shared routing state (registry, interceptor, counters)
//! - Bind the listener and accept connections
//! - Terminate TLS when configured, transparently to the pipeline
//! - Spawn one pipeline task per accepted connection
//!
//! # Failure scope
//! Bind and TLS-setup errors are fatal to this subsystem only: they are
//! returned to the embedding host, which may keep running without
//! network service. Per-connection errors never escape their task.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::http::{pipeline, AllowAll, Interceptor, Router};
use crate::module::ModuleRegistry;
use crate::net::{load_tls_acceptor, Listener, ListenerError, TlsError};
use crate::observability::RateCounters;

/// Error type for server startup.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// The embeddable front-end.
///
/// A host registers modules through [`registry`], optionally installs an
/// [`Interceptor`], and calls [`run`]. Registration is expected to
/// happen before traffic starts.
///
/// [`registry`]: Server::registry
/// [`run`]: Server::run
pub struct Server {
    config: ServerConfig,
    registry: Arc<ModuleRegistry>,
    interceptor: Arc<dyn Interceptor>,
    counters: Arc<RateCounters>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            registry: Arc::new(ModuleRegistry::new()),
            interceptor: Arc::new(AllowAll),
            counters: Arc::new(RateCounters::new()),
        }
    }

    /// Install the interception hook consulted before every dispatch.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = interceptor;
        self
    }

    /// The module registry backing this server.
    pub fn registry(&self) -> Arc<ModuleRegistry> {
        self.registry.clone()
    }

    /// The per-minute traffic counters, for metrics polling.
    pub fn counters(&self) -> Arc<RateCounters> {
        self.counters.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and serve until the task is dropped.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = Listener::bind(&self.config.network, &self.config.limits).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(self, listener: Listener) -> Result<(), ServerError> {
        let tls_acceptor = match &self.config.tls {
            Some(tls) => Some(load_tls_acceptor(
                Path::new(&tls.cert_path),
                Path::new(&tls.key_path),
            )?),
            None => None,
        };

        let router = Arc::new(Router::new(
            self.registry.clone(),
            self.interceptor.clone(),
            self.counters.clone(),
            self.config.cors_origin().map(str::to_string),
            self.config.limits.max_body_bytes,
        ));
        let exchange_timeout = Duration::from_secs(self.config.limits.exchange_timeout_secs);

        tracing::info!(
            modules = self.registry.len(),
            tls = tls_acceptor.is_some(),
            "Serving modules"
        );

        loop {
            let (stream, peer_addr, permit) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    continue;
                }
            };

            let router = router.clone();
            let tls_acceptor = tls_acceptor.clone();
            tokio::spawn(async move {
                let _permit = permit;
                match tls_acceptor {
                    Some(acceptor) => match acceptor.accept(stream).await {
                        Ok(tls_stream) => {
                            pipeline::serve_connection(
                                tls_stream,
                                router,
                                peer_addr,
                                true,
                                exchange_timeout,
                            )
                            .await
                        }
                        Err(e) => {
                            tracing::debug!(peer_addr = %peer_addr, error = %e, "TLS handshake failed");
                        }
                    },
                    None => {
                        pipeline::serve_connection(stream, router, peer_addr, false, exchange_timeout)
                            .await
                    }
                }
            });
        }
    }
}
