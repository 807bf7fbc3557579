//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Resolve the configured address (`"*"`/empty ip = all interfaces)
//! - Bind and accept incoming TCP connections
//! - Enforce max_connections via semaphore
//! - Graceful handling of accept errors

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::config::{LimitsConfig, NetworkConfig};

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The configured ip is not a valid address.
    #[error("invalid bind address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        source: std::net::AddrParseError,
    },

    /// Failed to bind to address.
    #[error("failed to bind: {0}")]
    Bind(#[from] std::io::Error),
}

/// Resolve the bind address from network configuration.
///
/// An empty or `"*"` ip means all interfaces.
pub fn bind_address(config: &NetworkConfig) -> Result<SocketAddr, ListenerError> {
    let ip = config.ip.trim();
    if ip.is_empty() || ip == "*" {
        return Ok(SocketAddr::from(([0, 0, 0, 0], config.port)));
    }
    let ip: IpAddr = ip.parse().map_err(|source| ListenerError::InvalidAddress {
        address: config.ip.clone(),
        source,
    })?;
    Ok(SocketAddr::new(ip, config.port))
}

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is
/// reached, new connections wait until a slot becomes available.
pub struct Listener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
}

impl Listener {
    /// Bind to the configured address with connection limits.
    pub async fn bind(network: &NetworkConfig, limits: &LimitsConfig) -> Result<Self, ListenerError> {
        let addr = bind_address(network)?;
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            address = %local_addr,
            max_connections = limits.max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(limits.max_connections)),
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Waits if the connection limit has been reached. Returns the
    /// stream and a permit that must be held for the connection's
    /// lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), std::io::Error> {
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .expect("Semaphore closed unexpectedly");

        let (stream, addr) = self.inner.accept().await?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the slot is released back to the pool, so backpressure
/// holds even if the connection handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_and_empty_bind_all_interfaces() {
        for ip in ["*", "", "  "] {
            let addr = bind_address(&NetworkConfig {
                ip: ip.to_string(),
                port: 8080,
            })
            .unwrap();
            assert!(addr.ip().is_unspecified());
            assert_eq!(addr.port(), 8080);
        }
    }

    #[test]
    fn explicit_ip_is_used() {
        let addr = bind_address(&NetworkConfig {
            ip: "127.0.0.1".to_string(),
            port: 9000,
        })
        .unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn invalid_ip_is_a_bind_fault() {
        let err = bind_address(&NetworkConfig {
            ip: "not-an-ip".to_string(),
            port: 9000,
        })
        .unwrap_err();
        assert!(matches!(err, ListenerError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let listener = Listener::bind(
            &NetworkConfig {
                ip: "127.0.0.1".to_string(),
                port: 0,
            },
            &LimitsConfig::default(),
        )
        .await
        .unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}
