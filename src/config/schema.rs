//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! front-end. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the module front-end.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Network configuration (bind address, port).
    pub network: NetworkConfig,

    /// Value for `Access-Control-Allow-Origin` on module responses.
    /// Empty or blank means the header is never added.
    pub access_control_allow_origin: Option<String>,

    /// Connection and request limits.
    pub limits: LimitsConfig,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServerConfig {
    /// The configured CORS origin, with blank values treated as unset.
    pub fn cors_origin(&self) -> Option<&str> {
        self.access_control_allow_origin
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// IP address to bind. Empty or `"*"` binds all interfaces.
    pub ip: String,

    /// Port to bind.
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ip: "*".to_string(),
            port: 8080,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Connection and request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Maximum aggregated request body size in bytes.
    pub max_body_bytes: usize,

    /// Upper bound on one request/response exchange in seconds.
    /// Connections that never complete an exchange are dropped after this.
    pub exchange_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            max_body_bytes: 64 * 1024,
            exchange_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cors_origin_is_unset() {
        let mut config = ServerConfig::default();
        assert_eq!(config.cors_origin(), None);

        config.access_control_allow_origin = Some("   ".to_string());
        assert_eq!(config.cors_origin(), None);

        config.access_control_allow_origin = Some("https://example.com".to_string());
        assert_eq!(config.cors_origin(), Some("https://example.com"));
    }
}
