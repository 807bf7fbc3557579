//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - A blank CORS origin is normalized to "unset" at the accessor, not
//!   at parse time, so round-tripping a config file is lossless

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError};
pub use schema::{LimitsConfig, NetworkConfig, ObservabilityConfig, ServerConfig, TlsConfig};
