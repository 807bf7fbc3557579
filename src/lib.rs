//! modgate: embeddable HTTP/WebSocket front-end with pluggable modules.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                    MODGATE                     │
//!                      │                                                │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌─────────────┐ │
//!   ───────────────────┼─▶│   net   │──▶│   http   │──▶│   module    │ │
//!                      │  │listener │   │ pipeline │   │  registry   │ │
//!                      │  └─────────┘   └────┬─────┘   └──────┬──────┘ │
//!                      │                     │                │        │
//!                      │                     ▼                ▼        │
//!                      │               ┌──────────┐   ┌─────────────┐  │
//!                      │               │  router  │──▶│   handler   │  │
//!                      │               │ + hook   │   │ Request/    │  │
//!                      │               └────┬─────┘   │ Stream      │  │
//!                      │                    │         └──────┬──────┘  │
//!   Client Response    │  ┌──────────┐      │                │         │
//!   ◀──────────────────┼──│ response │◀─────┘         ┌──────▼──────┐  │
//!                      │  │ post-proc│                │ ws session  │  │
//!                      │  └──────────┘                │   manager   │  │
//!                      │                              └─────────────┘  │
//!                      │  ┌──────────────────────────────────────────┐ │
//!                      │  │  config · observability (counters,       │ │
//!                      │  │  metrics exporter) · tls                 │ │
//!                      │  └──────────────────────────────────────────┘ │
//!                      └────────────────────────────────────────────────┘
//! ```
//!
//! One exchange per connection, by rule: every HTTP response closes the
//! connection. A request whose first path segment resolves to a
//! [`RequestModule`] gets a one-shot response; one carrying an `Upgrade`
//! header and resolving to a [`StreamModule`] is switched to WebSocket
//! and handed to the session it produces.

// Core subsystems
pub mod config;
pub mod http;
pub mod module;
pub mod net;
pub mod server;
pub mod ws;

// Cross-cutting concerns
pub mod observability;

pub use config::ServerConfig;
pub use http::{AllowAll, InterceptDecision, InterceptRequest, Interceptor};
pub use module::{
    BoxError, Handler, HandlerKind, ModuleRegistry, ModuleRequest, RegistryError, RequestModule,
    StreamModule,
};
pub use server::{Server, ServerError};
pub use ws::{HandshakeInfo, Message, Session, SessionPeer, SessionState};
