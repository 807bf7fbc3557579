//! Pluggable module subsystem.
//!
//! A module is a request handler bound to the first path segment of the
//! request URI. Two kinds exist and the distinction is an explicit
//! discriminant, checked before invocation:
//!
//! - [`RequestModule`]: one-shot request/response exchanges
//! - [`StreamModule`]: produces a long-lived [`Session`] after a
//!   WebSocket upgrade
//!
//! # Data Flow
//! ```text
//! host application
//!     → registry.rs (register handler under identifier)
//!     → router resolves identifier per request
//!     → RequestModule::handle or StreamModule::connect
//! ```

pub mod registry;
pub mod request;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use hyper::Response;

use crate::ws::handshake::HandshakeInfo;
use crate::ws::session::Session;
pub use registry::{ModuleRegistry, RegistryError};
pub use request::ModuleRequest;

/// Boxed error type for module and session faults.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A module handling one-shot HTTP exchanges.
///
/// Returning `Ok(None)` means "no content": the client receives a bare
/// `204 No Content`. Errors are logged and converted to a 500 by the
/// router; their detail never reaches the client.
#[async_trait]
pub trait RequestModule: Send + Sync {
    async fn handle(&self, request: ModuleRequest) -> Result<Option<Response<Bytes>>, BoxError>;
}

/// A module producing sessions for upgraded bidirectional connections.
///
/// `connect` runs after the WebSocket handshake has completed; the
/// returned session becomes the frame handler for the connection.
#[async_trait]
pub trait StreamModule: Send + Sync {
    async fn connect(&self, handshake: HandshakeInfo, request: ModuleRequest) -> Box<dyn Session>;
}

/// A registered handler, polymorphic over the two module kinds.
#[derive(Clone)]
pub enum Handler {
    Request(Arc<dyn RequestModule>),
    Stream(Arc<dyn StreamModule>),
}

impl Handler {
    pub fn kind(&self) -> HandlerKind {
        match self {
            Handler::Request(_) => HandlerKind::Request,
            Handler::Stream(_) => HandlerKind::Stream,
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Request(_) => f.write_str("Handler::Request"),
            Handler::Stream(_) => f.write_str("Handler::Stream"),
        }
    }
}

/// Discriminant of a [`Handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Request,
    Stream,
}
