//! WebSocket session management.
//!
//! # Data Flow
//! ```text
//! Upgrade-intent request resolved to a StreamModule
//!     → handshake.rs (validate version/headers, build 101 or 426)
//!     → rate counter increment
//!     → hyper upgrade completes, raw stream recovered
//!     → StreamModule::connect builds the Session
//!     → session.rs (driver owns the frame loop until termination)
//! ```
//!
//! # Lifecycle
//! `Pending → Handshaking → Active → Terminated`; the terminal state is
//! idempotent. Errors past the 101 never become HTTP statuses; they are
//! delivered to the session's own error handler.

pub mod handshake;
pub mod session;

use std::sync::Arc;

use hyper_util::rt::TokioIo;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream;

use crate::module::{ModuleRequest, StreamModule};
pub use handshake::{HandshakeError, HandshakeInfo};
pub use session::{Session, SessionDriver, SessionPeer, SessionState};
pub use tokio_tungstenite::tungstenite::Message;

/// Complete the upgrade in the background and hand the connection to a
/// session built by the module.
///
/// Runs after the `101 Switching Protocols` response is in flight; from
/// here on the connection speaks WebSocket and failures are a session
/// concern, not an HTTP one.
pub(crate) fn spawn_session(
    on_upgrade: hyper::upgrade::OnUpgrade,
    module: Arc<dyn StreamModule>,
    handshake: HandshakeInfo,
    request: ModuleRequest,
) {
    tokio::spawn(async move {
        let upgraded = match on_upgrade.await {
            Ok(upgraded) => upgraded,
            Err(e) => {
                tracing::error!(error = %e, "WebSocket upgrade failed before takeover");
                return;
            }
        };

        let stream =
            WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Server, None).await;
        let session = module.connect(handshake, request).await;
        SessionDriver::new(session).run(stream).await;
    });
}
