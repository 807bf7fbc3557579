//! Session lifecycle and frame-loop ownership.
//!
//! # Responsibilities
//! - Define the [`Session`] contract implemented by stream modules
//! - Drive the frame loop of one upgraded connection
//! - Track lifecycle state (Pending → Handshaking → Active → Terminated)
//! - Guarantee single-fire, idempotent termination
//!
//! # Design Decisions
//! - The driver owns the read half; outbound frames go through a channel
//!   so the session can write from any task via [`SessionPeer`]
//! - Ping/pong is handled transparently by the protocol layer; sessions
//!   only observe text and binary frames
//! - Errors after the upgrade never map to HTTP statuses; the protocol
//!   has already switched, so they are delivered to `on_error`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::module::BoxError;

/// Lifecycle state of one upgraded connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session constructed; the connection has not been taken over yet.
    Pending,
    /// Connection taken over; the session is being registered as its
    /// frame handler.
    Handshaking,
    /// The session is the connection's frame handler.
    Active,
    /// Terminal. Repeated termination signals are no-ops.
    Terminated,
}

/// A live bidirectional session produced by a stream module.
#[async_trait]
pub trait Session: Send {
    /// Called once when the session becomes the connection's frame
    /// handler. Errors are delivered back to [`on_error`] and terminate
    /// the session.
    ///
    /// [`on_error`]: Session::on_error
    async fn register(&mut self, peer: &SessionPeer) -> Result<(), BoxError>;

    /// Called for each inbound text or binary frame.
    async fn on_message(&mut self, peer: &SessionPeer, message: Message) -> Result<(), BoxError>;

    /// Exception notification. The session is terminated afterwards.
    async fn on_error(&mut self, peer: &SessionPeer, error: BoxError);

    /// Called exactly once on termination.
    async fn on_close(&mut self);
}

/// Outbound handle to the peer of a session.
///
/// Cheap to clone; usable from any task the session spawns.
#[derive(Clone)]
pub struct SessionPeer {
    outbound: mpsc::Sender<Message>,
    closing: Arc<AtomicBool>,
}

impl SessionPeer {
    /// Queue a frame for the peer.
    pub async fn send(&self, message: Message) -> Result<(), BoxError> {
        self.outbound.send(message).await.map_err(Into::into)
    }

    /// Queue a text frame for the peer.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), BoxError> {
        self.send(Message::text(text.into())).await
    }

    /// Request an orderly close. Only the first call sends a close
    /// frame; later calls are no-ops.
    pub async fn close(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.outbound.send(Message::Close(None)).await;
    }

    /// Whether a close has been requested on this handle.
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }
}

/// Drives the frame loop of one upgraded connection.
pub struct SessionDriver {
    session: Box<dyn Session>,
    peer: SessionPeer,
    outbound_rx: Option<mpsc::Receiver<Message>>,
    state: SessionState,
    terminated: bool,
}

impl SessionDriver {
    /// Outbound queue depth per session.
    const OUTBOUND_CAPACITY: usize = 32;

    pub fn new(session: Box<dyn Session>) -> Self {
        let (outbound, outbound_rx) = mpsc::channel(Self::OUTBOUND_CAPACITY);
        Self {
            session,
            peer: SessionPeer {
                outbound,
                closing: Arc::new(AtomicBool::new(false)),
            },
            outbound_rx: Some(outbound_rx),
            state: SessionState::Pending,
            terminated: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn peer(&self) -> &SessionPeer {
        &self.peer
    }

    /// Run the session over an upgraded stream until termination.
    ///
    /// Returns the final state, which is always `Terminated`.
    pub async fn run<S>(mut self, stream: WebSocketStream<S>) -> SessionState
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, mut frames) = stream.split();
        let outbound_rx = self
            .outbound_rx
            .take()
            .expect("driver runs exactly once");
        let writer = tokio::spawn(write_loop(sink, outbound_rx));

        self.state = SessionState::Handshaking;
        match self.session.register(&self.peer).await {
            Ok(()) => {
                self.state = SessionState::Active;
                tracing::debug!("Session active");

                while let Some(frame) = frames.next().await {
                    match frame {
                        Ok(Message::Close(_)) => break,
                        Ok(message) if message.is_text() || message.is_binary() => {
                            if let Err(e) = self.session.on_message(&self.peer, message).await {
                                self.session.on_error(&self.peer, e).await;
                                break;
                            }
                        }
                        // Ping/pong and raw frames stay in the protocol layer.
                        Ok(_) => {}
                        Err(e) => {
                            self.session.on_error(&self.peer, Box::new(e)).await;
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                self.session.on_error(&self.peer, e).await;
            }
        }

        self.terminate().await;
        writer.abort();
        self.state
    }

    /// Terminate the session. Single-fire: repeated calls are no-ops.
    pub async fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.state = SessionState::Terminated;
        self.session.on_close().await;
        tracing::debug!("Session terminated");
    }
}

async fn write_loop<S>(
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    mut outbound_rx: mpsc::Receiver<Message>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(message) = outbound_rx.recv().await {
        let closing = matches!(message, Message::Close(_));
        if sink.send(message).await.is_err() {
            break;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tokio_tungstenite::tungstenite::protocol::Role;

    use super::*;

    /// Session recording lifecycle callbacks.
    struct Recording {
        opened: Arc<AtomicUsize>,
        messages: Arc<AtomicUsize>,
        errors: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
        fail_register: bool,
    }

    #[async_trait]
    impl Session for Recording {
        async fn register(&mut self, _peer: &SessionPeer) -> Result<(), BoxError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            if self.fail_register {
                return Err("registration refused".into());
            }
            Ok(())
        }

        async fn on_message(
            &mut self,
            peer: &SessionPeer,
            message: Message,
        ) -> Result<(), BoxError> {
            self.messages.fetch_add(1, Ordering::SeqCst);
            peer.send(message).await
        }

        async fn on_error(&mut self, _peer: &SessionPeer, _error: BoxError) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Counters {
        opened: Arc<AtomicUsize>,
        messages: Arc<AtomicUsize>,
        errors: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    fn recording(fail_register: bool) -> (Box<dyn Session>, Counters) {
        let counters = Counters {
            opened: Arc::new(AtomicUsize::new(0)),
            messages: Arc::new(AtomicUsize::new(0)),
            errors: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        };
        let session = Box::new(Recording {
            opened: counters.opened.clone(),
            messages: counters.messages.clone(),
            errors: counters.errors.clone(),
            closes: counters.closes.clone(),
            fail_register,
        });
        (session, counters)
    }

    async fn ws_pair() -> (
        WebSocketStream<tokio::io::DuplexStream>,
        WebSocketStream<tokio::io::DuplexStream>,
    ) {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        (server, client)
    }

    #[tokio::test]
    async fn termination_is_idempotent() {
        let (session, counters) = recording(false);
        let mut driver = SessionDriver::new(session);

        driver.terminate().await;
        driver.terminate().await;
        driver.terminate().await;

        assert_eq!(driver.state(), SessionState::Terminated);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn echo_roundtrip_and_close() {
        let (server, mut client) = ws_pair().await;
        let (session, counters) = recording(false);
        let driver = SessionDriver::new(session);
        let task = tokio::spawn(driver.run(server));

        client.send(Message::text("hello")).await.unwrap();
        let echoed = client.next().await.unwrap().unwrap();
        assert_eq!(echoed, Message::text("hello"));

        client.send(Message::Close(None)).await.unwrap();
        let final_state = task.await.unwrap();

        assert_eq!(final_state, SessionState::Terminated);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.messages.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
        assert_eq!(counters.errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn registration_failure_reaches_error_handler() {
        let (server, _client) = ws_pair().await;
        let (session, counters) = recording(true);
        let driver = SessionDriver::new(session);

        let final_state = driver.run(server).await;

        assert_eq!(final_state, SessionState::Terminated);
        assert_eq!(counters.errors.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remote_disconnect_terminates_once() {
        let (server, client) = ws_pair().await;
        let (session, counters) = recording(false);
        let driver = SessionDriver::new(session);
        let task = tokio::spawn(driver.run(server));

        drop(client);
        let final_state = task.await.unwrap();

        assert_eq!(final_state, SessionState::Terminated);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn peer_close_is_single_fire() {
        let (session, _counters) = recording(false);
        let driver = SessionDriver::new(session);
        let peer = driver.peer().clone();

        peer.close().await;
        peer.close().await;
        assert!(peer.is_closing());
    }
}
