//! WebSocket connection and event loop.
//!
//! Each accepted socket gets one event loop task that handles:
//!
//! - Host events, forwarded in arrival order to the lifecycle tracker
//! - Router requests, dispatched concurrently and answered on the same socket
//! - Outgoing replies queued by finished request tasks

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::Error;
use crate::lifecycle::HostEvent;
use crate::protocol::{Incoming, Response};
use crate::router::RequestRouter;

// ============================================================================
// Constants
// ============================================================================

/// Maximum requests dispatched but not yet answered on one connection.
const MAX_PENDING_REQUESTS: usize = 100;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a serialized reply.
    Reply(String),
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to one browser-side WebSocket client.
///
/// Dropping the handle does not close the socket; call [`Connection::shutdown`].
#[derive(Clone)]
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Requests dispatched but not yet answered.
    pending: Arc<AtomicUsize>,
}

impl Connection {
    /// Spawns the event loop for an upgraded stream.
    ///
    /// The returned handle completes when the socket closes.
    pub(crate) fn spawn(
        ws_stream: WebSocketStream<TcpStream>,
        router: RequestRouter,
        events: mpsc::UnboundedSender<HostEvent>,
    ) -> (Self, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let connection = Self {
            command_tx,
            pending: Arc::new(AtomicUsize::new(0)),
        };

        let task = tokio::spawn(connection.clone().run_event_loop(
            ws_stream, command_rx, router, events,
        ));

        (connection, task)
    }

    /// Returns the number of requests still being dispatched.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Closes the socket.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        self,
        ws_stream: WebSocketStream<TcpStream>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        router: RequestRouter,
        events: mpsc::UnboundedSender<HostEvent>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_incoming_message(&text, &router, &events);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Reply(json)) => {
                            if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                                warn!(error = %e, "Failed to send reply");
                                break;
                            }
                            trace!("Reply sent");
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        // Unreachable while `self` holds a sender.
                        None => break,
                    }
                }
            }
        }

        debug!("Event loop terminated");
    }

    /// Handles an incoming text frame.
    fn handle_incoming_message(
        &self,
        text: &str,
        router: &RequestRouter,
        events: &mpsc::UnboundedSender<HostEvent>,
    ) {
        let incoming = match Incoming::parse(text) {
            Ok(incoming) => incoming,
            Err(e) => {
                warn!(error = %e, "Failed to parse incoming message");
                self.reply(error_reply(None, &e));
                return;
            }
        };

        match incoming {
            Incoming::Event(event) => {
                let Some(host_event) = event.parse() else {
                    trace!(method = %event.method, "Ignoring event");
                    return;
                };
                if events.send(host_event).is_err() {
                    debug!(method = %event.method, "Event dropped, tracker stopped");
                }
            }

            Incoming::Request { id, body } => self.dispatch_request(id, body, router),
        }
    }

    /// Dispatches a request on its own task so a slow handler does not hold
    /// up events or other requests.
    fn dispatch_request(&self, id: Option<Value>, body: Value, router: &RequestRouter) {
        let pending = self.pending.fetch_add(1, Ordering::SeqCst);
        if pending >= MAX_PENDING_REQUESTS {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            warn!(pending, max = MAX_PENDING_REQUESTS, "Too many pending requests");
            let e = Error::protocol(format!(
                "Too many pending requests: {pending}/{MAX_PENDING_REQUESTS}"
            ));
            self.reply(error_reply(id, &e));
            return;
        }

        let connection = self.clone();
        let router = router.clone();
        tokio::spawn(async move {
            let reply = match router.dispatch_value(body).await {
                Ok(reply) => reply,
                Err(e) => error_reply(id, &e),
            };
            connection.pending.fetch_sub(1, Ordering::SeqCst);
            connection.reply(reply);
        });
    }

    fn reply(&self, reply: Value) {
        let json = reply.to_string();
        if self.command_tx.send(ConnectionCommand::Reply(json)).is_err() {
            debug!("Reply dropped, connection closed");
        }
    }
}

/// Builds an `{ "error": ... }` reply, echoing the correlation ID if known.
fn error_reply(id: Option<Value>, error: &Error) -> Value {
    Response::error(error)
        .to_value_with_id(id.clone())
        .unwrap_or_else(|_| json!({ "id": id, "error": error.to_string() }))
}

// ============================================================================
// Tests
// ============================================================================
