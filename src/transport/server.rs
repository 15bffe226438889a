//! WebSocket server for browser-side clients.
//!
//! Every client (the host shim forwarding tab events, a popup, an overlay
//! page) connects to the same port. Connections are independent; there is
//! no handshake.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             RouterServer                │
//! │             (single port)               │
//! │  ┌─────────────────────────────────┐    │
//! │  │ #1 → Connection (host events)   │    │
//! │  │ #2 → Connection (popup)         │    │
//! │  │ #3 → Connection (overlay)       │    │
//! │  └─────────────────────────────────┘    │
//! └─────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::background::Background;
use crate::error::{Error, Result};
use crate::lifecycle::HostEvent;
use crate::router::RequestRouter;

use super::connection::Connection;

// ============================================================================
// Constants
// ============================================================================

/// Default bind address for the WebSocket server (localhost).
const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// How often the accept loop checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// RouterServer
// ============================================================================

/// Serves the request router and the host event feed over WebSocket.
///
/// # Example
///
/// ```ignore
/// let server = RouterServer::for_background(&background, 0).await?;
/// println!("WebSocket URL: {}", server.ws_url());
/// ```
pub struct RouterServer {
    /// WebSocket server port.
    port: u16,

    /// Request router shared by every connection.
    router: RequestRouter,

    /// Host event feed into the lifecycle tracker.
    events: mpsc::UnboundedSender<HostEvent>,

    /// Open connections by accept order.
    connections: RwLock<FxHashMap<u64, Connection>>,

    /// Next connection number.
    next_id: AtomicU64,

    /// Shutdown flag.
    shutdown: AtomicBool,
}

// ============================================================================
// RouterServer - Constructor
// ============================================================================

impl RouterServer {
    /// Binds to `localhost:port` and serves the given background process.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn for_background(background: &Background, port: u16) -> Result<Arc<Self>> {
        Self::bind(
            SocketAddr::new(DEFAULT_BIND_IP, port),
            background.router(),
            background.event_sender(),
        )
        .await
    }

    /// Binds to an address and starts the accept loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(
        addr: SocketAddr,
        router: RequestRouter,
        events: mpsc::UnboundedSender<HostEvent>,
    ) -> Result<Arc<Self>> {
        let listener = TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        debug!(port = actual_port, "WebSocket server bound");

        let server = Arc::new(Self {
            port: actual_port,
            router,
            events,
            connections: RwLock::new(FxHashMap::default()),
            next_id: AtomicU64::new(1),
            shutdown: AtomicBool::new(false),
        });

        tokio::spawn(Arc::clone(&server).accept_loop(listener));

        info!(port = actual_port, "RouterServer started");

        Ok(server)
    }
}

// ============================================================================
// RouterServer - Public API
// ============================================================================

impl RouterServer {
    /// Returns the WebSocket URL for this server.
    ///
    /// Format: `ws://127.0.0.1:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the number of open connections.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Stops accepting and closes every open connection.
    pub async fn shutdown(&self) {
        info!("RouterServer shutting down");

        self.shutdown.store(true, Ordering::SeqCst);

        let connections: Vec<_> = {
            let mut map = self.connections.write();
            map.drain().collect()
        };

        for (id, connection) in connections {
            connection.shutdown();
            debug!(id, "Connection closed during shutdown");
        }

        info!("RouterServer shutdown complete");
    }
}

// ============================================================================
// RouterServer - Accept Loop
// ============================================================================

impl RouterServer {
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("Accept loop started");

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("Accept loop shutting down");
                break;
            }

            match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, addr).await {
                            warn!(error = %e, ?addr, "Connection handling failed");
                        }
                    });
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                }
                Err(_) => continue,
            }
        }

        debug!("Accept loop terminated");
    }

    /// Upgrades one socket and tracks it until it closes.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        debug!(?addr, "New TCP connection");

        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (connection, done) =
            Connection::spawn(ws_stream, self.router.clone(), self.events.clone());

        if self.shutdown.load(Ordering::SeqCst) {
            connection.shutdown();
            return Ok(());
        }
        self.connections.write().insert(id, connection);

        info!(id, ?addr, "WebSocket connection established");

        let _ = done.await;
        self.connections.write().remove(&id);

        debug!(id, ?addr, "Connection removed");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
