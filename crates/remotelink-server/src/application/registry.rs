//! Connection registry: the set of currently-open client sessions.
//!
//! The registry is the single owner of "who is connected right now". The
//! transport server registers a connection after a successful WebSocket
//! handshake and unregisters it when the session ends, however it ends:
//! an abrupt close is treated exactly like a graceful one. The relay only
//! ever reads a snapshot.
//!
//! Registration and removal are logged for observability; beyond set
//! membership they have no effect on relay behavior.

use std::collections::HashMap;

use remotelink_core::ConnectionId;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Outbound frame channel for one session. The session's writer task drains
/// this channel into its WebSocket sink.
pub type OutboundSender = UnboundedSender<String>;

/// In-memory registry of open connections, shared across Tokio tasks.
///
/// The map is mutated only by the transport server's accept/close handlers
/// and read by the relay. On a multi-threaded runtime those run on
/// different threads, so the map lives behind an async `Mutex` and
/// [`snapshot`](ConnectionRegistry::snapshot) hands out a copy, so the relay
/// never iterates the live map while it can be mutated.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, OutboundSender>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection and returns its fresh identifier.
    pub async fn register(&self, outbound: OutboundSender) -> ConnectionId {
        let id = Uuid::new_v4();
        let open = {
            let mut connections = self.connections.lock().await;
            connections.insert(id, outbound);
            connections.len()
        };
        info!("client connected: {id} ({open} open)");
        id
    }

    /// Removes a connection. Removing an unknown id is a no-op.
    pub async fn unregister(&self, id: ConnectionId) {
        let removed = {
            let mut connections = self.connections.lock().await;
            connections.remove(&id).is_some()
        };
        if removed {
            info!("client disconnected: {id}");
        }
    }

    /// Returns a copy of the currently-open connections, in no particular
    /// order.
    pub async fn snapshot(&self) -> Vec<(ConnectionId, OutboundSender)> {
        let connections = self.connections.lock().await;
        connections
            .iter()
            .map(|(id, outbound)| (*id, outbound.clone()))
            .collect()
    }

    /// Number of currently-open connections.
    pub async fn open_count(&self) -> usize {
        self.connections.lock().await.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
