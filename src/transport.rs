//! Line Transport
//!
//! Thin plumbing shared by the Controller and the Dstores: every accepted or
//! outbound TCP connection gets a `ConnectionId` and a `LineSender`, a cloneable
//! handle that queues newline-terminated messages for a dedicated writer task.
//!
//! Nothing here understands the protocol. Raw file bytes (STORE payloads and
//! LOAD_DATA responses) bypass this layer and are written on the socket directly.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identity of one TCP connection for its whole lifetime.
///
/// Acknowledgements are attributed to replicas through this id, never through
/// socket addresses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound half of a connection.
///
/// Sending never blocks: lines are queued on an unbounded channel and flushed
/// by the writer task in order.
#[derive(Debug, Clone)]
pub struct LineSender {
    connection: ConnectionId,
    tx: mpsc::UnboundedSender<String>,
}

impl LineSender {
    pub fn new(connection: ConnectionId, tx: mpsc::UnboundedSender<String>) -> Self {
        Self { connection, tx }
    }

    /// Creates a sender whose lines end up in the returned receiver instead of a socket.
    pub fn channel(connection: ConnectionId) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(connection, tx), rx)
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Queues one line. Returns `false` when the peer is already gone.
    pub fn send_line(&self, line: impl Into<String>) -> bool {
        let line = line.into();
        match self.tx.send(line) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    "Dropping line for closed connection {}: {}",
                    self.connection,
                    e.0
                );
                false
            }
        }
    }
}

/// Spawns the writer task for `write_half` and returns the handle feeding it.
///
/// The task ends when every clone of the returned sender is dropped or the
/// socket rejects a write.
pub fn spawn_writer(connection: ConnectionId, mut write_half: OwnedWriteHalf) -> LineSender {
    let (sender, mut rx) = LineSender::channel(connection);

    tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            line.push('\n');
            if let Err(e) = write_half.write_all(line.as_bytes()).await {
                tracing::warn!("Failed to write to connection {}: {}", connection, e);
                break;
            }
            tracing::trace!("{} -> {}", connection, line.trim_end());
        }
        let _ = write_half.shutdown().await;
    });

    sender
}
