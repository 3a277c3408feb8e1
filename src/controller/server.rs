use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use super::coordinator::ReplicationCoordinator;
use super::dispatcher::ProtocolDispatcher;
use crate::config::ControllerConfig;
use crate::transport::{ConnectionId, spawn_writer};

/// TCP front end of the Controller. Clients and Dstores share the one port.
pub struct ControllerServer {
    listener: TcpListener,
    coordinator: Arc<ReplicationCoordinator>,
}

impl ControllerServer {
    pub async fn bind(config: ControllerConfig) -> Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
        let coordinator = ReplicationCoordinator::new(config);

        Ok(Self {
            listener,
            coordinator,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn coordinator(&self) -> Arc<ReplicationCoordinator> {
        self.coordinator.clone()
    }

    /// Accepts connections until the listener fails.
    pub async fn run(self) -> Result<()> {
        let config = self.coordinator.config();
        tracing::info!(
            "Controller listening on {} (R={}, timeout={:?})",
            self.local_addr()?,
            config.replication_factor,
            config.timeout
        );

        if !config.stats_interval.is_zero() {
            spawn_stats_reporter(self.coordinator.clone());
        }

        let dispatcher = ProtocolDispatcher::new(self.coordinator.clone());

        loop {
            let (stream, peer_addr) = self.listener.accept().await?;
            let dispatcher = dispatcher.clone();

            tokio::spawn(async move {
                handle_connection(dispatcher, stream, peer_addr).await;
            });
        }
    }
}

async fn handle_connection(dispatcher: ProtocolDispatcher, stream: TcpStream, peer_addr: SocketAddr) {
    let connection = ConnectionId::new();
    tracing::debug!("Connection {} opened from {}", connection, peer_addr);

    let (read_half, write_half) = stream.into_split();
    let sender = spawn_writer(connection, write_half);
    let mut lines = BufReader::new(read_half).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => dispatcher.dispatch(&sender, &line),
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Read error on connection {}: {}", connection, e);
                break;
            }
        }
    }

    tracing::debug!("Connection {} from {} closed", connection, peer_addr);
    dispatcher.disconnected(connection);
}

fn spawn_stats_reporter(coordinator: Arc<ReplicationCoordinator>) {
    let period = coordinator.config().stats_interval;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);

        loop {
            interval.tick().await;
            let stats = coordinator.stats();
            tracing::info!(
                "Cluster stats: {} replicas, {} stored, {} storing, {} removing, {} pending stores, {} pending removes, {} active loads",
                stats.replicas.len(),
                stats.files.complete,
                stats.files.storing,
                stats.files.removing,
                stats.pending_stores,
                stats.pending_removes,
                stats.active_loads
            );
            match serde_json::to_string(&stats) {
                Ok(json) => tracing::debug!("  - detail: {}", json),
                Err(e) => tracing::error!("Failed to encode cluster stats: {}", e),
            }
        }
    });
}
