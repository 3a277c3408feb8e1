use dashmap::DashMap;
use std::time::Instant;

use super::types::{ReplicaEntry, ReplicaId};
use crate::transport::{ConnectionId, LineSender};

pub struct ReplicaRegistry {
    replicas: DashMap<ReplicaId, ReplicaEntry>,
    connections: DashMap<ConnectionId, ReplicaId>,
}

impl ReplicaRegistry {
    pub fn new() -> Self {
        Self {
            replicas: DashMap::new(),
            connections: DashMap::new(),
        }
    }

    /// Registers `id` as reachable through `sender`.
    ///
    /// A replica re-joining from a new connection replaces its old entry; the
    /// previous entry is returned.
    pub fn register(&self, id: ReplicaId, sender: LineSender) -> Option<ReplicaEntry> {
        let connection = sender.connection();

        if let Some(previous) = self.connections.insert(connection, id)
            && previous != id
        {
            tracing::warn!(
                "Connection {} re-joined as {} (was {})",
                connection,
                id,
                previous
            );
            self.replicas
                .remove_if(&previous, |_, entry| entry.connection == connection);
        }

        let entry = ReplicaEntry {
            id,
            connection,
            sender,
            joined_at: Instant::now(),
        };

        let replaced = self.replicas.insert(id, entry);
        tracing::info!("Replica {} joined, registry size now: {}", id, self.len());
        replaced
    }

    /// Drops the mapping for `connection`.
    ///
    /// Returns the replica that left, or `None` if the connection was not a
    /// replica or the replica has since re-joined on another connection.
    pub fn unregister(&self, connection: ConnectionId) -> Option<ReplicaId> {
        let (_, id) = self.connections.remove(&connection)?;

        self.replicas
            .remove_if(&id, |_, entry| entry.connection == connection)
            .map(|(id, entry)| {
                tracing::info!("Replica {} left after {:?}", id, entry.joined_at.elapsed());
                id
            })
    }

    pub fn replica_for(&self, connection: ConnectionId) -> Option<ReplicaId> {
        self.connections.get(&connection).map(|entry| *entry.value())
    }

    pub fn sender_for(&self, id: ReplicaId) -> Option<LineSender> {
        self.replicas.get(&id).map(|entry| entry.sender.clone())
    }

    pub fn contains(&self, id: ReplicaId) -> bool {
        self.replicas.contains_key(&id)
    }

    /// Every registered replica, in ascending port order.
    pub fn live_replicas(&self) -> Vec<ReplicaId> {
        let mut ids: Vec<ReplicaId> = self.replicas.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }
}

impl Default for ReplicaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
