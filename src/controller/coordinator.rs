use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::error::ControllerError;
use super::pending::{AckOutcome, OperationKind, PendingOperation, PendingTable};
use super::placement::PlacementPolicy;
use crate::config::ControllerConfig;
use crate::index::store::{Index, StateCounts};
use crate::index::types::{FileRecord, FileState};
use crate::protocol::message::{Command, Response};
use crate::registry::service::ReplicaRegistry;
use crate::registry::types::ReplicaId;
use crate::transport::{ConnectionId, LineSender};

/// One client's LOAD in progress for one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LoadKey {
    connection: ConnectionId,
    name: String,
}

/// Replicas not yet tried for a LOAD, in the order they will be offered.
#[derive(Debug)]
struct LoadCandidates {
    remaining: VecDeque<ReplicaId>,
    size: u64,
}

/// Point-in-time summary for the stats reporter.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterStats {
    pub replicas: Vec<ReplicaId>,
    pub files: StateCounts,
    pub pending_stores: usize,
    pub pending_removes: usize,
    pub active_loads: usize,
}

/// Owns the cluster state and runs every multi-replica protocol.
///
/// ## Responsibilities
/// - **Placement**: chooses replicas for new files from live load.
/// - **Quorum**: counts STORE_ACK / REMOVE_ACK per operation and replies once.
/// - **Timeouts**: one timer task per pending operation, aborted on completion.
/// - **Failover**: hands out a file's replicas one at a time for LOAD / RELOAD.
/// - **Repair**: strips departed replicas from the index.
pub struct ReplicationCoordinator {
    config: ControllerConfig,
    index: Index,
    registry: ReplicaRegistry,
    placement: PlacementPolicy,
    stores: PendingTable,
    removes: PendingTable,
    loads: DashMap<LoadKey, LoadCandidates>,
}

impl ReplicationCoordinator {
    pub fn new(config: ControllerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            index: Index::new(),
            registry: ReplicaRegistry::new(),
            placement: PlacementPolicy::new(),
            stores: PendingTable::new(),
            removes: PendingTable::new(),
            loads: DashMap::new(),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn registry(&self) -> &ReplicaRegistry {
        &self.registry
    }

    // --- Membership ---

    pub fn join(&self, sender: &LineSender, port: ReplicaId) {
        if let Some(previous) = self.registry.register(port, sender.clone())
            && previous.connection != sender.connection()
        {
            tracing::warn!(
                "Replica {} re-joined on a new connection (was {})",
                port,
                previous.connection
            );
        }
    }

    /// Repairs state after `connection` closed.
    ///
    /// For a replica: pending stores that placed data on it fail, it is removed
    /// from every record, files left without replicas are dropped, and pending
    /// removes stop waiting for it.
    pub fn handle_disconnect(&self, connection: ConnectionId) {
        self.loads.retain(|key, _| key.connection != connection);

        let Some(replica) = self.registry.unregister(connection) else {
            return;
        };
        tracing::warn!(
            "Replica {} disconnected, {} replicas remain",
            replica,
            self.registry.len()
        );

        for (name, op) in self.stores.claim_involving(replica) {
            self.fail_store(&name, op, ControllerError::ReplicaLost(replica));
        }

        let lost = self.index.prune_replica(replica);
        for name in &lost {
            tracing::warn!("File {} lost its last replica and was dropped", name);
        }

        for (name, op) in self.removes.discharge_replica(replica) {
            self.complete_remove(&name, op);
        }
    }

    // --- STORE ---

    /// Places a new file and tells the client where to send it.
    ///
    /// `STORE_TO` is sent from here so that it always precedes the final reply.
    pub fn store(
        self: &Arc<Self>,
        client: &LineSender,
        name: &str,
        size: u64,
    ) -> Result<(), ControllerError> {
        if let Some(existing) = self.index.get(name)
            && existing.state != FileState::RemoveInProgress
        {
            return Err(ControllerError::FileAlreadyExists);
        }
        self.ensure_quorum()?;

        let live = self.registry.live_replicas();
        let load = self.index.load_per_replica();
        let replicas =
            self.placement
                .select_replicas(&live, &load, self.config.replication_factor)?;

        match self
            .index
            .try_reserve(name, FileRecord::storing(size, replicas.clone()))
        {
            Ok(None) => {}
            Ok(Some(_)) => {
                tracing::info!("STORE {} supersedes a removal in progress", name);
            }
            Err(_) => return Err(ControllerError::FileAlreadyExists),
        }

        let op = PendingOperation::new(replicas.clone(), client.clone());
        let id = op.id;
        if let Some(displaced) = self.stores.begin(name, op) {
            displaced.finish().send_line(ControllerError::OperationTimedOut.token());
        }

        tracing::info!("STORE {} ({} bytes) placed on {:?}", name, size, replicas);
        client.send_line(Response::StoreTo(replicas.clone()).to_string());

        // A chosen replica may have left between selection and now.
        if let Some(gone) = replicas
            .iter()
            .find(|replica| !self.registry.contains(**replica))
            && let Some(op) = self.stores.expire(name, id)
        {
            self.fail_store(name, op, ControllerError::ReplicaLost(*gone));
            return Ok(());
        }

        let timer = self.spawn_timeout(OperationKind::Store, name, id);
        self.stores.arm(name, id, timer);
        Ok(())
    }

    pub fn store_ack(&self, connection: ConnectionId, name: &str) {
        let Some(replica) = self.registry.replica_for(connection) else {
            tracing::debug!("Ignoring STORE_ACK {} from unregistered connection", name);
            return;
        };

        match self.stores.acknowledge(name, replica) {
            AckOutcome::Ignored => {
                tracing::debug!("Ignoring unexpected STORE_ACK {} from {}", name, replica);
            }
            AckOutcome::Waiting { remaining } => {
                tracing::debug!(
                    "STORE_ACK {} from {}, {} outstanding",
                    name,
                    replica,
                    remaining
                );
            }
            AckOutcome::Complete(op) => self.complete_store(name, op),
        }
    }

    pub fn expire_store(&self, name: &str, id: Uuid) {
        if let Some(op) = self.stores.expire(name, id) {
            self.fail_store(name, op, ControllerError::OperationTimedOut);
        }
    }

    fn complete_store(&self, name: &str, op: PendingOperation) {
        let promoted = self
            .index
            .update(name, |record| {
                if record.state == FileState::StoreInProgress {
                    record.state = FileState::StoreComplete;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);

        let replicas = op.replicas.clone();
        let client = op.finish();

        if promoted {
            tracing::info!("STORE {} complete on {:?}", name, replicas);
            client.send_line(Response::StoreComplete.to_string());
        } else {
            tracing::warn!("STORE {} acknowledged but its record is gone", name);
            client.send_line(ControllerError::OperationTimedOut.token());
        }
    }

    fn fail_store(&self, name: &str, op: PendingOperation, reason: ControllerError) {
        self.index
            .remove_if(name, |record| record.state == FileState::StoreInProgress);

        tracing::warn!(
            "STORE {} failed with {} acknowledgement(s) outstanding: {}",
            name,
            op.awaiting(),
            reason
        );
        op.finish().send_line(reason.token());
    }

    // --- REMOVE ---

    pub fn remove(self: &Arc<Self>, client: &LineSender, name: &str) -> Result<(), ControllerError> {
        self.ensure_quorum()?;

        let replicas = self
            .index
            .update(name, |record| {
                if record.state != FileState::StoreComplete {
                    return None;
                }
                record.state = FileState::RemoveInProgress;
                Some(record.replicas.clone())
            })
            .flatten()
            .ok_or(ControllerError::FileDoesNotExist)?;

        let op = PendingOperation::new(replicas.clone(), client.clone());
        let id = op.id;
        if let Some(displaced) = self.removes.begin(name, op) {
            displaced.finish().send_line(ControllerError::OperationTimedOut.token());
        }

        tracing::info!("REMOVE {} from {:?}", name, replicas);
        let request = Command::Remove {
            name: name.to_string(),
        }
        .to_string();

        for replica in &replicas {
            let delivered = self
                .registry
                .sender_for(*replica)
                .is_some_and(|sender| sender.send_line(request.clone()));

            if !delivered {
                tracing::warn!("Replica {} unreachable for REMOVE {}", replica, name);
                if let AckOutcome::Complete(op) = self.removes.acknowledge(name, *replica) {
                    self.complete_remove(name, op);
                    return Ok(());
                }
            }
        }

        let timer = self.spawn_timeout(OperationKind::Remove, name, id);
        self.removes.arm(name, id, timer);
        Ok(())
    }

    /// Handles `REMOVE_ACK` and `ERROR_FILE_DOES_NOT_EXIST` from a replica alike.
    pub fn remove_ack(&self, connection: ConnectionId, name: &str) {
        let Some(replica) = self.registry.replica_for(connection) else {
            tracing::debug!("Ignoring REMOVE_ACK {} from unregistered connection", name);
            return;
        };

        match self.removes.acknowledge(name, replica) {
            AckOutcome::Ignored => {
                tracing::debug!("Ignoring unexpected REMOVE_ACK {} from {}", name, replica);
            }
            AckOutcome::Waiting { remaining } => {
                tracing::debug!(
                    "REMOVE_ACK {} from {}, {} outstanding",
                    name,
                    replica,
                    remaining
                );
            }
            AckOutcome::Complete(op) => self.complete_remove(name, op),
        }
    }

    pub fn expire_remove(&self, name: &str, id: Uuid) {
        if let Some(op) = self.removes.expire(name, id) {
            tracing::warn!(
                "REMOVE {} timed out with {} acknowledgement(s) outstanding",
                name,
                op.awaiting()
            );
            op.finish().send_line(ControllerError::OperationTimedOut.token());
        }
    }

    fn complete_remove(&self, name: &str, op: PendingOperation) {
        self.index
            .remove_if(name, |record| record.state == FileState::RemoveInProgress);

        tracing::info!("REMOVE {} complete", name);
        op.finish().send_line(Response::RemoveComplete.to_string());
    }

    // --- LOAD / RELOAD / LIST ---

    pub fn load(&self, connection: ConnectionId, name: &str) -> Result<Response, ControllerError> {
        self.ensure_quorum()?;

        let record = self
            .index
            .get(name)
            .filter(FileRecord::is_visible)
            .ok_or(ControllerError::FileDoesNotExist)?;

        let mut remaining: VecDeque<ReplicaId> = record.replicas.into_iter().collect();
        let replica = self
            .next_live(&mut remaining)
            .ok_or(ControllerError::LoadExhausted)?;

        self.loads.insert(
            LoadKey {
                connection,
                name: name.to_string(),
            },
            LoadCandidates {
                remaining,
                size: record.size,
            },
        );

        Ok(Response::LoadFrom {
            replica,
            size: record.size,
        })
    }

    pub fn reload(&self, connection: ConnectionId, name: &str) -> Result<Response, ControllerError> {
        let key = LoadKey {
            connection,
            name: name.to_string(),
        };

        let next = self.loads.get_mut(&key).and_then(|mut candidates| {
            let size = candidates.size;
            self.next_live(&mut candidates.remaining)
                .map(|replica| Response::LoadFrom { replica, size })
        });

        match next {
            Some(response) => Ok(response),
            None => {
                self.loads.remove(&key);
                Err(ControllerError::LoadExhausted)
            }
        }
    }

    pub fn list(&self) -> Result<Response, ControllerError> {
        self.ensure_quorum()?;
        Ok(Response::List(
            self.index.names_in_state(FileState::StoreComplete),
        ))
    }

    pub fn stats(&self) -> ClusterStats {
        ClusterStats {
            replicas: self.registry.live_replicas(),
            files: self.index.state_counts(),
            pending_stores: self.stores.len(),
            pending_removes: self.removes.len(),
            active_loads: self.loads.len(),
        }
    }

    // --- Helpers ---

    fn ensure_quorum(&self) -> Result<(), ControllerError> {
        let available = self.registry.len();
        let needed = self.config.replication_factor;
        if available < needed {
            return Err(ControllerError::InsufficientReplicas { needed, available });
        }
        Ok(())
    }

    /// Pops candidates until one that is still registered turns up.
    fn next_live(&self, candidates: &mut VecDeque<ReplicaId>) -> Option<ReplicaId> {
        while let Some(replica) = candidates.pop_front() {
            if self.registry.contains(replica) {
                return Some(replica);
            }
            tracing::debug!("Skipping departed replica {}", replica);
        }
        None
    }

    fn spawn_timeout(self: &Arc<Self>, kind: OperationKind, name: &str, id: Uuid) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let name = name.to_string();
        let timeout = self.config.timeout;

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            match kind {
                OperationKind::Store => coordinator.expire_store(&name, id),
                OperationKind::Remove => coordinator.expire_remove(&name, id),
            }
        })
    }
}
