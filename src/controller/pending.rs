use dashmap::DashMap;
use std::collections::BTreeSet;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::registry::types::ReplicaId;
use crate::transport::LineSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Store,
    Remove,
}

/// A STORE or REMOVE waiting for acknowledgements from its replicas.
///
/// Whoever takes the operation out of its `PendingTable` owns the reply to the
/// client; every other path finds nothing and does nothing.
#[derive(Debug)]
pub struct PendingOperation {
    pub id: Uuid,
    pub replicas: Vec<ReplicaId>,
    awaiting: BTreeSet<ReplicaId>,
    client: LineSender,
    timer: Option<JoinHandle<()>>,
}

impl PendingOperation {
    pub fn new(replicas: Vec<ReplicaId>, client: LineSender) -> Self {
        Self {
            id: Uuid::new_v4(),
            awaiting: replicas.iter().copied().collect(),
            replicas,
            client,
            timer: None,
        }
    }

    pub fn awaiting(&self) -> usize {
        self.awaiting.len()
    }

    /// Cancels the timeout and hands back the client to reply to.
    pub fn finish(mut self) -> LineSender {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.client
    }
}

#[derive(Debug)]
pub enum AckOutcome {
    /// No operation for this name, or the replica was not (or no longer) awaited.
    Ignored,
    Waiting { remaining: usize },
    /// Last acknowledgement: the operation left the table and is now the caller's.
    Complete(PendingOperation),
}

/// In-flight operations of one kind, keyed by filename.
pub struct PendingTable {
    ops: DashMap<String, PendingOperation>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            ops: DashMap::new(),
        }
    }

    /// Registers `op` for `name`, returning any operation it displaced.
    pub fn begin(&self, name: &str, op: PendingOperation) -> Option<PendingOperation> {
        self.ops.insert(name.to_string(), op)
    }

    /// Attaches the timeout task to operation `id`.
    ///
    /// If the operation already finished the task is aborted instead.
    pub fn arm(&self, name: &str, id: Uuid, timer: JoinHandle<()>) {
        match self.ops.get_mut(name) {
            Some(mut op) if op.id == id => op.timer = Some(timer),
            _ => timer.abort(),
        }
    }

    pub fn acknowledge(&self, name: &str, replica: ReplicaId) -> AckOutcome {
        let mut outcome = AckOutcome::Ignored;

        let finished = self.ops.remove_if_mut(name, |_, op| {
            if !op.awaiting.remove(&replica) {
                return false;
            }
            outcome = AckOutcome::Waiting {
                remaining: op.awaiting.len(),
            };
            op.awaiting.is_empty()
        });

        match finished {
            Some((_, op)) => AckOutcome::Complete(op),
            None => outcome,
        }
    }

    /// Takes operation `id` out of the table if it is still pending.
    pub fn expire(&self, name: &str, id: Uuid) -> Option<PendingOperation> {
        self.ops
            .remove_if(name, |_, op| op.id == id)
            .map(|(_, op)| op)
    }

    /// Takes out every operation that placed data on `replica`.
    pub fn claim_involving(&self, replica: ReplicaId) -> Vec<(String, PendingOperation)> {
        self.names()
            .into_iter()
            .filter_map(|name| {
                self.ops
                    .remove_if(&name, |_, op| op.replicas.contains(&replica))
            })
            .collect()
    }

    /// Treats `replica` as having acknowledged everything it was awaited for.
    ///
    /// Returns the operations this completed.
    pub fn discharge_replica(&self, replica: ReplicaId) -> Vec<(String, PendingOperation)> {
        self.names()
            .into_iter()
            .filter_map(|name| match self.acknowledge(&name, replica) {
                AckOutcome::Complete(op) => Some((name, op)),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    fn names(&self) -> Vec<String> {
        self.ops.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}
