use serde::{Deserialize, Serialize};

use crate::registry::types::ReplicaId;

/// Lifecycle state of a file in the index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FileState {
    /// Replicas have been chosen; acknowledgements are still outstanding.
    StoreInProgress,
    /// Every chosen replica acknowledged. The only state clients can see.
    StoreComplete,
    /// REMOVE was sent to the replicas; acknowledgements are outstanding.
    RemoveInProgress,
}

/// Metadata the Controller keeps for one filename.
///
/// `replicas` keeps insertion order, which is also the order LOAD tries them in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub state: FileState,
    pub size: u64,
    pub replicas: Vec<ReplicaId>,
}

impl FileRecord {
    /// A freshly placed file awaiting its store acknowledgements.
    pub fn storing(size: u64, replicas: Vec<ReplicaId>) -> Self {
        Self {
            state: FileState::StoreInProgress,
            size,
            replicas,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.state == FileState::StoreComplete
    }

    /// Files being removed no longer occupy their replicas for placement purposes.
    pub fn counts_toward_load(&self) -> bool {
        matches!(
            self.state,
            FileState::StoreInProgress | FileState::StoreComplete
        )
    }

    pub fn holds(&self, replica: ReplicaId) -> bool {
        self.replicas.contains(&replica)
    }
}
