use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::transport::{ConnectionId, LineSender};

/// Identity of a storage replica: the port its Dstore listens on for clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplicaId(pub u16);

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered replica.
///
/// `connection` is the connection the replica joined on; only that connection's
/// closure may unregister it.
#[derive(Debug, Clone)]
pub struct ReplicaEntry {
    pub id: ReplicaId,
    pub connection: ConnectionId,
    pub sender: LineSender,
    pub joined_at: Instant,
}
