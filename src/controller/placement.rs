use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::ControllerError;
use crate::registry::types::ReplicaId;

/// Chooses which replicas receive a new file.
///
/// Least-loaded replicas win. Within each group of equally loaded replicas the
/// starting point rotates by one position on every call, so ties are spread
/// round-robin even when only some replicas are tied.
pub struct PlacementPolicy {
    rotation: AtomicUsize,
}

impl PlacementPolicy {
    pub fn new() -> Self {
        Self {
            rotation: AtomicUsize::new(0),
        }
    }

    /// Picks `count` distinct replicas from `live`.
    ///
    /// `load` maps a replica to the number of files it holds; missing entries
    /// count as zero.
    pub fn select_replicas(
        &self,
        live: &[ReplicaId],
        load: &HashMap<ReplicaId, usize>,
        count: usize,
    ) -> Result<Vec<ReplicaId>, ControllerError> {
        let mut candidates = live.to_vec();
        candidates.sort();
        candidates.dedup();

        let n = candidates.len();
        if n < count {
            return Err(ControllerError::InsufficientReplicas {
                needed: count,
                available: n,
            });
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let offset = self.rotation.fetch_add(1, Ordering::Relaxed);

        // Equal-load groups keep ascending id order; each rotates on its own.
        let mut groups: BTreeMap<usize, Vec<ReplicaId>> = BTreeMap::new();
        for id in candidates {
            let files = load.get(&id).copied().unwrap_or(0);
            groups.entry(files).or_default().push(id);
        }

        let mut chosen = Vec::with_capacity(count);
        for mut group in groups.into_values() {
            let shift = offset % group.len();
            group.rotate_left(shift);
            let wanted = count - chosen.len();
            chosen.extend(group.into_iter().take(wanted));
            if chosen.len() == count {
                break;
            }
        }

        Ok(chosen)
    }
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        Self::new()
    }
}
