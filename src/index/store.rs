use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use std::collections::HashMap;

use super::types::{FileRecord, FileState};
use crate::registry::types::ReplicaId;

/// Concurrent filename -> `FileRecord` map.
///
/// Callers must not hold a reference into the map while calling another method
/// of the same index; every method here takes and releases its own locks.
pub struct Index {
    files: DashMap<String, FileRecord>,
}

/// Number of records in each lifecycle state.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StateCounts {
    pub storing: usize,
    pub complete: usize,
    pub removing: usize,
}

impl Index {
    pub fn new() -> Self {
        Self {
            files: DashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<FileRecord> {
        self.files.get(name).map(|entry| entry.value().clone())
    }

    /// Creates or overwrites the record for `name`.
    pub fn set(&self, name: &str, record: FileRecord) {
        self.files.insert(name.to_string(), record);
    }

    pub fn remove(&self, name: &str) -> Option<FileRecord> {
        self.files.remove(name).map(|(_, record)| record)
    }

    /// Inserts `record` unless a record that is not being removed already exists.
    ///
    /// Check and insert happen under one lock on `name`. On success returns the
    /// `RemoveInProgress` record that was superseded, if any; on conflict returns
    /// the state of the record in the way.
    pub fn try_reserve(
        &self,
        name: &str,
        record: FileRecord,
    ) -> Result<Option<FileRecord>, FileState> {
        match self.files.entry(name.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().state != FileState::RemoveInProgress {
                    return Err(occupied.get().state);
                }
                Ok(Some(occupied.insert(record)))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(record);
                Ok(None)
            }
        }
    }

    /// Runs `f` on the record for `name` while holding its lock.
    pub fn update<R>(&self, name: &str, f: impl FnOnce(&mut FileRecord) -> R) -> Option<R> {
        self.files.get_mut(name).map(|mut entry| f(entry.value_mut()))
    }

    /// Removes the record for `name` only if `predicate` holds for it.
    pub fn remove_if(
        &self,
        name: &str,
        predicate: impl FnOnce(&FileRecord) -> bool,
    ) -> Option<FileRecord> {
        self.files
            .remove_if(name, |_, record| predicate(record))
            .map(|(_, record)| record)
    }

    /// Strips `replica` from every record and deletes records left without replicas.
    ///
    /// Returns the names of the deleted records.
    pub fn prune_replica(&self, replica: ReplicaId) -> Vec<String> {
        let mut lost = Vec::new();

        self.files.retain(|name, record| {
            if !record.holds(replica) {
                return true;
            }
            record.replicas.retain(|id| *id != replica);
            if record.replicas.is_empty() {
                lost.push(name.clone());
                false
            } else {
                true
            }
        });

        lost
    }

    /// Point-in-time copy of every entry.
    pub fn snapshot(&self) -> Vec<(String, FileRecord)> {
        self.files
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Names of the records in `state`, sorted.
    pub fn names_in_state(&self, state: FileState) -> Vec<String> {
        let mut names: Vec<String> = self
            .files
            .iter()
            .filter(|entry| entry.value().state == state)
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Number of stored or storing files listed on each replica.
    pub fn load_per_replica(&self) -> HashMap<ReplicaId, usize> {
        let mut load = HashMap::new();

        for entry in self.files.iter() {
            let record = entry.value();
            if !record.counts_toward_load() {
                continue;
            }
            for replica in &record.replicas {
                *load.entry(*replica).or_insert(0) += 1;
            }
        }

        load
    }

    pub fn state_counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();

        for entry in self.files.iter() {
            match entry.value().state {
                FileState::StoreInProgress => counts.storing += 1,
                FileState::StoreComplete => counts.complete += 1,
                FileState::RemoveInProgress => counts.removing += 1,
            }
        }

        counts
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}
