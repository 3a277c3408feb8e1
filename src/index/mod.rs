//! File Index Module
//!
//! The Controller's authoritative view of which files exist and where their bytes live.
//!
//! ## Core Concepts
//! - **FileRecord**: per-file metadata (lifecycle state, declared size, replica list).
//! - **Lifecycle**: `StoreInProgress -> StoreComplete -> RemoveInProgress -> (deleted)`.
//!   Only `StoreComplete` files are visible to clients.
//! - **Per-key atomicity**: every check-then-mutate on one filename runs under that
//!   key's lock, so concurrent handlers and timers agree on a single outcome.
//! - **Load**: files being stored or already stored count toward a replica's load,
//!   which drives placement of new files.

pub mod store;
pub mod types;
