//! Controller Module
//!
//! The single coordinating node of the cluster. It never touches file bytes;
//! it decides where files go, tracks their lifecycle and tells clients which
//! Dstore to talk to.
//!
//! ## Core Concepts
//! - **Coordinator**: owns the index, the replica registry and all pending operations.
//! - **Quorum**: a STORE or REMOVE completes only when every involved replica acknowledged.
//! - **Pending operations**: one per in-flight STORE/REMOVE, each with its own timeout task.
//!   Acknowledgement and timeout race to take the operation out of its table; the
//!   loser does nothing, so the client always gets exactly one final reply.
//! - **Failover**: LOAD hands out replicas one at a time, RELOAD moves to the next.
//! - **Repair**: a Dstore disconnect removes it from every record immediately.

pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod pending;
pub mod placement;
pub mod server;
