//! Replicated File Storage Cluster Library
//!
//! This library crate defines the modules that make up the cluster. It serves
//! as the foundation for the binary executable (`main.rs`), which runs either
//! node kind.
//!
//! ## Architecture Modules
//! - **`controller`**: The coordinating node. Places files, counts acknowledgements
//!   under a timeout, hands out replicas for loads and repairs the index when a
//!   Dstore leaves.
//! - **`dstore`**: The storage node. Keeps file bytes on disk, receives data from
//!   clients and acknowledges to the Controller.
//! - **`index`**: The Controller's filename -> record map with per-key atomic updates.
//! - **`registry`**: Live Dstores and the connections they joined on.
//! - **`protocol`**: Line-oriented wire messages shared by every participant.
//! - **`transport`**: Connection ids and queued line writers over TCP.
//! - **`cli`** / **`config`**: Command-line parsing into validated node settings.

pub mod cli;
pub mod config;
pub mod controller;
pub mod dstore;
pub mod index;
pub mod protocol;
pub mod registry;
pub mod transport;
