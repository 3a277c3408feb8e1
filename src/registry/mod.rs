//! Replica Registry Module
//!
//! Tracks which Dstores are currently part of the cluster.
//!
//! ## Core Mechanisms
//! - **Join**: a Dstore announces its listening port once; the connection it joined on
//!   becomes the Controller's persistent outbound channel to it.
//! - **Attribution**: acknowledgements arrive on that same connection, so the reverse
//!   table (connection -> replica) tells the Controller which replica acknowledged.
//! - **Departure**: closing the connection removes both directions of the mapping.

pub mod service;
pub mod types;

#[cfg(test)]
mod tests;
