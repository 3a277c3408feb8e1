//! Dstore Module
//!
//! A storage node. It keeps one persistent connection to the Controller and
//! serves clients on its own port.
//!
//! ## Responsibilities
//! - **Join**: announces its client port to the Controller once listening.
//! - **Store**: `STORE` from a client is answered with `ACK`, the bytes are read
//!   within the timeout, written to disk and acknowledged to the Controller.
//! - **Load**: `LOAD_DATA` streams the file and closes the connection.
//! - **Remove**: `REMOVE` from the Controller deletes the file and is acknowledged.

pub mod disk;
pub mod node;

#[cfg(test)]
mod tests;
