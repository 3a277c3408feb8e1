//! Wire Protocol
//!
//! Every control message in the cluster is one line of space-separated ASCII
//! tokens terminated by `\n`. The first token names the message.
//!
//! ## Directions
//! - **Client -> Controller**: `STORE`, `LOAD`, `RELOAD`, `REMOVE`, `LIST`.
//! - **Dstore -> Controller**: `JOIN`, `STORE_ACK`, `REMOVE_ACK`, `ERROR_FILE_DOES_NOT_EXIST`.
//! - **Controller -> Dstore**: `REMOVE`.
//! - **Client -> Dstore**: `STORE` (followed by raw bytes after `ACK`), `LOAD_DATA`.
//!
//! Inbound lines parse into the closed [`message::Command`] enum; replies are
//! rendered from [`message::Response`] or from an error token.

pub mod message;


// --- Request tokens ---

pub const JOIN: &str = "JOIN";
pub const STORE: &str = "STORE";
pub const STORE_ACK: &str = "STORE_ACK";
pub const LOAD: &str = "LOAD";
pub const RELOAD: &str = "RELOAD";
pub const LOAD_DATA: &str = "LOAD_DATA";
pub const REMOVE: &str = "REMOVE";
pub const REMOVE_ACK: &str = "REMOVE_ACK";
pub const LIST: &str = "LIST";

// --- Reply tokens ---

pub const STORE_TO: &str = "STORE_TO";
pub const STORE_COMPLETE: &str = "STORE_COMPLETE";
pub const LOAD_FROM: &str = "LOAD_FROM";
pub const REMOVE_COMPLETE: &str = "REMOVE_COMPLETE";
pub const ACK: &str = "ACK";

// --- Error tokens ---

pub const ERROR_FILE_ALREADY_EXISTS: &str = "ERROR_FILE_ALREADY_EXISTS";
pub const ERROR_FILE_DOES_NOT_EXIST: &str = "ERROR_FILE_DOES_NOT_EXIST";
pub const ERROR_NOT_ENOUGH_DSTORES: &str = "ERROR_NOT_ENOUGH_DSTORES";
pub const ERROR_LOAD: &str = "ERROR_LOAD";
pub const ERROR_TIMEOUT: &str = "ERROR_TIMEOUT";
