use thiserror::Error;

use crate::protocol::{
    ERROR_FILE_ALREADY_EXISTS, ERROR_FILE_DOES_NOT_EXIST, ERROR_LOAD, ERROR_NOT_ENOUGH_DSTORES,
    ERROR_TIMEOUT,
};
use crate::registry::types::ReplicaId;

/// Failures a client can observe. Each maps to exactly one wire token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("file already exists")]
    FileAlreadyExists,

    #[error("file does not exist")]
    FileDoesNotExist,

    #[error("not enough replicas: need {needed}, have {available}")]
    InsufficientReplicas { needed: usize, available: usize },

    #[error("operation timed out")]
    OperationTimedOut,

    #[error("no replica left to load from")]
    LoadExhausted,

    /// A replica chosen for a store left before acknowledging it.
    #[error("replica {0} left before the operation completed")]
    ReplicaLost(ReplicaId),
}

impl ControllerError {
    pub fn token(&self) -> &'static str {
        match self {
            ControllerError::FileAlreadyExists => ERROR_FILE_ALREADY_EXISTS,
            ControllerError::FileDoesNotExist => ERROR_FILE_DOES_NOT_EXIST,
            ControllerError::InsufficientReplicas { .. } => ERROR_NOT_ENOUGH_DSTORES,
            ControllerError::LoadExhausted => ERROR_LOAD,
            // Clients only know one failure token for an unfinished store.
            ControllerError::OperationTimedOut | ControllerError::ReplicaLost(_) => ERROR_TIMEOUT,
        }
    }
}
