//! Error types raised by sink implementations.

use thiserror::Error;

/// Errors surfaced by persistence and broadcast sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("session id {0:?} cannot be used as a storage key")]
    InvalidKey(String),

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SinkError>;
