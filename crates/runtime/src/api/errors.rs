//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from session coordination, sinks, and rejected actions so
//! clients can bubble them up with consistent context.
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use alignment_core::{ActionError, SessionId, SettingsError};

pub use crate::repository::SinkError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The inbound queue was full; the action was dropped.
    #[error("session {session} inbound queue is full, action dropped")]
    QueueFull { session: SessionId },

    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("session did not answer within {timeout:?}")]
    Unresponsive { timeout: Duration },

    #[error("session command channel closed")]
    CommandChannelClosed,

    #[error("session reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("session {0} has failed and is awaiting restart")]
    SessionFailed(SessionId),

    #[error("action rejected: {0}")]
    Rejected(#[from] ActionError),

    #[error("invalid session settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
