//! Cloneable façade for issuing commands to one session.
//!
//! [`SessionHandle`] hides channel plumbing. Fire-and-forget intents go
//! through [`SessionHandle::submit`], which never waits for queue space;
//! request/response calls go through [`SessionHandle::post_action`], which
//! waits for the session's answer up to the configured reply timeout.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};

use alignment_core::{Action, ActionError, Event, SessionId, SessionState};

use super::errors::{Result, RuntimeError};

/// Commands that can be sent to a session actor
pub(crate) enum Command {
    /// Process an action; the outcome is only observable through events.
    Submit(Action),
    /// Process an action and report the committed events or the rejection.
    Post {
        action: Action,
        reply: oneshot::Sender<std::result::Result<Vec<Event>, ActionError>>,
    },
    /// Clone of the current state (read-only).
    Query { reply: oneshot::Sender<SessionState> },
}

/// Lifecycle of a session actor as seen by its supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    /// A fault escaped an action; the session waits for a restart.
    Failed,
    Stopped,
}

/// Counters shared between a session's workers and its handles.
#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    pub(crate) processed: AtomicU64,
    pub(crate) dropped: AtomicU64,
    pub(crate) persisted: AtomicU64,
    pub(crate) persistence_failures: AtomicU64,
    pub(crate) broadcast_failures: AtomicU64,
}

impl SessionCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time view of a session's workers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHealth {
    pub status: SessionStatus,
    /// Commands waiting in the inbound queue.
    pub queued: usize,
    pub processed: u64,
    /// Actions shed because the inbound queue was full.
    pub dropped: u64,
    pub persisted: u64,
    /// Events folded into state but never persisted.
    pub persistence_failures: u64,
    pub broadcast_failures: u64,
}

/// Client-facing handle to one session actor
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    command_tx: mpsc::Sender<Command>,
    status: watch::Receiver<SessionStatus>,
    shutdown: Arc<watch::Sender<bool>>,
    counters: Arc<SessionCounters>,
    reply_timeout: Duration,
}

impl SessionHandle {
    pub(crate) fn new(
        id: SessionId,
        command_tx: mpsc::Sender<Command>,
        status: watch::Receiver<SessionStatus>,
        shutdown: Arc<watch::Sender<bool>>,
        counters: Arc<SessionCounters>,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            id,
            command_tx,
            status,
            shutdown,
            counters,
            reply_timeout,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Enqueue an action without waiting.
    ///
    /// When the inbound queue is full the action is dropped and
    /// [`RuntimeError::QueueFull`] is returned; the caller is never blocked.
    pub fn submit(&self, action: Action) -> Result<()> {
        self.enqueue(Command::Submit(action))
    }

    /// Enqueue an action and wait for the events it produced.
    ///
    /// Fails with [`RuntimeError::Unresponsive`] when the session does not
    /// answer within the reply timeout, and with [`RuntimeError::Rejected`]
    /// when the rules refuse the action.
    pub async fn post_action(&self, action: Action) -> Result<Vec<Event>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.enqueue(Command::Post {
            action,
            reply: reply_tx,
        })?;
        let outcome = self.await_reply(reply_rx).await?;
        Ok(outcome?)
    }

    /// Query the current session state (read-only snapshot)
    pub async fn state(&self) -> Result<SessionState> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.enqueue(Command::Query { reply: reply_tx })?;
        self.await_reply(reply_rx).await
    }

    pub fn health(&self) -> SessionHealth {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        SessionHealth {
            status: self.status(),
            queued: self
                .command_tx
                .max_capacity()
                .saturating_sub(self.command_tx.capacity()),
            processed: load(&self.counters.processed),
            dropped: load(&self.counters.dropped),
            persisted: load(&self.counters.persisted),
            persistence_failures: load(&self.counters.persistence_failures),
            broadcast_failures: load(&self.counters.broadcast_failures),
        }
    }

    /// Signal the actor to stop. Queued commands are discarded.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    fn enqueue(&self, command: Command) -> Result<()> {
        if self.status() == SessionStatus::Failed {
            return Err(RuntimeError::SessionFailed(self.id.clone()));
        }
        match self.command_tx.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                SessionCounters::bump(&self.counters.dropped);
                tracing::warn!(
                    target: "runtime::session",
                    session = %self.id,
                    "inbound queue full, dropping action"
                );
                Err(RuntimeError::QueueFull {
                    session: self.id.clone(),
                })
            }
            Err(TrySendError::Closed(_)) => Err(RuntimeError::CommandChannelClosed),
        }
    }

    async fn await_reply<T>(&self, reply_rx: oneshot::Receiver<T>) -> Result<T> {
        match tokio::time::timeout(self.reply_timeout, reply_rx).await {
            Ok(reply) => reply.map_err(RuntimeError::ReplyChannelClosed),
            Err(_) => Err(RuntimeError::Unresponsive {
                timeout: self.reply_timeout,
            }),
        }
    }
}
