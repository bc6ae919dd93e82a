//! Contracts for the collaborators a session hands its events to.
//!
//! A session never talks to storage or transport directly: the outbound
//! worker persists each committed event through an [`EventSink`], then
//! delivers it through a [`Broadcaster`]. Snapshots go to a
//! [`SnapshotStore`] so a restarted session can skip most of its log.

use std::sync::Arc;

use async_trait::async_trait;

use alignment_core::{Event, PlayerId, SessionId, SessionState};

use super::Result;
use super::memory::{InMemoryEventSink, InMemorySnapshotStore};
use crate::events::EventBus;

/// Append-only event persistence, indexed by the per-session sequence number.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Append one committed event. Transport-level retries are the sink's
    /// concern; an error here is a durability gap.
    async fn append_event(&self, session: &SessionId, event: &Event) -> Result<()>;

    /// Events with `seq > after_seq`, in sequence order.
    async fn load_events(&self, session: &SessionId, after_seq: u64) -> Result<Vec<Event>>;
}

/// Latest-snapshot storage.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Replace the stored snapshot for `state.id`.
    async fn save_snapshot(&self, state: &SessionState) -> Result<()>;

    async fn load_snapshot(&self, session: &SessionId) -> Result<Option<SessionState>>;
}

/// Event delivery to connected clients.
///
/// Private events (those with a recipient) go through [`send_to_player`];
/// everything else through [`broadcast_to_session`].
///
/// [`send_to_player`]: Broadcaster::send_to_player
/// [`broadcast_to_session`]: Broadcaster::broadcast_to_session
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast_to_session(&self, session: &SessionId, event: &Event) -> Result<()>;

    async fn send_to_player(
        &self,
        session: &SessionId,
        player: &PlayerId,
        event: &Event,
    ) -> Result<()>;
}

/// The sinks shared by every session of a registry.
#[derive(Clone)]
pub struct Sinks {
    pub events: Arc<dyn EventSink>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub broadcaster: Arc<dyn Broadcaster>,
}

impl Sinks {
    pub fn new(
        events: Arc<dyn EventSink>,
        snapshots: Arc<dyn SnapshotStore>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            events,
            snapshots,
            broadcaster,
        }
    }

    /// In-memory persistence with delivery through `bus`.
    pub fn in_memory(bus: EventBus) -> Self {
        Self::new(
            Arc::new(InMemoryEventSink::new()),
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(bus),
        )
    }
}
