//! Topic-based event bus implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;

use alignment_core::{Event, PlayerId, SessionId};

use crate::repository::{Broadcaster, Result, SinkError};

/// Topics for event routing
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum Topic {
    /// Public events of one session.
    Session(SessionId),
    /// Private events addressed to one player.
    Player(SessionId, PlayerId),
}

/// Topic-based event bus
///
/// Channels are created on first subscription. Publishing to a topic nobody
/// listens to is not an error.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<RwLock<HashMap<Topic, broadcast::Sender<Event>>>>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Publish an event to a topic. Returns how many subscribers received it.
    pub fn publish(&self, topic: &Topic, event: Event) -> Result<usize> {
        let channels = self.channels.read().map_err(|_| SinkError::LockPoisoned)?;
        match channels.get(topic) {
            Some(tx) => Ok(tx.send(event).unwrap_or(0)),
            None => {
                tracing::trace!("No subscribers for topic {:?}", topic);
                Ok(0)
            }
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(topic)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Public session events plus the private events of `player`.
    pub fn subscribe_player(
        &self,
        session: &SessionId,
        player: &PlayerId,
    ) -> (broadcast::Receiver<Event>, broadcast::Receiver<Event>) {
        (
            self.subscribe(Topic::Session(session.clone())),
            self.subscribe(Topic::Player(session.clone(), player.clone())),
        )
    }

    /// Drops every topic of a session; open receivers see the channel close.
    pub fn close_session(&self, session: &SessionId) {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        channels.retain(|topic, _| match topic {
            Topic::Session(id) | Topic::Player(id, _) => id != session,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broadcaster for EventBus {
    async fn broadcast_to_session(&self, session: &SessionId, event: &Event) -> Result<()> {
        self.publish(&Topic::Session(session.clone()), event.clone())?;
        Ok(())
    }

    async fn send_to_player(
        &self,
        session: &SessionId,
        player: &PlayerId,
        event: &Event,
    ) -> Result<()> {
        self.publish(&Topic::Player(session.clone(), player.clone()), event.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use alignment_core::EventKind;

    #[tokio::test]
    async fn private_events_reach_only_their_player() {
        let bus = EventBus::new();
        let session = SessionId::from("s");
        let (mut public_rx, mut ana_rx) = bus.subscribe_player(&session, &PlayerId::from("ana"));
        let (_, mut bo_rx) = bus.subscribe_player(&session, &PlayerId::from("bo"));

        let secret = Event::new(EventKind::RoleAssigned, session.clone(), Utc::now())
            .private_to(&PlayerId::from("ana"));
        bus.send_to_player(&session, &PlayerId::from("ana"), &secret)
            .await
            .unwrap();
        let notice = Event::new(EventKind::SystemMessage, session.clone(), Utc::now());
        bus.broadcast_to_session(&session, &notice).await.unwrap();

        assert_eq!(ana_rx.recv().await.unwrap(), secret);
        assert_eq!(public_rx.recv().await.unwrap(), notice);
        assert!(bo_rx.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = EventBus::new();
        let event = Event::new(EventKind::ChatMessage, SessionId::from("s"), Utc::now());
        assert_eq!(bus.publish(&Topic::Session(SessionId::from("s")), event).unwrap(), 0);
    }
}
